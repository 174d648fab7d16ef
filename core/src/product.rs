//! Loan product catalog and eligibility selection.
//!
//! Tier 0 customers may only take a first-time product whose maximum
//! fits under their ceiling. Higher tiers choose among regular products
//! whose minimum fits under the ceiling, preferring the largest maximum.

use crate::{
    error::{SimError, SimResult},
    rng::SubsystemRng,
    types::{Money, ProductId},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanCategory {
    Personal,
    Emergency,
    Business,
    Agricultural,
}

impl LoanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Emergency => "Emergency",
            Self::Business => "Business",
            Self::Agricultural => "Agricultural",
        }
    }

    pub fn parse(s: &str) -> SimResult<Self> {
        match s {
            "Personal" => Ok(Self::Personal),
            "Emergency" => Ok(Self::Emergency),
            "Business" => Ok(Self::Business),
            "Agricultural" => Ok(Self::Agricultural),
            other => Err(SimError::Persistence(format!("unknown loan category '{other}'"))),
        }
    }
}

impl fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub product_id:         ProductId,
    pub name:               String,
    pub category:           LoanCategory,
    pub min_amount:         Money,
    pub max_amount:         Money,
    pub min_term_days:      u32,
    pub max_term_days:      u32,
    /// Percent per 30 days, e.g. 35.0.
    pub interest_rate_pct:  Decimal,
    /// Percent of principal charged once at disbursement.
    pub processing_fee_pct: Decimal,
    pub is_first_time:      bool,
    #[serde(default = "default_true")]
    pub crb_reporting:      bool,
}

fn default_true() -> bool {
    true
}

impl LoanProduct {
    pub fn validate(&self) -> SimResult<()> {
        if self.min_amount <= Decimal::ZERO || self.min_amount > self.max_amount {
            return Err(SimError::Config(format!(
                "product {} has an invalid amount range {}..{}",
                self.product_id, self.min_amount, self.max_amount
            )));
        }
        if self.min_term_days == 0 || self.min_term_days > self.max_term_days {
            return Err(SimError::Config(format!(
                "product {} has an invalid term range {}..{}",
                self.product_id, self.min_term_days, self.max_term_days
            )));
        }
        if self.interest_rate_pct.is_sign_negative() || self.processing_fee_pct.is_sign_negative() {
            return Err(SimError::Config(format!(
                "product {} has a negative rate or fee",
                self.product_id
            )));
        }
        Ok(())
    }
}

/// Immutable set of products, loaded once per run.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: Vec<LoanProduct>,
}

impl ProductCatalog {
    pub fn new(products: Vec<LoanProduct>) -> SimResult<Self> {
        if products.is_empty() {
            return Err(SimError::EmptyCatalog);
        }
        for p in &products {
            p.validate()?;
        }
        Ok(Self { products })
    }

    pub fn products(&self) -> &[LoanProduct] {
        &self.products
    }

    pub fn get(&self, product_id: ProductId) -> Option<&LoanProduct> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    /// Pick the product a customer at `tier` with ceiling `max_eligible`
    /// applies for, or None when nothing fits.
    pub fn select_for(
        &self,
        tier: u32,
        max_eligible: Money,
        rng: &mut SubsystemRng,
    ) -> Option<&LoanProduct> {
        if tier == 0 {
            let fitting: Vec<&LoanProduct> = self
                .products
                .iter()
                .filter(|p| p.is_first_time && p.max_amount <= max_eligible)
                .collect();
            if let Some(p) = rng.pick(&fitting) {
                return Some(*p);
            }
            // A ceiling below every first-time maximum still gets the
            // entry product; the amount is capped by the ceiling later.
            let entry: Vec<&LoanProduct> =
                self.products.iter().filter(|p| p.is_first_time).collect();
            return rng.pick(&entry).copied();
        }

        let candidates: Vec<&LoanProduct> = self
            .products
            .iter()
            .filter(|p| !p.is_first_time && p.min_amount <= max_eligible)
            .collect();
        let best_max = candidates.iter().map(|p| p.max_amount).max()?;
        let best: Vec<&LoanProduct> = candidates
            .into_iter()
            .filter(|p| p.max_amount == best_max)
            .collect();
        rng.pick(&best).copied()
    }
}

/// The standard four-product microlending catalog.
pub fn default_products() -> Vec<LoanProduct> {
    #[allow(clippy::too_many_arguments)]
    fn product(
        product_id: ProductId,
        name: &str,
        category: LoanCategory,
        amounts: (i64, i64),
        rate_pct: i64,
        fee_tenths_pct: i64,
        terms: (u32, u32),
        is_first_time: bool,
    ) -> LoanProduct {
        LoanProduct {
            product_id,
            name: name.into(),
            category,
            min_amount: Decimal::from(amounts.0),
            max_amount: Decimal::from(amounts.1),
            min_term_days: terms.0,
            max_term_days: terms.1,
            interest_rate_pct: Decimal::from(rate_pct),
            processing_fee_pct: Decimal::new(fee_tenths_pct, 1),
            is_first_time,
            crb_reporting: true,
        }
    }

    vec![
        product(1, "First Time Loan", LoanCategory::Personal, (100, 1_000), 35, 50, (7, 7), true),
        product(2, "Quick Cash", LoanCategory::Personal, (1_000, 20_000), 35, 25, (7, 14), false),
        product(3, "Emergency Loan", LoanCategory::Emergency, (5_000, 50_000), 30, 20, (7, 30), false),
        product(4, "Jipange Loan", LoanCategory::Business, (10_000, 100_000), 25, 15, (7, 30), false),
    ]
}
