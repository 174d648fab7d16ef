//! Strongly-typed run configuration, resolved once at startup.
//!
//! Every field has an explicit default, so a partial JSON file is valid.
//! `SimConfig::validate()` runs before any phase touches the store.

use crate::{
    error::{SimError, SimResult},
    product::{default_products, LoanProduct},
    types::Money,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Volume and calendar knobs for the generated history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// The simulated "today". All windows are measured back from here.
    pub as_of: NaiveDate,
    pub customer_count: usize,
    /// Length of the historical window, in 30-day months.
    pub transaction_months: u32,
    pub loan_apps_per_day: u32,
    /// Length of the seed application window processed by the historical pass.
    pub seed_application_months: u32,
    pub main_application_start_days_back: i64,
    pub main_application_end_days_back: i64,
    pub live_lookback_months: u32,
    pub live_lookahead_days: i64,
    pub mobile_money_days: u32,
    pub mobile_money_daily_intensity: f64,
    /// Outside-lender credit inquiries drawn per customer, 0..=N.
    pub max_inquiries_per_customer: u32,
    /// Processing fee rate charged to borrowers with no prior loan.
    pub first_time_fee_rate: Decimal,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            as_of: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default(),
            customer_count: 2_500,
            transaction_months: 15,
            loan_apps_per_day: 350,
            seed_application_months: 4,
            main_application_start_days_back: 365,
            main_application_end_days_back: 60,
            live_lookback_months: 12,
            live_lookahead_days: 30,
            mobile_money_days: 120,
            mobile_money_daily_intensity: 3.0,
            max_inquiries_per_customer: 5,
            first_time_fee_rate: Decimal::new(5, 2),
        }
    }
}

/// Tier progression and CRB listing rules consumed by the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditPolicy {
    pub tier_upgrade_threshold: u32,
    pub max_tier: u32,
    pub tier_amount_multiplier: Decimal,
    pub tier_amount_increment: Money,
    pub absolute_max_loan_amount: Money,
    pub initial_max_eligible_amount: Money,
    /// Days past due before a default is listed (historical policy only).
    pub crb_listing_threshold_days: i64,
    /// Live listings strictly above this repayable amount are Major.
    pub crb_major_default_threshold: Money,
    /// The same cut-off for listings made by the historical overdue threshold.
    pub historical_crb_major_default_threshold: Money,
    pub crb_listing_score_penalty: i32,
    pub credit_score_floor: i32,
    pub credit_score_ceiling: i32,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            tier_upgrade_threshold: 1,
            max_tier: 5,
            tier_amount_multiplier: Decimal::new(15, 1),
            tier_amount_increment: Decimal::from(1_000),
            absolute_max_loan_amount: Decimal::from(100_000),
            initial_max_eligible_amount: Decimal::from(1_000),
            crb_listing_threshold_days: 90,
            crb_major_default_threshold: Decimal::from(1_000),
            historical_crb_major_default_threshold: Decimal::from(10_000),
            crb_listing_score_penalty: 50,
            credit_score_floor: 300,
            credit_score_ceiling: 850,
        }
    }
}

/// Parameters of the stochastic outcome draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    pub max_days_late: i64,
    pub max_days_early: i64,
    pub late_fee_daily_rate: Decimal,
    /// Borrowers younger than this are always exposed to the partial draw.
    pub partial_age_cutoff: u32,
    /// Live path: chance an older borrower is exposed to the partial draw.
    pub live_partial_exposure: f64,
    pub live_partial_probability: f64,
    pub historical_partial_probability: f64,
    pub partial_fraction_min: f64,
    pub partial_fraction_max: f64,
    /// Live path: independent chance a hard default is listed with the CRB.
    pub live_crb_listing_probability: f64,
    /// Historical path: defaults are recognised 1..=N days after the due date.
    pub historical_default_max_lag_days: i64,
    pub early_repayment_probability: f64,
    pub early_repayment_window_days: i64,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            max_days_late: 60,
            max_days_early: 7,
            late_fee_daily_rate: Decimal::new(15, 3),
            partial_age_cutoff: 30,
            live_partial_exposure: 0.3,
            live_partial_probability: 0.4,
            historical_partial_probability: 0.2,
            partial_fraction_min: 0.3,
            partial_fraction_max: 0.7,
            live_crb_listing_probability: 0.5,
            historical_default_max_lag_days: 120,
            early_repayment_probability: 0.1,
            early_repayment_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GenerationFile {
    generation: GenerationConfig,
    credit:     CreditPolicy,
    outcome:    OutcomeConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct ProductCatalogFile {
    products: Vec<LoanProduct>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub generation: GenerationConfig,
    pub credit:     CreditPolicy,
    pub outcome:    OutcomeConfig,
    pub products:   Vec<LoanProduct>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            credit:     CreditPolicy::default(),
            outcome:    OutcomeConfig::default(),
            products:   default_products(),
        }
    }
}

impl SimConfig {
    /// Load from the data/ directory.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/generation.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: GenerationFile = serde_json::from_str(&content)?;

        let product_path = format!("{data_dir}/products/loan_products.json");
        let product_content = std::fs::read_to_string(&product_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {product_path}: {e}"))?;
        let product_file: ProductCatalogFile = serde_json::from_str(&product_content)?;

        let config = Self {
            generation: file.generation,
            credit:     file.credit,
            outcome:    file.outcome,
            products:   product_file.products,
        };
        config.validate()?;
        Ok(config)
    }

    /// Small, fast configuration for tests. Same rules, fewer rows.
    pub fn default_test() -> Self {
        Self {
            generation: GenerationConfig {
                customer_count: 40,
                loan_apps_per_day: 4,
                mobile_money_days: 14,
                ..GenerationConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        let c = &self.credit;
        if c.tier_upgrade_threshold < 1 {
            return Err(SimError::Config("tier_upgrade_threshold must be at least 1".into()));
        }
        if c.tier_amount_multiplier <= Decimal::ONE {
            return Err(SimError::Config(format!(
                "tier_amount_multiplier must be greater than 1, got {}",
                c.tier_amount_multiplier
            )));
        }
        if c.tier_amount_increment.is_sign_negative() && !c.tier_amount_increment.is_zero() {
            return Err(SimError::Config("tier_amount_increment must not be negative".into()));
        }
        if c.initial_max_eligible_amount <= Decimal::ZERO {
            return Err(SimError::Config("initial_max_eligible_amount must be positive".into()));
        }
        if c.initial_max_eligible_amount > c.absolute_max_loan_amount {
            return Err(SimError::Config(format!(
                "initial_max_eligible_amount {} exceeds absolute_max_loan_amount {}",
                c.initial_max_eligible_amount, c.absolute_max_loan_amount
            )));
        }
        if c.crb_listing_threshold_days < 0 {
            return Err(SimError::Config("crb_listing_threshold_days must not be negative".into()));
        }
        if c.crb_major_default_threshold.is_sign_negative()
            || c.historical_crb_major_default_threshold.is_sign_negative()
        {
            return Err(SimError::Config("CRB major default thresholds must not be negative".into()));
        }
        if c.credit_score_floor > c.credit_score_ceiling {
            return Err(SimError::Config("credit score floor exceeds ceiling".into()));
        }

        let o = &self.outcome;
        let probabilities = [
            ("live_partial_exposure", o.live_partial_exposure),
            ("live_partial_probability", o.live_partial_probability),
            ("historical_partial_probability", o.historical_partial_probability),
            ("live_crb_listing_probability", o.live_crb_listing_probability),
            ("early_repayment_probability", o.early_repayment_probability),
            ("partial_fraction_min", o.partial_fraction_min),
            ("partial_fraction_max", o.partial_fraction_max),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::Config(format!("{name} must be within [0, 1], got {p}")));
            }
        }
        if o.partial_fraction_min > o.partial_fraction_max {
            return Err(SimError::Config("partial_fraction_min exceeds partial_fraction_max".into()));
        }
        if o.max_days_late < 1 || o.max_days_early < 0 || o.historical_default_max_lag_days < 1 {
            return Err(SimError::Config("day ranges must be positive".into()));
        }

        let g = &self.generation;
        if g.main_application_start_days_back < g.main_application_end_days_back {
            return Err(SimError::Config("main application window is reversed".into()));
        }
        if g.transaction_months == 0 {
            return Err(SimError::Config("transaction_months must be at least 1".into()));
        }

        if self.products.is_empty() {
            return Err(SimError::EmptyCatalog);
        }
        for p in &self.products {
            p.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimConfig::default().validate().unwrap();
        SimConfig::default_test().validate().unwrap();
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let file: GenerationFile =
            serde_json::from_str(r#"{ "credit": { "max_tier": 3 } }"#).unwrap();
        assert_eq!(file.credit.max_tier, 3);
        assert_eq!(file.credit.tier_upgrade_threshold, 1);
        assert_eq!(file.generation, GenerationConfig::default());
    }

    #[test]
    fn rejects_non_growing_multiplier() {
        let mut config = SimConfig::default_test();
        config.credit.tier_amount_multiplier = Decimal::ONE;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_ceiling_above_absolute_max() {
        let mut config = SimConfig::default_test();
        config.credit.initial_max_eligible_amount = Decimal::from(200_000);
        assert!(config.validate().is_err());
    }
}
