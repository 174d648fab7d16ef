//! The per-customer credit profile: the state folded by the tier machine.

use crate::{
    config::CreditPolicy,
    error::{SimError, SimResult},
    types::{CustomerId, Money, SimTime},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrbListingType {
    #[serde(rename = "Major Default")]
    MajorDefault,
    #[serde(rename = "Minor Default")]
    MinorDefault,
}

impl CrbListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MajorDefault => "Major Default",
            Self::MinorDefault => "Minor Default",
        }
    }

    pub fn parse(s: &str) -> SimResult<Self> {
        match s {
            "Major Default" => Ok(Self::MajorDefault),
            "Minor Default" => Ok(Self::MinorDefault),
            other => Err(SimError::Persistence(format!("unknown CRB listing type '{other}'"))),
        }
    }

    /// Major strictly above the threshold, Minor otherwise.
    pub fn for_amount(total_repayable: Money, major_threshold: Money) -> Self {
        if total_repayable > major_threshold {
            Self::MajorDefault
        } else {
            Self::MinorDefault
        }
    }
}

impl fmt::Display for CrbListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCreditProfile {
    pub customer_id:                     CustomerId,
    pub credit_score:                    i32,
    pub payment_history_score:           i32,
    pub credit_utilization:              Decimal,
    pub credit_history_length:           u32,
    pub total_loans_taken:               u32,
    pub total_amount_borrowed:           Money,
    pub total_amount_repaid:             Money,
    pub active_loans:                    u32,
    pub active_loan_amount:              Money,
    pub times_defaulted:                 u32,
    pub last_default_date:               Option<SimTime>,
    pub days_since_last_default:         Option<i64>,
    pub crb_listed:                      bool,
    pub crb_listing_date:                Option<SimTime>,
    pub crb_listing_type:                Option<CrbListingType>,
    pub current_loan_tier:               u32,
    pub max_eligible_loan_amount:        Money,
    pub consecutive_on_time_repayments:  u32,
    pub overdraft_limit:                 Money,
    pub times_overdrafted:               u32,
    pub total_overdraft_fees:            Money,
    /// Credit checks on record: lender inquiries plus one per disbursement.
    pub recent_inquiries:                u32,
    pub last_updated:                    SimTime,
}

impl CustomerCreditProfile {
    /// A fresh profile: tier 0, unlisted, every counter zero.
    /// Used when a customer has no persisted profile yet.
    pub fn initial(customer_id: CustomerId, policy: &CreditPolicy, at: SimTime) -> Self {
        Self {
            customer_id,
            credit_score: 500,
            payment_history_score: 70,
            credit_utilization: Decimal::ZERO,
            credit_history_length: 0,
            total_loans_taken: 0,
            total_amount_borrowed: Decimal::ZERO,
            total_amount_repaid: Decimal::ZERO,
            active_loans: 0,
            active_loan_amount: Decimal::ZERO,
            times_defaulted: 0,
            last_default_date: None,
            days_since_last_default: None,
            crb_listed: false,
            crb_listing_date: None,
            crb_listing_type: None,
            current_loan_tier: 0,
            max_eligible_loan_amount: policy.initial_max_eligible_amount,
            consecutive_on_time_repayments: 0,
            overdraft_limit: Decimal::from(5_000),
            times_overdrafted: 0,
            total_overdraft_fees: Decimal::ZERO,
            recent_inquiries: 0,
            last_updated: at,
        }
    }

    pub fn is_first_time_borrower(&self) -> bool {
        self.total_loans_taken == 0
    }

    /// Recompute the fields derived from the rest of the profile.
    pub fn refresh_derived(&mut self) {
        self.days_since_last_default = self
            .last_default_date
            .map(|d| (self.last_updated - d).num_days().max(0));
        self.credit_utilization = if self.max_eligible_loan_amount > Decimal::ZERO {
            (self.active_loan_amount / self.max_eligible_loan_amount)
                .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };
    }

    /// Check the structural invariants against `policy`.
    pub fn check_invariants(&self, policy: &CreditPolicy) -> SimResult<()> {
        let fail = |reason: String| SimError::StateTransition {
            kind: "invariant",
            customer_id: self.customer_id,
            reason,
        };
        if self.current_loan_tier > policy.max_tier {
            return Err(fail(format!(
                "tier {} exceeds max tier {}",
                self.current_loan_tier, policy.max_tier
            )));
        }
        if self.active_loan_amount.is_sign_negative() && !self.active_loan_amount.is_zero() {
            return Err(fail(format!("active loan amount {} is negative", self.active_loan_amount)));
        }
        if self.max_eligible_loan_amount < policy.initial_max_eligible_amount {
            return Err(fail(format!(
                "ceiling {} is below the initial ceiling {}",
                self.max_eligible_loan_amount, policy.initial_max_eligible_amount
            )));
        }
        if !(0..=100).contains(&self.payment_history_score) {
            return Err(fail(format!(
                "payment history score {} outside 0..=100",
                self.payment_history_score
            )));
        }
        if self.crb_listed != self.crb_listing_type.is_some() {
            return Err(fail("CRB flag and listing type disagree".into()));
        }
        Ok(())
    }
}
