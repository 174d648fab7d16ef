//! Repayment probability model.
//!
//! Pure functions only. Every random draw happens at the call site so
//! the odds for a given context can be checked without an RNG.

use crate::{
    customer_subsystem::{CustomerContext, Employment},
    product::LoanCategory,
    profile::CustomerCreditProfile,
    types::{Money, SimTime},
};
use rust_decimal::Decimal;

pub const BASE_REPAYMENT_PROBABILITY: f64 = 0.85;
pub const REPAYMENT_BOUNDS: (f64, f64) = (0.05, 0.95);
pub const LATE_BOUNDS: (f64, f64) = (0.1, 0.9);
pub const APPROVAL_BOUNDS: (f64, f64) = (0.1, 0.95);

/// Everything the model looks at for one loan.
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentContext {
    pub age:               u32,
    pub monthly_income:    Money,
    pub employment:        Employment,
    pub loan_category:     LoanCategory,
    pub credit_score:      i32,
    pub times_defaulted:   u32,
    pub times_overdrafted: u32,
}

impl RepaymentContext {
    /// Age is taken at the loan's due date.
    pub fn for_loan(
        customer: &CustomerContext,
        profile: &CustomerCreditProfile,
        loan_category: LoanCategory,
        due_date: SimTime,
    ) -> Self {
        Self {
            age: customer.age_on(due_date),
            monthly_income: customer.monthly_income,
            employment: customer.employment,
            loan_category,
            credit_score: profile.credit_score,
            times_defaulted: profile.times_defaulted,
            times_overdrafted: profile.times_overdrafted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepaymentOdds {
    pub repayment: f64,
    pub late:      f64,
}

/// Map a loan context to its (repayment, late) probabilities.
///
/// Every adjustment multiplies a running accumulator, so the order in
/// which they are applied does not matter. Employment is carried in the
/// context but does not move the odds.
pub fn repayment_odds(ctx: &RepaymentContext) -> RepaymentOdds {
    let (mut late, age_factor) = match ctx.age {
        a if a < 25 => (0.70, 0.85),
        a if a < 35 => (0.50, 0.95),
        _ => (0.20, 1.10),
    };
    let mut repayment = BASE_REPAYMENT_PROBABILITY * age_factor;

    if ctx.monthly_income > Decimal::from(50_000) {
        repayment *= 1.2;
        late *= 0.8;
    }

    if ctx.times_overdrafted > 3 {
        repayment *= 0.8;
        late *= 1.3;
    }

    repayment *= match ctx.loan_category {
        LoanCategory::Business => 1.1,
        LoanCategory::Agricultural => 0.9,
        LoanCategory::Personal | LoanCategory::Emergency => 1.0,
    };

    repayment *= match ctx.credit_score {
        s if s > 700 => 1.1,
        s if s > 600 => 1.0,
        s if s > 500 => 0.9,
        s if s > 400 => 0.8,
        _ => 0.6,
    };

    repayment *= 0.9_f64.powi(ctx.times_defaulted.min(i32::MAX as u32) as i32);

    RepaymentOdds {
        repayment: clamp(repayment, REPAYMENT_BOUNDS),
        late:      clamp(late, LATE_BOUNDS),
    }
}

/// Chance an application is approved, independent of the repayment odds.
pub fn approval_probability(credit_score: i32, active_loans: u32) -> f64 {
    let mut p: f64 = 0.95;
    p *= match credit_score {
        s if s <= 400 => 0.7,
        s if s <= 500 => 0.85,
        s if s <= 600 => 0.95,
        _ => 1.0,
    };
    if active_loans > 0 {
        p *= (1.0 - 0.05 * f64::from(active_loans)).max(0.5);
    }
    clamp(p, APPROVAL_BOUNDS)
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}
