//! Repayment probability and approval model.

use microlend_core::{
    customer_subsystem::Employment,
    product::LoanCategory,
    repayment_model::{
        approval_probability, repayment_odds, RepaymentContext, APPROVAL_BOUNDS, LATE_BOUNDS,
        REPAYMENT_BOUNDS,
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn ctx(age: u32, income: i64, category: LoanCategory, score: i32) -> RepaymentContext {
    RepaymentContext {
        age,
        monthly_income: Decimal::from(income),
        employment: Employment::Employed,
        loan_category: category,
        credit_score: score,
        times_defaulted: 0,
        times_overdrafted: 0,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn middle_bracket_baseline() {
    let odds = repayment_odds(&ctx(30, 30_000, LoanCategory::Personal, 650));
    assert!(close(odds.repayment, 0.85 * 0.95), "{odds:?}");
    assert!(close(odds.late, 0.5));
}

#[test]
fn strong_young_borrower_is_clamped_at_the_top() {
    let odds = repayment_odds(&ctx(22, 60_000, LoanCategory::Business, 750));
    assert!(close(odds.repayment, 0.95), "{odds:?}");
    assert!(close(odds.late, 0.7 * 0.8));
}

#[test]
fn prior_defaults_compound() {
    let mut c = ctx(40, 20_000, LoanCategory::Personal, 350);
    c.times_defaulted = 2;
    let odds = repayment_odds(&c);
    assert!(close(odds.repayment, 0.85 * 1.10 * 0.6 * 0.81), "{odds:?}");
    assert!(close(odds.late, 0.2));
}

#[test]
fn heavy_overdraft_use_lowers_repayment_and_raises_lateness() {
    let base = repayment_odds(&ctx(40, 20_000, LoanCategory::Personal, 650));
    let mut c = ctx(40, 20_000, LoanCategory::Personal, 650);
    c.times_overdrafted = 4;
    let odds = repayment_odds(&c);
    assert!(close(odds.repayment, base.repayment * 0.8));
    assert!(close(odds.late, base.late * 1.3));

    c.times_overdrafted = 3;
    assert_eq!(repayment_odds(&c), base, "three overdrafts is not yet heavy use");
}

#[test]
fn agricultural_loans_repay_less_often() {
    let personal = repayment_odds(&ctx(40, 20_000, LoanCategory::Personal, 550));
    let agri = repayment_odds(&ctx(40, 20_000, LoanCategory::Agricultural, 550));
    assert!(close(agri.repayment, personal.repayment * 0.9));
}

#[test]
fn weak_profile_is_clamped_at_the_bottom() {
    let mut c = ctx(22, 5_000, LoanCategory::Agricultural, 320);
    c.times_defaulted = 20;
    c.times_overdrafted = 9;
    let odds = repayment_odds(&c);
    assert!(close(odds.repayment, 0.05), "{odds:?}");
    assert!(close(odds.late, 0.9));
}

#[test]
fn employment_does_not_move_the_odds() {
    let employed = ctx(28, 40_000, LoanCategory::Personal, 620);
    let student = RepaymentContext { employment: Employment::Student, ..employed.clone() };
    assert_eq!(repayment_odds(&employed), repayment_odds(&student));
}

#[test]
fn approval_by_score_and_active_loans() {
    assert!(close(approval_probability(350, 0), 0.95 * 0.7));
    assert!(close(approval_probability(450, 0), 0.95 * 0.85));
    assert!(close(approval_probability(700, 0), 0.95));
    assert!(close(approval_probability(700, 2), 0.95 * 0.9));
    assert!(close(approval_probability(700, 20), 0.95 * 0.5));
    assert!(close(approval_probability(350, 20), 0.95 * 0.7 * 0.5));
}

fn arb_category() -> impl Strategy<Value = LoanCategory> {
    prop_oneof![
        Just(LoanCategory::Personal),
        Just(LoanCategory::Emergency),
        Just(LoanCategory::Business),
        Just(LoanCategory::Agricultural),
    ]
}

proptest! {
    #[test]
    fn odds_stay_within_bounds(
        age in 18u32..90,
        income in 0i64..1_000_000,
        category in arb_category(),
        score in 300i32..=850,
        defaults in 0u32..50,
        overdrafts in 0u32..200,
    ) {
        let mut c = ctx(age, income, category, score);
        c.times_defaulted = defaults;
        c.times_overdrafted = overdrafts;
        let odds = repayment_odds(&c);
        prop_assert!(odds.repayment >= REPAYMENT_BOUNDS.0 && odds.repayment <= REPAYMENT_BOUNDS.1);
        prop_assert!(odds.late >= LATE_BOUNDS.0 && odds.late <= LATE_BOUNDS.1);
        prop_assert_eq!(odds, repayment_odds(&c));
    }

    #[test]
    fn approval_stays_within_bounds(score in 0i32..1000, active in 0u32..100) {
        let p = approval_probability(score, active);
        prop_assert!(p >= APPROVAL_BOUNDS.0 && p <= APPROVAL_BOUNDS.1);
    }
}
