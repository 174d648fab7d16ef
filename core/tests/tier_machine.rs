//! Credit tier state machine: transition scenarios and invariants.

mod common;

use common::*;
use microlend_core::{
    config::CreditPolicy,
    error::SimError,
    event::{CrbGate, CreditEvent},
    profile::{CrbListingType, CustomerCreditProfile},
    tier_machine::CreditTierMachine,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn machine() -> CreditTierMachine {
    CreditTierMachine::new(CreditPolicy::default())
}

fn at_tier(tier: u32, ceiling: Decimal) -> CustomerCreditProfile {
    let mut p = fresh(1);
    p.current_loan_tier = tier;
    p.max_eligible_loan_amount = ceiling;
    p.consecutive_on_time_repayments = 0;
    p
}

#[test]
fn early_success_promotes_tier_zero_customer() {
    let m = machine();
    let next = m.next(&fresh(1), &success(1, day(10), dec!(500), 2)).unwrap();

    assert_eq!(next.current_loan_tier, 1);
    assert_eq!(next.consecutive_on_time_repayments, 0, "tier-up consumes the streak");
    // 1000 × 1.5 + 1000 × 1
    assert_eq!(next.max_eligible_loan_amount, dec!(2500));
    assert_eq!(next.payment_history_score, 80);
}

#[test]
fn on_time_success_earns_smaller_bonus() {
    let policy = CreditPolicy { tier_upgrade_threshold: 3, ..CreditPolicy::default() };
    let m = CreditTierMachine::new(policy);
    let next = m.next(&fresh(1), &success(1, day(10), dec!(500), 0)).unwrap();

    assert_eq!(next.payment_history_score, 75);
    assert_eq!(next.consecutive_on_time_repayments, 1);
    assert_eq!(next.current_loan_tier, 0, "streak below threshold keeps the tier");
}

#[test]
fn ceiling_growth_is_capped_at_absolute_max() {
    let m = machine();
    let next = m.next(&at_tier(3, dec!(90000)), &success(1, day(5), dec!(100), 1)).unwrap();
    assert_eq!(next.current_loan_tier, 4);
    assert_eq!(next.max_eligible_loan_amount, dec!(100000));
}

#[test]
fn max_tier_customer_keeps_tier_and_streak_grows() {
    let m = machine();
    let next = m.next(&at_tier(5, dec!(100000)), &success(1, day(5), dec!(100), 1)).unwrap();
    assert_eq!(next.current_loan_tier, 5);
    assert_eq!(next.consecutive_on_time_repayments, 1);
    assert_eq!(next.max_eligible_loan_amount, dec!(100000));
}

#[test]
fn late_success_resets_streak_without_tier_change() {
    let m = machine();
    let mut start = at_tier(2, dec!(5000));
    start.consecutive_on_time_repayments = 4;
    let next = m.next(&start, &success(1, day(20), dec!(800), -12)).unwrap();

    assert_eq!(next.current_loan_tier, 2);
    assert_eq!(next.max_eligible_loan_amount, dec!(5000));
    assert_eq!(next.consecutive_on_time_repayments, 0);
    assert_eq!(next.payment_history_score, 68);
}

#[test]
fn default_resets_tier_two_customer() {
    let m = machine();
    let mut start = at_tier(2, dec!(5000));
    start.consecutive_on_time_repayments = 1;
    let event = default(1, day(30), 10, dec!(600), CrbGate::OverdueThreshold);
    let next = m.next(&start, &event).unwrap();

    assert_eq!(next.current_loan_tier, 0);
    assert_eq!(next.max_eligible_loan_amount, dec!(1000));
    assert_eq!(next.consecutive_on_time_repayments, 0);
    assert_eq!(next.times_defaulted, start.times_defaulted + 1);
    assert_eq!(next.last_default_date, Some(day(40)));
    assert_eq!(next.payment_history_score, 55);
    assert!(!next.crb_listed, "10 days overdue is under the listing threshold");
}

#[test]
fn overdue_default_is_listed_as_major_and_score_floored() {
    let m = machine();
    let mut start = fresh(1);
    start.credit_score = 320;
    let event = default(1, day(30), 90, dec!(15000), CrbGate::OverdueThreshold);
    let next = m.next(&start, &event).unwrap();

    assert!(next.crb_listed);
    assert_eq!(next.crb_listing_type, Some(CrbListingType::MajorDefault));
    assert_eq!(next.crb_listing_date, Some(day(120)));
    assert_eq!(next.credit_score, 300);
}

#[test]
fn each_path_classifies_against_its_own_major_threshold() {
    let m = machine();
    let overdue = default(1, day(30), 90, dec!(1500), CrbGate::OverdueThreshold);
    let drawn = default(1, day(30), 90, dec!(1500), CrbGate::Drawn { list: true });
    assert_eq!(
        m.next(&fresh(1), &overdue).unwrap().crb_listing_type,
        Some(CrbListingType::MinorDefault),
        "1500 is under the historical cut-off of 10000"
    );
    assert_eq!(
        m.next(&fresh(1), &drawn).unwrap().crb_listing_type,
        Some(CrbListingType::MajorDefault),
        "1500 is over the live cut-off of 1000"
    );

    let policy = CreditPolicy {
        historical_crb_major_default_threshold: dec!(1000),
        ..CreditPolicy::default()
    };
    let next = CreditTierMachine::new(policy).next(&fresh(1), &overdue).unwrap();
    assert!(next.crb_listed);
    assert_eq!(next.crb_listing_type, Some(CrbListingType::MajorDefault));
}

#[test]
fn listing_cut_off_compares_the_rounded_amount() {
    let m = machine();
    // 1000.004 is 1000.00 at money precision: not above the cut-off.
    let drawn = default(1, day(10), 90, dec!(1000.004), CrbGate::Drawn { list: true });
    assert_eq!(
        m.next(&fresh(1), &drawn).unwrap().crb_listing_type,
        Some(CrbListingType::MinorDefault)
    );

    let policy = CreditPolicy {
        historical_crb_major_default_threshold: dec!(1000),
        ..CreditPolicy::default()
    };
    let overdue = default(1, day(10), 90, dec!(1000.004), CrbGate::OverdueThreshold);
    let next = CreditTierMachine::new(policy).next(&fresh(1), &overdue).unwrap();
    assert_eq!(next.crb_listing_type, Some(CrbListingType::MinorDefault));

    let over = default(1, day(10), 90, dec!(1000.005), CrbGate::Drawn { list: true });
    assert_eq!(
        m.next(&fresh(1), &over).unwrap().crb_listing_type,
        Some(CrbListingType::MajorDefault),
        "1000.005 rounds half away from zero to 1000.01"
    );
}

#[test]
fn repayment_amounts_are_rounded_before_they_are_applied() {
    let m = machine();
    let open = m.next(&fresh(1), &disbursed(1, day(1), dec!(500))).unwrap();
    let next = m.next(&open, &success(1, day(20), dec!(100.005), 0)).unwrap();

    assert_eq!(next.total_amount_repaid, dec!(100.01));
    assert_eq!(next.active_loan_amount, dec!(399.99));
    assert_eq!(next.active_loan_amount.scale(), 2);
    assert_eq!(open.active_loan_amount - next.active_loan_amount, next.total_amount_repaid);
}

#[test]
fn unreported_product_default_is_never_listed() {
    let m = machine();
    let event = default(1, day(0), 200, dec!(50000), CrbGate::Unreported);
    let next = m.next(&fresh(1), &event).unwrap();
    assert!(!next.crb_listed);
    assert_eq!(next.crb_listing_type, None);
    assert_eq!(next.credit_score, fresh(1).credit_score);
    assert_eq!(next.current_loan_tier, 0);
    assert_eq!(next.times_defaulted, 1);
}

#[test]
fn inquiries_and_disbursements_count_as_credit_checks() {
    let m = machine();
    let inquiry = CreditEvent::Inquiry { customer_id: 1, event_date: day(4) };
    let once = m.next(&fresh(1), &inquiry).unwrap();
    assert_eq!(once.recent_inquiries, 1);
    assert_eq!(once.total_loans_taken, 0);
    assert_eq!(once.max_eligible_loan_amount, fresh(1).max_eligible_loan_amount);

    let next = m.next(&once, &disbursed(1, day(6), dec!(700))).unwrap();
    assert_eq!(next.recent_inquiries, 2);
    assert_eq!(next.total_loans_taken, 1);
}

#[test]
fn small_overdue_default_is_minor() {
    let m = machine();
    let event = default(1, day(0), 100, dec!(1000), CrbGate::OverdueThreshold);
    let next = m.next(&fresh(1), &event).unwrap();
    assert_eq!(next.crb_listing_type, Some(CrbListingType::MinorDefault));
    assert_eq!(next.credit_score, 450);
}

#[test]
fn one_day_short_of_threshold_is_not_listed() {
    let m = machine();
    let event = default(1, day(0), 89, dec!(5000), CrbGate::OverdueThreshold);
    assert!(!m.next(&fresh(1), &event).unwrap().crb_listed);
}

#[test]
fn drawn_gate_ignores_days_overdue() {
    let m = machine();
    let declined = default(1, day(0), 200, dec!(5000), CrbGate::Drawn { list: false });
    assert!(!m.next(&fresh(1), &declined).unwrap().crb_listed);

    let listed = default(1, day(0), 1, dec!(5000), CrbGate::Drawn { list: true });
    let next = m.next(&fresh(1), &listed).unwrap();
    assert!(next.crb_listed);
    assert_eq!(next.crb_listing_type, Some(CrbListingType::MajorDefault));
}

#[test]
fn crb_listing_is_sticky_and_keeps_first_date() {
    let m = machine();
    let first = default(1, day(0), 100, dec!(20000), CrbGate::OverdueThreshold);
    let second = default(1, day(200), 150, dec!(500), CrbGate::OverdueThreshold);
    let after_first = m.next(&fresh(1), &first).unwrap();
    let after_second = m.next(&after_first, &second).unwrap();

    assert!(after_second.crb_listed);
    assert_eq!(after_second.crb_listing_date, Some(day(100)));
    assert_eq!(after_second.crb_listing_type, Some(CrbListingType::MajorDefault));
    assert_eq!(after_second.credit_score, after_first.credit_score, "penalty applies once");

    let recovered = m.next(&after_second, &success(1, day(400), dec!(100), 3)).unwrap();
    assert!(recovered.crb_listed, "a later success never clears the listing");
}

#[test]
fn partial_reduces_active_amount_by_paid_amount_only() {
    let m = machine();
    let open = m.next(&at_tier(2, dec!(5000)), &disbursed(1, day(1), dec!(3000))).unwrap();
    assert_eq!(open.active_loans, 1);
    assert_eq!(open.active_loan_amount, dec!(3000));

    let next = m.next(&open, &partial(1, day(20), dec!(1200))).unwrap();
    assert_eq!(next.current_loan_tier, 0);
    assert_eq!(next.max_eligible_loan_amount, dec!(1000));
    assert_eq!(next.times_defaulted, 1);
    assert_eq!(next.active_loans, 0);
    assert_eq!(next.active_loan_amount, dec!(1800));
    assert_eq!(next.total_amount_repaid, dec!(1200));
    assert_eq!(next.payment_history_score, 65);
}

#[test]
fn disbursement_updates_borrowing_counters() {
    let m = machine();
    let next = m.next(&fresh(1), &disbursed(1, day(3), dec!(800))).unwrap();
    assert_eq!(next.total_loans_taken, 1);
    assert_eq!(next.credit_history_length, 1);
    assert_eq!(next.total_amount_borrowed, dec!(800));
    assert_eq!(next.credit_utilization, dec!(0.8));
    assert!(!next.is_first_time_borrower());
}

#[test]
fn repayment_without_open_loan_floors_at_zero() {
    let m = machine();
    let next = m.next(&fresh(1), &success(1, day(3), dec!(800), -1)).unwrap();
    assert_eq!(next.active_loans, 0);
    assert_eq!(next.active_loan_amount, Decimal::ZERO);
}

#[test]
fn overdraft_activity_accumulates() {
    let m = machine();
    let event = CreditEvent::OverdraftActivity {
        customer_id: 1,
        event_date: day(2),
        times: 3,
        fees: dec!(42.50),
    };
    let once = m.next(&fresh(1), &event).unwrap();
    let twice = m.next(&once, &event).unwrap();
    assert_eq!(twice.times_overdrafted, 6);
    assert_eq!(twice.total_overdraft_fees, dec!(85.00));
}

#[test]
fn days_since_default_tracks_last_update() {
    let m = machine();
    let defaulted = m
        .next(&fresh(1), &default(1, day(0), 5, dec!(500), CrbGate::OverdueThreshold))
        .unwrap();
    assert_eq!(defaulted.days_since_last_default, Some(0));
    let later = m.next(&defaulted, &disbursed(1, day(35), dec!(200))).unwrap();
    assert_eq!(later.days_since_last_default, Some(30));
}

#[test]
fn input_state_is_not_mutated() {
    let m = machine();
    let start = fresh(1);
    let copy = start.clone();
    let _ = m.next(&start, &success(1, day(1), dec!(10), 1)).unwrap();
    assert_eq!(start, copy);
}

#[test]
fn event_for_another_customer_is_rejected() {
    let err = machine().next(&fresh(1), &success(2, day(1), dec!(10), 0)).unwrap_err();
    assert!(matches!(err, SimError::StateTransition { customer_id: 2, .. }), "{err}");
}

#[test]
fn default_before_due_date_is_rejected() {
    let event = default(1, day(10), -3, dec!(100), CrbGate::OverdueThreshold);
    let err = machine().next(&fresh(1), &event).unwrap_err();
    assert!(matches!(err, SimError::StateTransition { kind: "default", .. }), "{err}");
}

#[test]
fn negative_amount_is_rejected() {
    let err = machine().next(&fresh(1), &disbursed(1, day(1), dec!(-5))).unwrap_err();
    assert!(matches!(err, SimError::Validation { field: "principal", .. }), "{err}");
}

fn arb_event() -> impl Strategy<Value = CreditEvent> {
    let amount = (1i64..2_000_000).prop_map(|c| Decimal::new(c, 2));
    prop_oneof![
        (0i64..500, amount.clone()).prop_map(|(d, a)| disbursed(1, day(d), a)),
        (0i64..500, amount.clone(), -60i64..8).prop_map(|(d, a, e)| success(1, day(d), a, e)),
        (0i64..500, amount.clone()).prop_map(|(d, a)| partial(1, day(d), a)),
        (0i64..500, 0i64..200, amount.clone(), any::<bool>(), any::<bool>()).prop_map(
            |(d, late, a, drawn, list)| {
                let gate = if drawn { CrbGate::Drawn { list } } else { CrbGate::OverdueThreshold };
                default(1, day(d), late, a, gate)
            }
        ),
        (0i64..500).prop_map(|d| CreditEvent::Inquiry { customer_id: 1, event_date: day(d) }),
        (0i64..500, 0u32..10, amount).prop_map(|(d, times, fees)| CreditEvent::OverdraftActivity {
            customer_id: 1,
            event_date: day(d),
            times,
            fees,
        }),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_for_any_event_sequence(events in prop::collection::vec(arb_event(), 0..40)) {
        let policy = CreditPolicy::default();
        let m = CreditTierMachine::new(policy.clone());
        let mut state = fresh(1);
        let mut was_listed = false;
        for event in &events {
            let prev_ceiling = state.max_eligible_loan_amount;
            state = m.next(&state, event).unwrap();
            prop_assert!(state.check_invariants(&policy).is_ok());
            prop_assert!(state.current_loan_tier <= policy.max_tier);
            prop_assert!(state.active_loan_amount >= Decimal::ZERO);
            prop_assert!(state.max_eligible_loan_amount <= policy.absolute_max_loan_amount);
            prop_assert!(state.credit_score >= policy.credit_score_floor);
            prop_assert!(!was_listed || state.crb_listed, "CRB listing was cleared");
            was_listed = state.crb_listed;
            match event {
                CreditEvent::Default { .. } | CreditEvent::Partial { .. } => {
                    prop_assert_eq!(state.current_loan_tier, 0);
                    prop_assert_eq!(state.max_eligible_loan_amount, policy.initial_max_eligible_amount);
                    prop_assert_eq!(state.consecutive_on_time_repayments, 0);
                }
                CreditEvent::Success { .. } if state.current_loan_tier == 0 => {}
                CreditEvent::Success { .. } => {
                    prop_assert!(state.max_eligible_loan_amount >= prev_ceiling);
                }
                _ => prop_assert_eq!(state.max_eligible_loan_amount, prev_ceiling),
            }
        }
    }
}
