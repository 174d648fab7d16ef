//! Credit inquiries: drawn report pulls and the profile counter they move.

mod common;

use chrono::Duration;
use common::*;
use microlend_core::{
    clock::SimClock,
    config::SimConfig,
    inquiry_subsystem::{InquirySubsystem, LenderType},
    ledger::CreditLedger,
    money::to_f64,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
};

fn subsystem(config: SimConfig) -> InquirySubsystem {
    let clock = SimClock::new("inquiries".into(), config.generation.as_of);
    InquirySubsystem::new(config, clock)
}

#[test]
fn drawn_inquiries_fall_in_the_window_in_date_order() {
    let inquiries = subsystem(SimConfig::default_test());
    let (start, end) = inquiries.window();
    assert_eq!(end - start, Duration::days(30 * 15));

    let mut seen_any = false;
    for seed in 0..50 {
        let mut rng = SubsystemRng::new(seed, 6);
        let drawn = inquiries.draw_inquiries(9, &mut rng).unwrap();
        assert!(drawn.len() <= 5);
        seen_any |= !drawn.is_empty();
        for pair in drawn.windows(2) {
            assert!(pair[0].inquiry_date <= pair[1].inquiry_date);
        }
        for i in &drawn {
            assert_eq!(i.customer_id, 9);
            assert!(i.inquiry_date >= start && i.inquiry_date < end, "{}", i.inquiry_date);
            let (low, span) = i.lender_type.amount_range();
            let amount = to_f64(i.amount_requested);
            assert!(amount >= low && amount <= low + span, "{amount} from {}", i.lender_type.as_str());
        }
    }
    assert!(seen_any);
}

#[test]
fn lender_amount_ranges_scale_with_lender_size() {
    assert_eq!(LenderType::CommercialBank.amount_range(), (50_000.0, 500_000.0));
    assert_eq!(LenderType::MobileLender.amount_range(), (1_000.0, 50_000.0));
}

#[test]
fn zero_cap_draws_nothing() {
    let mut config = SimConfig::default_test();
    config.generation.max_inquiries_per_customer = 0;
    let mut rng = SubsystemRng::new(1, 6);
    assert!(subsystem(config).draw_inquiries(1, &mut rng).unwrap().is_empty());
}

#[test]
fn profile_counter_matches_persisted_inquiries() {
    let (store, ids) = store_with_customers(12);
    let mut phase = subsystem(SimConfig::default_test());
    let mut rng = SubsystemRng::new(21, 6);
    let summary = phase.run(&store, &mut rng).unwrap();

    assert_eq!(summary.applied, ids.len());
    assert_eq!(summary.failed, 0);
    let mut total = 0;
    for id in ids {
        let rows = store.inquiry_count(id).unwrap();
        let profile = store.credit_profile(id).unwrap().unwrap();
        assert_eq!(i64::from(profile.recent_inquiries), rows, "customer {id}");
        assert_eq!(profile.total_loans_taken, 0, "an inquiry is not a loan");
        total += rows;
    }
    assert!(total > 0);
}

#[test]
fn same_seed_same_inquiries() {
    let inquiries = subsystem(SimConfig::default_test());
    let mut a = SubsystemRng::new(5, 6);
    let mut b = SubsystemRng::new(5, 6);
    for id in 1..10 {
        assert_eq!(
            inquiries.draw_inquiries(id, &mut a).unwrap(),
            inquiries.draw_inquiries(id, &mut b).unwrap()
        );
    }
}
