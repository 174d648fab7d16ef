//! Full pipeline runs: cross-table consistency of the generated history.

use chrono::Duration;
use microlend_core::{
    config::SimConfig,
    engine::SimEngine,
    loan::LoanStatus,
    profile::CustomerCreditProfile,
    types::{CustomerId, Money},
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn run(run_id: &str, seed: u64) -> SimEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = SimEngine::build_test(run_id.into(), seed).expect("build");
    let report = engine.run().expect("run");
    assert_eq!(report.total_failed(), 0, "{:?}", report.summaries);
    engine
}

fn profiles(engine: &SimEngine) -> BTreeMap<CustomerId, CustomerCreditProfile> {
    engine
        .store()
        .all_credit_profiles()
        .unwrap()
        .into_iter()
        .map(|p| (p.customer_id, p))
        .collect()
}

#[test]
fn every_phase_runs_in_order() {
    let mut engine = SimEngine::build_test("phases".into(), 5).unwrap();
    let report = engine.run().unwrap();
    let phases: Vec<&str> = report.summaries.iter().map(|s| s.phase.as_str()).collect();
    assert_eq!(
        phases,
        vec![
            "customer",
            "mobile_money",
            "credit_inquiries",
            "seed_applications",
            "historical_repayments",
            "applications",
            "repayments"
        ]
    );
    assert_eq!(report.phase("customer").unwrap().applied, 40);
    assert!(report.phase("historical_repayments").unwrap().applied > 0);
    assert!(report.phase("repayments").unwrap().applied > 0);
}

#[test]
fn profiles_satisfy_invariants_after_a_full_run() {
    let engine = run("invariants", 11);
    let policy = &engine.config().credit;
    let all = profiles(&engine);
    assert_eq!(all.len() as i64, engine.store().customer_count().unwrap());
    for p in all.values() {
        p.check_invariants(policy).unwrap();
        assert!(p.current_loan_tier <= policy.max_tier);
        assert!(p.active_loan_amount >= Decimal::ZERO);
        assert!((300..=850).contains(&p.credit_score), "{}", p.credit_score);
        if p.crb_listed {
            assert!(p.times_defaulted > 0);
            assert!(p.crb_listing_date.is_some());
        }
    }
}

#[test]
fn profiles_agree_with_loans_and_repayments() {
    let engine = run("ledger", 23);
    let store = engine.store();
    let repaid = store.repaid_by_customer().unwrap();

    let mut taken: BTreeMap<CustomerId, u32> = BTreeMap::new();
    let mut borrowed: BTreeMap<CustomerId, Money> = BTreeMap::new();
    let mut active: BTreeMap<CustomerId, u32> = BTreeMap::new();
    for loan in store.all_loans().unwrap() {
        *taken.entry(loan.customer_id).or_default() += 1;
        *borrowed.entry(loan.customer_id).or_default() += loan.principal_amount;
        if loan.status == LoanStatus::Active {
            *active.entry(loan.customer_id).or_default() += 1;
        }
    }

    for (id, p) in profiles(&engine) {
        assert_eq!(p.total_loans_taken, taken.get(&id).copied().unwrap_or(0), "customer {id}");
        assert_eq!(p.total_amount_borrowed, borrowed.get(&id).copied().unwrap_or_default());
        assert_eq!(p.active_loans, active.get(&id).copied().unwrap_or(0), "customer {id}");
        assert_eq!(p.total_amount_repaid, repaid.get(&id).copied().unwrap_or_default());
        assert_eq!(p.times_overdrafted as i64, store.overdraft_count(id).unwrap());
        assert_eq!(
            i64::from(p.recent_inquiries),
            store.inquiry_count(id).unwrap() + i64::from(p.total_loans_taken),
            "customer {id}: one credit check per inquiry and per disbursement"
        );
    }
}

#[test]
fn every_loan_past_due_is_resolved() {
    let engine = run("resolved", 31);
    let store = engine.store();
    let as_of = engine.clock.now();
    let loans = store.all_loans().unwrap();
    assert!(!loans.is_empty());

    for loan in loans {
        if loan.due_date < as_of {
            assert!(loan.status.is_terminal(), "loan {} due {} is still open", loan.loan_id, loan.due_date);
        }
        let repayments = store.repayments_for_loan(loan.loan_id).unwrap();
        match loan.status {
            LoanStatus::Paid => {
                assert_eq!(repayments.len(), 1);
                assert!(repayments[0].amount >= loan.total_repayable);
                assert_eq!(loan.last_payment_date, Some(repayments[0].repayment_date));
            }
            LoanStatus::Defaulted if loan.last_payment_date.is_some() => {
                assert_eq!(repayments.len(), 1, "a partial payment leaves one row");
                assert!(repayments[0].amount < loan.total_repayable);
            }
            LoanStatus::Defaulted => {
                assert!(repayments.is_empty());
                assert!(loan.days_delayed > 0);
            }
            LoanStatus::Active => assert!(repayments.is_empty()),
        }
    }
}

#[test]
fn repayments_never_postdate_the_run_date_except_early_settlements() {
    let engine = run("dates", 47);
    let store = engine.store();
    let as_of = engine.clock.now();
    for loan in store.all_loans().unwrap() {
        for r in store.repayments_for_loan(loan.loan_id).unwrap() {
            assert!(r.repayment_date >= loan.disbursement_date - Duration::days(7));
            if r.repayment_date > as_of {
                assert!(r.repayment_date < loan.due_date, "only early settlements land after the run date");
            }
        }
    }
}

#[test]
fn early_settlement_pass_pays_loans_due_after_the_run_date() {
    let mut config = SimConfig::default_test();
    // Main applications up to the run date, so some loans fall due after it.
    config.generation.main_application_start_days_back = 40;
    config.generation.main_application_end_days_back = 1;
    config.generation.live_lookahead_days = 0;
    config.outcome.early_repayment_probability = 1.0;

    let mut engine = SimEngine::build_test_with("early".into(), 3, config).unwrap();
    engine.run().unwrap();
    let as_of = engine.clock.now();

    let after: Vec<_> = engine
        .store()
        .all_loans()
        .unwrap()
        .into_iter()
        .filter(|l| l.due_date > as_of + Duration::days(1) && l.due_date <= as_of + Duration::days(30))
        .collect();
    assert!(!after.is_empty());
    for loan in after {
        assert_eq!(loan.status, LoanStatus::Paid, "loan {} due {}", loan.loan_id, loan.due_date);
        assert!(loan.days_delayed < 0);
    }
}

#[test]
fn mobile_money_records_wallet_activity_for_active_customers() {
    let engine = run("wallets", 13);
    let store = engine.store();
    let active = store.active_customer_ids().unwrap();
    assert!(!active.is_empty());
    for id in active {
        assert!(store.mobile_money_count(id).unwrap() > 0, "customer {id} has no wallet activity");
    }
}
