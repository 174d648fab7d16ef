//! Event-fold aggregation: ordering, tie-breaks, determinism and the
//! all-or-nothing final write.

mod common;

use common::*;
use microlend_core::{
    config::CreditPolicy,
    event::{CrbGate, CreditEvent},
    event_fold::{order_events, EventFold},
    ledger::CreditLedger,
    tier_machine::CreditTierMachine,
};
use rust_decimal_macros::dec;

fn machine() -> CreditTierMachine {
    CreditTierMachine::new(CreditPolicy::default())
}

#[test]
fn events_are_folded_in_event_date_order_not_generation_order() {
    let (store, ids) = store_with_customers(1);
    let c = ids[0];
    let m = machine();

    // Generated default-first, but the default is dated after the success.
    let events = vec![
        default(c, day(40), 10, dec!(700), CrbGate::OverdueThreshold),
        success(c, day(10), dec!(500), 3),
        disbursed(c, day(1), dec!(500)),
    ];
    EventFold::new(&m).aggregate(&store, events, day(0)).unwrap();

    let p = store.credit_profile(c).unwrap().unwrap();
    assert_eq!(p.current_loan_tier, 0, "the later default wins");
    assert_eq!(p.times_defaulted, 1);
    assert_eq!(p.max_eligible_loan_amount, dec!(1000));
    assert_eq!(p.total_loans_taken, 1);
    assert_eq!(p.last_updated, day(50));
}

#[test]
fn reversed_dates_give_a_different_final_state() {
    let (store, ids) = store_with_customers(1);
    let c = ids[0];
    let m = machine();

    let events = vec![
        default(c, day(5), 10, dec!(700), CrbGate::OverdueThreshold),
        success(c, day(40), dec!(500), 3),
    ];
    EventFold::new(&m).aggregate(&store, events, day(0)).unwrap();

    let p = store.credit_profile(c).unwrap().unwrap();
    assert_eq!(p.current_loan_tier, 1, "the later success promotes again");
    assert_eq!(p.max_eligible_loan_amount, dec!(2500));
}

#[test]
fn same_date_events_keep_insertion_order() {
    let a = disbursed(1, day(5), dec!(100));
    let b = success(1, day(5), dec!(100), 0);
    let c = disbursed(1, day(2), dec!(300));

    let grouped = order_events(vec![a.clone(), b.clone(), c.clone()]);
    assert_eq!(grouped[&1], vec![c.clone(), a.clone(), b.clone()]);

    let grouped = order_events(vec![b.clone(), a.clone(), c.clone()]);
    assert_eq!(grouped[&1], vec![c, b, a]);
}

#[test]
fn events_are_grouped_per_customer_in_ascending_id() {
    let grouped = order_events(vec![
        disbursed(9, day(1), dec!(10)),
        disbursed(3, day(2), dec!(10)),
        disbursed(9, day(0), dec!(20)),
    ]);
    assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec![3, 9]);
    assert_eq!(grouped[&9][0].event_date(), day(0));
}

#[test]
fn folding_twice_is_bit_identical() {
    let events = |c| {
        vec![
            disbursed(c, day(1), dec!(900)),
            success(c, day(8), dec!(900), 1),
            disbursed(c, day(9), dec!(1500)),
            partial(c, day(9), dec!(600)),
            CreditEvent::OverdraftActivity {
                customer_id: c,
                event_date: day(9),
                times: 2,
                fees: dec!(12.40),
            },
        ]
    };
    let m = machine();

    let (store_a, ids_a) = store_with_customers(1);
    let (store_b, ids_b) = store_with_customers(1);
    EventFold::new(&m).aggregate(&store_a, events(ids_a[0]), day(0)).unwrap();
    EventFold::new(&m).aggregate(&store_b, events(ids_b[0]), day(0)).unwrap();

    assert_eq!(
        store_a.credit_profile(ids_a[0]).unwrap(),
        store_b.credit_profile(ids_b[0]).unwrap()
    );

    let initial = fresh(ids_a[0]);
    let ordered = order_events(events(ids_a[0])).remove(&ids_a[0]).unwrap();
    let folded = EventFold::new(&m).fold(&initial, &ordered).unwrap();
    assert_eq!(EventFold::new(&m).fold(&initial, &ordered).unwrap(), folded);
}

#[test]
fn fold_starts_from_the_persisted_state() {
    let (store, ids) = store_with_customers(1);
    let c = ids[0];
    let m = machine();

    let mut persisted = store.credit_profile(c).unwrap().unwrap();
    persisted.current_loan_tier = 2;
    persisted.max_eligible_loan_amount = dec!(5000);
    persisted.times_defaulted = 3;
    store.upsert_credit_profile(&persisted).unwrap();

    EventFold::new(&m)
        .aggregate(&store, vec![success(c, day(3), dec!(100), 0)], day(0))
        .unwrap();

    let p = store.credit_profile(c).unwrap().unwrap();
    assert_eq!(p.current_loan_tier, 3);
    assert_eq!(p.max_eligible_loan_amount, dec!(10500));
    assert_eq!(p.times_defaulted, 3);
}

#[test]
fn summary_counts_tier_ups_defaults_and_listings() {
    let (store, ids) = store_with_customers(2);
    let m = machine();
    let events = vec![
        success(ids[0], day(3), dec!(100), 2),
        success(ids[0], day(9), dec!(100), 2),
        default(ids[1], day(0), 95, dec!(2500), CrbGate::OverdueThreshold),
    ];
    let summary = EventFold::new(&m).aggregate(&store, events, day(0)).unwrap();

    assert_eq!(summary.customers, 2);
    assert_eq!(summary.events, 3);
    assert_eq!(summary.tier_ups, 2);
    assert_eq!(summary.new_defaults, 1);
    assert_eq!(summary.new_listings, 1);
}

#[test]
fn a_bad_event_aborts_the_fold_before_any_write() {
    let (store, ids) = store_with_customers(2);
    let m = machine();
    let before: Vec<_> = ids.iter().map(|c| store.credit_profile(*c).unwrap()).collect();

    let events = vec![
        success(ids[0], day(3), dec!(100), 2),
        // Dated before its own due date.
        default(ids[1], day(30), -5, dec!(100), CrbGate::OverdueThreshold),
    ];
    assert!(EventFold::new(&m).aggregate(&store, events, day(0)).is_err());

    let after: Vec<_> = ids.iter().map(|c| store.credit_profile(*c).unwrap()).collect();
    assert_eq!(before, after, "no profile may be written when the fold fails");
}

#[test]
fn unknown_customer_is_refused_by_the_store() {
    let (store, ids) = store_with_customers(1);
    let m = machine();
    let fold = EventFold::new(&m);
    let missing = ids[0] + 1;
    // No customer row either: the upsert is refused and nothing is written.
    let result = fold.aggregate(&store, vec![disbursed(missing, day(1), dec!(10))], day(0));
    assert!(result.is_err());
    assert!(store.credit_profile(missing).unwrap().is_none());
}
