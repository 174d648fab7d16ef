//! Shared builders for the integration tests.
#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use microlend_core::{
    config::CreditPolicy,
    event::{CrbGate, CreditEvent},
    profile::CustomerCreditProfile,
    types::{CustomerId, Money, SimTime},
};

pub fn at(y: i32, m: u32, d: u32) -> SimTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

pub fn day(n: i64) -> SimTime {
    at(2024, 1, 1) + Duration::days(n)
}

pub fn fresh(customer_id: CustomerId) -> CustomerCreditProfile {
    CustomerCreditProfile::initial(customer_id, &CreditPolicy::default(), day(0))
}

pub fn disbursed(customer_id: CustomerId, on: SimTime, principal: Money) -> CreditEvent {
    CreditEvent::Disbursed { customer_id, event_date: on, principal }
}

pub fn success(customer_id: CustomerId, on: SimTime, principal: Money, days: i64) -> CreditEvent {
    CreditEvent::Success {
        customer_id,
        event_date: on,
        amount_repaid: principal,
        principal_repaid: principal,
        days_early_or_late: days,
    }
}

pub fn partial(customer_id: CustomerId, on: SimTime, paid: Money) -> CreditEvent {
    CreditEvent::Partial {
        customer_id,
        event_date: on,
        amount_repaid: paid,
        principal_repaid: paid,
    }
}

pub fn default(
    customer_id: CustomerId,
    due: SimTime,
    days_overdue: i64,
    total: Money,
    gate: CrbGate,
) -> CreditEvent {
    CreditEvent::Default {
        customer_id,
        event_date: due + Duration::days(days_overdue),
        due_date: due,
        total_repayable: total,
        principal_repaid: total,
        crb_gate: gate,
    }
}

use microlend_core::{
    clock::SimClock,
    config::SimConfig,
    customer_subsystem::CustomerSubsystem,
    product::default_products,
    rng::SubsystemRng,
    store::SimStore,
};

/// A migrated in-memory store holding `n` generated active customers,
/// each with a fresh profile dated `day(0)`.
pub fn store_with_customers(n: usize) -> (SimStore, Vec<CustomerId>) {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.save_products(&default_products()).expect("products");

    let config = SimConfig::default_test();
    let clock = SimClock::new("test".into(), config.generation.as_of);
    let population = CustomerSubsystem::new(config.clone(), clock);
    let mut rng = SubsystemRng::new(7, 0);
    let mut ids = Vec::with_capacity(n);
    for _ in 0..n {
        let mut record = population.generate_customer(&mut rng).expect("customer");
        record.is_active = true;
        let id = store.insert_customer(&record).expect("insert customer");
        store
            .save_credit_profile(&CustomerCreditProfile::initial(id, &config.credit, day(0)))
            .expect("profile");
        ids.push(id);
    }
    (store, ids)
}
