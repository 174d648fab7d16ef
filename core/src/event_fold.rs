//! Event-fold aggregation.
//!
//! Many credit events accumulate for a customer before anything is
//! written. They are grouped by customer, put in event-date order and
//! folded through the tier machine from the state persisted before the
//! fold began. Only the final state is written, once per customer.
//!
//! Tie-break: events with the same event date keep the order in which
//! they were produced (the sort is stable). Customers are processed in
//! ascending id order.

use crate::{
    error::SimResult,
    event::CreditEvent,
    ledger::CreditLedger,
    profile::CustomerCreditProfile,
    tier_machine::CreditTierMachine,
    types::{CustomerId, SimTime},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldSummary {
    pub customers:    usize,
    pub events:       usize,
    pub tier_ups:     usize,
    pub new_defaults: usize,
    pub new_listings: usize,
}

/// Group events per customer and sort each group by event date.
pub fn order_events(events: Vec<CreditEvent>) -> BTreeMap<CustomerId, Vec<CreditEvent>> {
    let mut grouped: BTreeMap<CustomerId, Vec<CreditEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.customer_id()).or_default().push(event);
    }
    for group in grouped.values_mut() {
        group.sort_by_key(CreditEvent::event_date);
    }
    grouped
}

pub struct EventFold<'a> {
    machine: &'a CreditTierMachine,
}

impl<'a> EventFold<'a> {
    pub fn new(machine: &'a CreditTierMachine) -> Self {
        Self { machine }
    }

    /// Fold already-ordered events into `initial`.
    pub fn fold(
        &self,
        initial: &CustomerCreditProfile,
        events: &[CreditEvent],
    ) -> SimResult<CustomerCreditProfile> {
        events
            .iter()
            .try_fold(initial.clone(), |state, event| self.machine.next(&state, event))
    }

    /// Order, fold and persist. Any failure aborts before the first write,
    /// and the writes themselves are one unit of work.
    pub fn aggregate<L: CreditLedger>(
        &self,
        ledger: &L,
        events: Vec<CreditEvent>,
        at: SimTime,
    ) -> SimResult<FoldSummary> {
        let grouped = order_events(events);
        let mut summary = FoldSummary::default();
        let mut finals = Vec::with_capacity(grouped.len());

        for (customer_id, group) in &grouped {
            let initial =
                ledger.credit_profile_or_initial(*customer_id, self.machine.policy(), at)?;
            let mut last = initial.clone();
            for event in group {
                let next = self.machine.next(&last, event)?;
                if next.current_loan_tier > last.current_loan_tier {
                    summary.tier_ups += 1;
                }
                last = next;
            }

            summary.customers += 1;
            summary.events += group.len();
            summary.new_defaults += (last.times_defaulted - initial.times_defaulted) as usize;
            if last.crb_listed && !initial.crb_listed {
                summary.new_listings += 1;
            }
            finals.push(last);
        }

        ledger.unit_of_work(|l| {
            for profile in &finals {
                l.upsert_credit_profile(profile)?;
            }
            Ok(())
        })?;

        log::debug!(
            "event fold: {} events over {} customers, {} tier-ups, {} new CRB listings",
            summary.events,
            summary.customers,
            summary.tier_ups,
            summary.new_listings
        );
        Ok(summary)
    }
}
