//! Historical repayment path.
//!
//! Walks the historical window one calendar month at a time. Each month's
//! repayment rows and loan status updates are one unit of work; the credit
//! events they produce are held back and folded once, after the last month,
//! by the event fold. Repayment odds read the profile as it stood before
//! the pass began.

use crate::{
    clock::{MonthWindow, SimClock},
    config::SimConfig,
    error::SimResult,
    event::CreditEvent,
    event_fold::{EventFold, FoldSummary},
    ledger::CreditLedger,
    loan::DueLoan,
    outcome::{OutcomeDraw, OutcomeMode, OutcomeSimulator},
    profile::CustomerCreditProfile,
    repayment_model::RepaymentContext,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::{ItemOutcome, PhaseSummary, SimSubsystem, SkipReason},
    tier_machine::CreditTierMachine,
    types::CustomerId,
};
use std::collections::BTreeMap;

pub struct HistoricalRepaymentSubsystem {
    config:  SimConfig,
    clock:   SimClock,
    machine: CreditTierMachine,
}

impl HistoricalRepaymentSubsystem {
    pub fn new(config: SimConfig, clock: SimClock) -> Self {
        let machine = CreditTierMachine::new(config.credit.clone());
        Self { config, clock, machine }
    }

    /// Months walked: the transaction history plus the seed window, so
    /// every seed loan comes due inside it.
    pub fn months_back(&self) -> u32 {
        let g = &self.config.generation;
        g.transaction_months + g.seed_application_months
    }

    pub fn windows(&self) -> Vec<MonthWindow> {
        self.clock.month_windows(self.months_back())
    }

    /// Resolve one month's due loans, writing rows and statuses through
    /// `ledger`. Outcome dates are capped at the end of the whole
    /// historical window, not the month. Returns the events for the
    /// later fold.
    pub fn resolve_month<L: CreditLedger>(
        &self,
        ledger: &L,
        loans: &[DueLoan],
        snapshot: &mut BTreeMap<CustomerId, CustomerCreditProfile>,
        summary: &mut PhaseSummary,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<CreditEvent>> {
        let simulator = OutcomeSimulator::new(&self.config.outcome);
        let mode = OutcomeMode::Historical { window_end: self.clock.historical_end() };
        let mut events = Vec::with_capacity(loans.len());

        for loan in loans {
            let customer = ledger.customer_context(loan.customer_id)?;
            let profile = match snapshot.get(&loan.customer_id) {
                Some(p) => p.clone(),
                None => {
                    let p = ledger.credit_profile_or_initial(
                        loan.customer_id,
                        &self.config.credit,
                        loan.due_date,
                    )?;
                    snapshot.insert(loan.customer_id, p.clone());
                    p
                }
            };
            let ctx = RepaymentContext::for_loan(&customer, &profile, loan.category, loan.due_date);

            match simulator.simulate(loan, &ctx, mode, rng)? {
                OutcomeDraw::Resolved(outcome) => {
                    if let Some(repayment) = &outcome.repayment {
                        ledger.append_repayment(repayment)?;
                    }
                    ledger.update_loan_status(&outcome.status)?;
                    events.push(outcome.event);
                    summary.record(ItemOutcome::Applied);
                }
                OutcomeDraw::NotYetOverdue => {
                    summary.record(ItemOutcome::Skipped(SkipReason::NotYetOverdue));
                }
            }
        }
        Ok(events)
    }
}

impl SimSubsystem for HistoricalRepaymentSubsystem {
    fn name(&self) -> &'static str {
        "historical_repayments"
    }

    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary> {
        let mut summary = PhaseSummary::new(self.name());
        let mut snapshot = BTreeMap::new();
        let mut events = Vec::new();

        for window in self.windows() {
            let loans = store.active_loans_due_between(window.start, window.end)?;
            if loans.is_empty() {
                continue;
            }
            // Counts land in a scratch summary so a rolled-back month
            // leaves no trace in the phase totals.
            let mut month = PhaseSummary::new(self.name());
            let result = store.unit_of_work(|s| {
                self.resolve_month(s, &loans, &mut snapshot, &mut month, rng)
            });
            match result {
                Ok(month_events) => {
                    log::debug!(
                        "historical_repayments: {} resolved {} loans",
                        window.label(),
                        month_events.len()
                    );
                    summary.absorb(&month);
                    events.extend(month_events);
                }
                Err(e) => {
                    log::warn!("historical_repayments: month {} rolled back: {e}", window.label());
                    summary.failed += loans.len();
                }
            }
        }

        let fold = EventFold::new(&self.machine);
        let FoldSummary { customers, events: folded, tier_ups, new_defaults, new_listings } =
            fold.aggregate(store, events, self.clock.historical_end())?;

        log::info!(
            "historical_repayments: folded {folded} events for {customers} customers, \
             {tier_ups} tier-ups, {new_defaults} defaults, {new_listings} CRB listings"
        );
        Ok(summary)
    }
}
