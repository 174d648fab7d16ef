//! Live repayment path.
//!
//! Each due loan is resolved in its own unit of work: rows, status update,
//! one folded event and the profile upsert. A second pass lets loans due
//! shortly after the run date be settled early.

use crate::{
    clock::SimClock,
    config::SimConfig,
    error::SimResult,
    ledger::CreditLedger,
    loan::DueLoan,
    outcome::{LoanOutcome, OutcomeDraw, OutcomeMode, OutcomeSimulator},
    repayment_model::RepaymentContext,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::{process_isolated, ItemOutcome, PhaseSummary, SimSubsystem, SkipReason},
    tier_machine::CreditTierMachine,
    types::SimTime,
};

pub struct RepaymentSubsystem {
    config:  SimConfig,
    clock:   SimClock,
    machine: CreditTierMachine,
}

impl RepaymentSubsystem {
    pub fn new(config: SimConfig, clock: SimClock) -> Self {
        let machine = CreditTierMachine::new(config.credit.clone());
        Self { config, clock, machine }
    }

    /// Due dates the live pass looks at.
    pub fn due_window(&self) -> (SimTime, SimTime) {
        let g = &self.config.generation;
        (
            self.clock.days_before(30 * i64::from(g.live_lookback_months)),
            self.clock.days_after(g.live_lookahead_days),
        )
    }

    /// Due dates eligible for early settlement.
    pub fn early_window(&self) -> (SimTime, SimTime) {
        (
            self.clock.days_after(1),
            self.clock.days_after(self.config.outcome.early_repayment_window_days),
        )
    }

    pub fn resolve_loan<L: CreditLedger>(
        &self,
        ledger: &L,
        loan: &DueLoan,
        rng: &mut SubsystemRng,
    ) -> SimResult<ItemOutcome> {
        let customer = ledger.customer_context(loan.customer_id)?;
        let profile =
            ledger.credit_profile_or_initial(loan.customer_id, &self.config.credit, loan.due_date)?;
        let ctx = RepaymentContext::for_loan(&customer, &profile, loan.category, loan.due_date);
        let simulator = OutcomeSimulator::new(&self.config.outcome);

        match simulator.simulate(loan, &ctx, OutcomeMode::Live { as_of: self.clock.now() }, rng)? {
            OutcomeDraw::NotYetOverdue => Ok(ItemOutcome::Skipped(SkipReason::NotYetOverdue)),
            OutcomeDraw::Resolved(outcome) => {
                self.apply(ledger, &outcome)?;
                Ok(ItemOutcome::Applied)
            }
        }
    }

    /// Early settlement for one loan. A declined draw leaves the loan open.
    pub fn settle_early<L: CreditLedger>(
        &self,
        ledger: &L,
        loan: &DueLoan,
        rng: &mut SubsystemRng,
    ) -> SimResult<ItemOutcome> {
        let simulator = OutcomeSimulator::new(&self.config.outcome);
        match simulator.early_repayment(loan, self.clock.now(), rng)? {
            None => Ok(ItemOutcome::Skipped(SkipReason::NotSettledEarly)),
            Some(outcome) => {
                self.apply(ledger, &outcome)?;
                Ok(ItemOutcome::Applied)
            }
        }
    }

    fn apply<L: CreditLedger>(&self, ledger: &L, outcome: &LoanOutcome) -> SimResult<()> {
        if let Some(repayment) = &outcome.repayment {
            ledger.append_repayment(repayment)?;
        }
        ledger.update_loan_status(&outcome.status)?;
        let customer_id = outcome.event.customer_id();
        let profile = ledger.credit_profile_or_initial(
            customer_id,
            &self.config.credit,
            outcome.event.event_date(),
        )?;
        let next = self.machine.next(&profile, &outcome.event)?;
        ledger.upsert_credit_profile(&next)
    }
}

impl SimSubsystem for RepaymentSubsystem {
    fn name(&self) -> &'static str {
        "repayments"
    }

    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary> {
        let mut summary = PhaseSummary::new(self.name());
        let (start, end) = self.due_window();
        let due = store.active_loans_due_between(start, end)?;
        for loan in &due {
            process_isolated(store, &mut summary, &format!("loan {}", loan.loan_id), |s| {
                self.resolve_loan(s, loan, rng)
            });
        }

        let mut early = PhaseSummary::new(self.name());
        let (early_start, early_end) = self.early_window();
        for loan in &store.active_loans_due_between(early_start, early_end)? {
            process_isolated(store, &mut early, &format!("early settlement of loan {}", loan.loan_id), |s| {
                self.settle_early(s, loan, rng)
            });
        }

        log::info!(
            "repayments: resolved {} of {} due loans ({} not yet overdue, {} failed), {} settled early",
            summary.applied,
            due.len(),
            summary.skipped.get(&SkipReason::NotYetOverdue).copied().unwrap_or(0),
            summary.failed + early.failed,
            early.applied
        );
        summary.applied += early.applied;
        summary.failed += early.failed;
        Ok(summary)
    }
}
