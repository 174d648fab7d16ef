//! The simulation engine: one run of the credit-history pipeline.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Population            (customers and opening credit profiles)
//!   2. Mobile money          (wallet activity, overdraft events)
//!   3. Credit inquiries      (outside-lender report pulls)
//!   4. Seed applications     (older loans for the historical pass)
//!   5. Historical repayments (month by month, one deferred fold)
//!   6. Main applications     (recent loans for the live pass)
//!   7. Live repayments       (per-loan units of work, early settlement)
//!
//! RULES:
//!   - Phases execute in registration order, exactly once per run.
//!   - Phases share nothing but the store.
//!   - All randomness flows through the RngBank; each phase owns a slot.
//!   - Credit profiles change only by folding credit events.

use crate::{
    application_subsystem::ApplicationSubsystem,
    clock::SimClock,
    config::SimConfig,
    customer_subsystem::CustomerSubsystem,
    error::SimResult,
    historical_repayment_subsystem::HistoricalRepaymentSubsystem,
    inquiry_subsystem::InquirySubsystem,
    mobile_money_subsystem::MobileMoneySubsystem,
    repayment_subsystem::RepaymentSubsystem,
    rng::{RngBank, SubsystemSlot},
    store::SimStore,
    subsystem::{PhaseSummary, SimSubsystem},
    types::RunId,
};

/// What a finished run reports, one summary per phase in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub run_id:    RunId,
    pub seed:      u64,
    pub summaries: Vec<PhaseSummary>,
}

impl RunReport {
    pub fn phase(&self, name: &str) -> Option<&PhaseSummary> {
        self.summaries.iter().find(|s| s.phase == name)
    }

    pub fn total_failed(&self) -> usize {
        self.summaries.iter().map(|s| s.failed).sum()
    }
}

pub struct SimEngine {
    pub run_id:   RunId,
    pub clock:    SimClock,
    pub rng_bank: RngBank,
    seed:         u64,
    config:       SimConfig,
    subsystems:   Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    store:        SimStore,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, store: SimStore, config: SimConfig) -> Self {
        Self {
            clock: SimClock::new(run_id.clone(), config.generation.as_of),
            rng_bank: RngBank::new(seed),
            seed,
            config,
            subsystems: Vec::new(),
            store,
            run_id,
        }
    }

    /// Build a fully wired engine with every phase registered.
    /// The store must already be migrated.
    pub fn build(run_id: RunId, seed: u64, store: SimStore, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let mut engine = SimEngine::new(run_id, seed, store, config);
        engine.store.insert_run(
            &engine.run_id,
            seed,
            env!("CARGO_PKG_VERSION"),
            engine.clock.now(),
        )?;
        engine.store.save_products(&engine.config.products)?;

        let config = engine.config.clone();
        let clock = engine.clock.clone();
        // Execution order is fixed. Slots are not: a new phase takes a new slot.
        engine.register(
            SubsystemSlot::Population,
            Box::new(CustomerSubsystem::new(config.clone(), clock.clone())),
        );
        engine.register(
            SubsystemSlot::MobileMoney,
            Box::new(MobileMoneySubsystem::new(config.clone(), clock.clone())),
        );
        engine.register(
            SubsystemSlot::CreditInquiries,
            Box::new(InquirySubsystem::new(config.clone(), clock.clone())),
        );
        engine.register(
            SubsystemSlot::SeedApplications,
            Box::new(ApplicationSubsystem::seed(config.clone(), &clock)),
        );
        engine.register(
            SubsystemSlot::HistoricalRepayment,
            Box::new(HistoricalRepaymentSubsystem::new(config.clone(), clock.clone())),
        );
        engine.register(
            SubsystemSlot::Applications,
            Box::new(ApplicationSubsystem::main(config.clone(), &clock)),
        );
        engine.register(
            SubsystemSlot::LiveRepayment,
            Box::new(RepaymentSubsystem::new(config, clock)),
        );
        Ok(engine)
    }

    /// An in-memory engine on the small test configuration.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_test_with(run_id, seed, SimConfig::default_test())
    }

    pub fn build_test_with(run_id: RunId, seed: u64, config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        Self::build(run_id, seed, store, config)
    }

    /// Register a phase. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    /// Run every registered phase once, in order. A phase-level error
    /// aborts the run; per-item failures are counted in the summaries.
    pub fn run(&mut self) -> SimResult<RunReport> {
        log::info!(
            "run {}: seed {}, as of {}, {} phases",
            self.run_id,
            self.seed,
            self.clock.now().date(),
            self.subsystems.len()
        );
        let mut report = RunReport {
            run_id: self.run_id.clone(),
            seed: self.seed,
            summaries: Vec::with_capacity(self.subsystems.len()),
        };
        for (slot, subsystem) in &mut self.subsystems {
            let mut rng = self.rng_bank.for_subsystem(*slot);
            let summary = subsystem.run(&self.store, &mut rng)?;
            log::debug!("{summary}");
            report.summaries.push(summary);
        }
        log::info!("run {}: complete, {} failed items", self.run_id, report.total_failed());
        Ok(report)
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}
