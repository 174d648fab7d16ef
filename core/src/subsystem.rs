//! Subsystem trait and per-item outcome bookkeeping.
//!
//! RULE: Every pipeline phase implements SimSubsystem.
//! The engine calls run() on each registered subsystem once,
//! in registration order. The order is fixed and documented in engine.rs.

use crate::{error::SimResult, ledger::CreditLedger, rng::SubsystemRng, store::SimStore};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// The contract every phase must fulfill.
pub trait SimSubsystem {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Run the phase to completion against `store`, drawing only from `rng`.
    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary>;
}

/// Expected reasons an item is left untouched. These are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoEligibleProduct,
    BelowProductMinimum,
    NotYetOverdue,
    NotSettledEarly,
    InactiveCustomer,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoEligibleProduct => "no eligible product",
            Self::BelowProductMinimum => "below product minimum",
            Self::NotYetOverdue => "not yet overdue",
            Self::NotSettledEarly => "not settled early",
            Self::InactiveCustomer => "inactive customer",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase:   String,
    pub applied: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub failed:  usize,
}

impl PhaseSummary {
    pub fn new(phase: &str) -> Self {
        Self { phase: phase.to_string(), ..Self::default() }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Applied => self.applied += 1,
            ItemOutcome::Skipped(reason) => *self.skipped.entry(reason).or_default() += 1,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn absorb(&mut self, other: &PhaseSummary) {
        self.applied += other.applied;
        self.failed += other.failed;
        for (reason, n) in &other.skipped {
            *self.skipped.entry(*reason).or_default() += n;
        }
    }
}

impl fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: applied={} failed={}", self.phase, self.applied, self.failed)?;
        for (reason, n) in &self.skipped {
            write!(f, " skipped[{reason}]={n}")?;
        }
        Ok(())
    }
}

/// Process one item in its own unit of work. An error rolls back only
/// that item's writes, is logged, and is counted as failed.
pub fn process_isolated<L, F>(ledger: &L, summary: &mut PhaseSummary, item: &str, f: F)
where
    L: CreditLedger,
    F: FnOnce(&L) -> SimResult<ItemOutcome>,
{
    match ledger.unit_of_work(f) {
        Ok(outcome) => summary.record(outcome),
        Err(e) => {
            log::warn!("{}: {item} rolled back: {e}", summary.phase);
            summary.failed += 1;
        }
    }
}
