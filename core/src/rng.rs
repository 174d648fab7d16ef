//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the single master seed stored on the run record, and every
//! stochastic function takes its generator as an explicit argument.
//!
//! Each pipeline phase gets its own RNG stream, seeded deterministically
//! from (master_seed XOR slot_index). This means:
//!   - Adding a new phase never changes existing phases' streams.
//!   - Each phase's stream is fully reproducible in isolation.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single phase.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create an RNG from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Roll an integer in [lo, hi]. Returns `lo` when the range is empty.
    pub fn range_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }

    /// Roll an index in [0, n). `n` must be > 0.
    pub fn index_below(&mut self, n: usize) -> usize {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Sample a triangular distribution on [lo, hi] with the given mode.
    pub fn triangular(&mut self, lo: f64, hi: f64, mode: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        let u = self.next_f64();
        let c = (mode - lo) / (hi - lo);
        if u < c {
            lo + ((hi - lo) * (mode - lo) * u).sqrt()
        } else {
            hi - ((hi - lo) * (hi - mode) * (1.0 - u)).sqrt()
        }
    }

    /// Uniform pick from a slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.index_below(items.len());
        items.get(i)
    }

    /// Weighted pick. Falls back to the last entry when rounding leaves
    /// the roll past the cumulative total.
    pub fn weighted<'a, T>(&mut self, choices: &'a [(T, f64)]) -> Option<&'a T> {
        let total: f64 = choices.iter().map(|(_, w)| w).sum();
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (choice, weight) in choices {
            cumulative += weight;
            if roll < cumulative {
                return Some(choice);
            }
        }
        choices.last().map(|(c, _)| c)
    }
}

/// All phase RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_subsystem(&self, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every phase's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Population = 0,
    MobileMoney = 1,
    SeedApplications = 2,
    HistoricalRepayment = 3,
    Applications = 4,
    LiveRepayment = 5,
    CreditInquiries = 6,
    // Add new phases here, append only.
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::MobileMoney => "mobile_money",
            Self::SeedApplications => "seed_applications",
            Self::HistoricalRepayment => "historical_repayment",
            Self::Applications => "applications",
            Self::LiveRepayment => "live_repayment",
            Self::CreditInquiries => "credit_inquiries",
        }
    }
}
