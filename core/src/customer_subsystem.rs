//! Population generator: customers, their demographics and their
//! opening credit profile.

use crate::{
    clock::{age_on, SimClock},
    config::SimConfig,
    error::{SimError, SimResult},
    ledger::CreditLedger,
    money::{money_from_f64, round_money},
    name_generator::NameGenerator,
    profile::CustomerCreditProfile,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::{ItemOutcome, PhaseSummary, SimSubsystem},
    types::{CustomerId, Money, SimTime},
};
use chrono::{Duration, NaiveDate};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::{Deserialize, Serialize};

pub const ACTIVE_SHARE: f64 = 0.8;
pub const HIGH_INCOME_THRESHOLD: i64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Employment {
    Employed,
    SelfEmployed,
    BusinessOwner,
    CasualWorker,
    Student,
    Unemployed,
}

impl Employment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employed => "Employed",
            Self::SelfEmployed => "Self-Employed",
            Self::BusinessOwner => "Business Owner",
            Self::CasualWorker => "Casual Worker",
            Self::Student => "Student",
            Self::Unemployed => "Unemployed",
        }
    }

    pub fn parse(s: &str) -> SimResult<Self> {
        match s {
            "Employed" => Ok(Self::Employed),
            "Self-Employed" => Ok(Self::SelfEmployed),
            "Business Owner" => Ok(Self::BusinessOwner),
            "Casual Worker" => Ok(Self::CasualWorker),
            "Student" => Ok(Self::Student),
            "Unemployed" => Ok(Self::Unemployed),
            other => Err(SimError::Persistence(format!("unknown employment status '{other}'"))),
        }
    }

    /// Salaried or running a business: the higher income ladders.
    pub fn is_earning(&self) -> bool {
        matches!(self, Self::Employed | Self::BusinessOwner)
    }
}

/// Coarse county grouping used for amount adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionCategory {
    Metro,
    Standard,
    Remote,
}

impl RegionCategory {
    pub fn for_county(county: &str) -> Self {
        match county {
            "Nairobi" | "Mombasa" => Self::Metro,
            "Garissa" | "Wajir" | "Mandera" => Self::Remote,
            _ => Self::Standard,
        }
    }
}

/// (county, population weight, urban ratio)
pub const COUNTIES: &[(&str, f64, f64)] = &[
    ("Nairobi", 35.0, 0.95),
    ("Kajiado", 30.0, 0.80),
    ("Kiambu", 27.0, 0.85),
    ("Nakuru", 15.0, 0.65),
    ("Kakamega", 14.0, 0.38),
    ("Kisumu", 14.0, 0.55),
    ("Mombasa", 12.0, 0.85),
    ("Kilifi", 8.0, 0.55),
    ("Meru", 8.0, 0.20),
    ("Bungoma", 8.0, 0.37),
    ("Machakos", 7.0, 0.50),
    ("Kisii", 7.0, 0.43),
    ("Migori", 6.0, 0.44),
    ("Nyeri", 5.0, 0.43),
    ("Laikipia", 5.0, 0.39),
    ("Narok", 5.0, 0.74),
    ("Kericho", 5.0, 0.40),
    ("Kirinyaga", 4.0, 0.43),
    ("Murang'a", 4.0, 0.30),
    ("Trans-Nzoia", 4.0, 0.37),
    ("Homa Bay", 4.0, 0.39),
    ("Uasin Gishu", 4.0, 0.45),
    ("Embu", 3.0, 0.30),
    ("Vihiga", 3.0, 0.30),
    ("Busia", 3.0, 0.39),
    ("Kitui", 2.0, 0.10),
    ("Makueni", 2.0, 0.12),
    ("Siaya", 2.0, 0.25),
    ("Nandi", 2.0, 0.08),
    ("Tharaka-Nithi", 2.0, 0.15),
    ("Kwale", 1.0, 0.43),
    ("Lamu", 1.0, 0.54),
    ("Garissa", 1.0, 0.53),
    ("Wajir", 1.0, 0.30),
    ("Mandera", 1.0, 0.30),
];

/// (min age, max age) with population share.
const AGE_BRACKETS: [((u32, u32), f64); 4] =
    [((18, 25), 0.32), ((26, 35), 0.41), ((36, 45), 0.18), ((46, 65), 0.09)];

fn employment_weights(min_age: u32) -> &'static [(Employment, f64)] {
    match min_age {
        a if a < 26 => &[
            (Employment::Student, 40.0),
            (Employment::CasualWorker, 30.0),
            (Employment::Employed, 20.0),
            (Employment::Unemployed, 10.0),
        ],
        a if a < 36 => &[
            (Employment::Employed, 45.0),
            (Employment::SelfEmployed, 30.0),
            (Employment::BusinessOwner, 15.0),
            (Employment::Unemployed, 10.0),
        ],
        a if a < 46 => &[
            (Employment::Employed, 50.0),
            (Employment::BusinessOwner, 25.0),
            (Employment::SelfEmployed, 20.0),
            (Employment::Unemployed, 5.0),
        ],
        _ => &[
            (Employment::SelfEmployed, 50.0),
            (Employment::BusinessOwner, 30.0),
            (Employment::Employed, 15.0),
            (Employment::Unemployed, 5.0),
        ],
    }
}

/// A customer as generated, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub first_name:        String,
    pub last_name:         String,
    pub gender:            String,
    pub date_of_birth:     NaiveDate,
    pub county:            String,
    pub is_urban:          bool,
    pub employment:        Employment,
    pub monthly_income:    Money,
    pub registration_date: SimTime,
    pub is_active:         bool,
}

/// What the credit core reads about a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerContext {
    pub customer_id:    CustomerId,
    pub date_of_birth:  NaiveDate,
    pub monthly_income: Money,
    pub employment:     Employment,
    pub county:         String,
    pub region:         RegionCategory,
    pub is_urban:       bool,
    pub is_active:      bool,
}

impl CustomerContext {
    pub fn age_on(&self, at: SimTime) -> u32 {
        age_on(self.date_of_birth, at.date())
    }
}

pub struct CustomerSubsystem {
    config: SimConfig,
    clock:  SimClock,
}

impl CustomerSubsystem {
    pub fn new(config: SimConfig, clock: SimClock) -> Self {
        Self { config, clock }
    }

    pub fn generate_customer(&self, rng: &mut SubsystemRng) -> SimResult<CustomerRecord> {
        let as_of = self.clock.now();
        let gender = if rng.chance(0.5) { "M" } else { "F" };
        let county_weights: Vec<((&str, f64), f64)> =
            COUNTIES.iter().map(|(name, w, urban)| ((*name, *urban), *w)).collect();
        let (county, urban_ratio) = rng.weighted(&county_weights).copied().unwrap_or(("Nairobi", 0.95));
        let is_urban = rng.chance(urban_ratio);
        let (first_name, last_name) =
            NameGenerator::full_name(gender.chars().next().unwrap_or('M'), county, rng);

        let (min_age, max_age) = rng.weighted(&AGE_BRACKETS).copied().unwrap_or((26, 35));
        let span = f64::from(max_age - min_age);
        let age = min_age + rng.triangular(0.0, span, span * 0.3) as u32;
        let days_old = i64::from(age) * 365 + rng.range_inclusive(0, 364);
        let date_of_birth = (as_of - Duration::days(days_old)).date();

        let employment = rng
            .weighted(employment_weights(min_age))
            .copied()
            .unwrap_or(Employment::Unemployed);
        let income = monthly_income(min_age, employment, is_urban, rng);

        let registration_date = as_of - Duration::days(rng.range_inclusive(0, 1_095))
            + Duration::minutes(rng.range_inclusive(0, 1_439));

        Ok(CustomerRecord {
            first_name,
            last_name,
            gender: gender.to_string(),
            date_of_birth,
            county: county.to_string(),
            is_urban,
            employment,
            monthly_income: money_from_f64("monthly_income", income)?,
            registration_date,
            is_active: rng.chance(ACTIVE_SHARE),
        })
    }

    /// Opening profile: tier 0 with a drawn score and history.
    pub fn opening_profile(
        &self,
        customer_id: CustomerId,
        customer: &CustomerRecord,
        rng: &mut SubsystemRng,
    ) -> SimResult<CustomerCreditProfile> {
        let mut profile =
            CustomerCreditProfile::initial(customer_id, &self.config.credit, self.clock.now());
        let mut score = 300 + rng.triangular(0.0, 400.0, 180.0) as i32;
        if customer.monthly_income > Decimal::from(HIGH_INCOME_THRESHOLD) {
            score = (score + 100).min(self.config.credit.credit_score_ceiling);
        }
        profile.credit_score = score;
        profile.payment_history_score = 70 + rng.range_inclusive(0, 30) as i32;
        profile.credit_utilization = Decimal::from_f64(rng.uniform(0.05, 0.6))
            .map(|u| u.round_dp(2))
            .unwrap_or(Decimal::ZERO);
        let limit = (5_000.0 * f64::from(score) / 700.0).max(500.0);
        profile.overdraft_limit = round_money(money_from_f64("overdraft_limit", limit)?);
        Ok(profile)
    }
}

fn monthly_income(min_age: u32, employment: Employment, is_urban: bool, rng: &mut SubsystemRng) -> f64 {
    let r = rng.next_f64();
    let base = if min_age < 26 {
        match employment {
            e if e.is_earning() => 15_000.0 + r * 35_000.0,
            Employment::Student => 2_000.0 + r * 10_000.0,
            _ => 5_000.0 + r * 15_000.0,
        }
    } else {
        let (low_share, low, low_span, high_span, other, other_span) = if min_age < 36 {
            (0.8, 20_000.0, 30_000.0, 100_000.0, 10_000.0, 40_000.0)
        } else {
            (0.7, 25_000.0, 25_000.0, 150_000.0, 15_000.0, 60_000.0)
        };
        if employment.is_earning() {
            if rng.chance(low_share) {
                low + r * low_span
            } else {
                50_000.0 + r * high_span
            }
        } else {
            other + r * other_span
        }
    };
    if !employment.is_earning() {
        return base;
    }
    // Earners are re-drawn on the urban or rural ladder.
    let r = rng.next_f64();
    if is_urban {
        30_000.0 + r * 200_000.0
    } else {
        15_000.0 + r * 80_000.0
    }
}

impl SimSubsystem for CustomerSubsystem {
    fn name(&self) -> &'static str {
        "customer"
    }

    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary> {
        let mut summary = PhaseSummary::new(self.name());
        let n = self.config.generation.customer_count;

        // The population is one batch: either every customer lands or none does.
        store.unit_of_work(|s| {
            for _ in 0..n {
                let customer = self.generate_customer(rng)?;
                let customer_id = s.insert_customer(&customer)?;
                let profile = self.opening_profile(customer_id, &customer, rng)?;
                profile.check_invariants(&self.config.credit)?;
                s.upsert_credit_profile(&profile)?;
                summary.record(ItemOutcome::Applied);
            }
            Ok(())
        })?;

        log::info!("customer: onboarded {} customers", summary.applied);
        Ok(summary)
    }
}
