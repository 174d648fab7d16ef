//! Loan applications, approval and disbursement.
//!
//! One application is one unit of work: the application row, the loan
//! row and the `Disbursed` fold land together or not at all.

use crate::{
    clock::{start_of_day, SimClock},
    config::SimConfig,
    customer_subsystem::{CustomerContext, RegionCategory},
    error::SimResult,
    event::CreditEvent,
    ledger::CreditLedger,
    loan::{ApplicationStatus, NewApplication, NewLoan, REJECTION_REASONS},
    money::{floor_to_hundred, money_from_f64, to_f64, validate_amount},
    product::{LoanProduct, ProductCatalog},
    profile::CustomerCreditProfile,
    repayment_model::approval_probability,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::{process_isolated, ItemOutcome, PhaseSummary, SimSubsystem, SkipReason},
    tier_machine::CreditTierMachine,
    types::{ApplicationId, CustomerId, Money, SimTime},
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;

/// A requested amount before it is floored to whole hundreds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountDraw {
    pub product_min:   Money,
    pub effective_max: Money,
}

impl AmountDraw {
    pub fn new(product: &LoanProduct, max_eligible: Money) -> Option<Self> {
        let effective_max = product.max_amount.min(max_eligible);
        (product.min_amount <= effective_max).then_some(Self {
            product_min: product.min_amount,
            effective_max,
        })
    }

    /// `min + sqrt(u) × (max − min)`, adjusted for age and region, clamped
    /// back into range and floored to whole hundreds.
    pub fn requested_amount(&self, u: f64, age: u32, region: RegionCategory) -> SimResult<Money> {
        let min = to_f64(self.product_min);
        let max = to_f64(self.effective_max);
        let mut amount = min + u.clamp(0.0, 1.0).sqrt() * (max - min);
        amount *= match region {
            RegionCategory::Metro => 1.2,
            RegionCategory::Remote => 0.7,
            RegionCategory::Standard => 1.0,
        };
        amount *= match age {
            a if a < 25 => 0.7,
            a if a >= 35 => 1.2,
            _ => 1.0,
        };
        let clamped = money_from_f64("amount_requested", amount)?
            .max(self.product_min)
            .min(self.effective_max);
        Ok(floor_to_hundred(clamped).max(self.product_min))
    }
}

/// Applications on `date` for a base daily volume.
pub fn daily_volume(base: u32, date: NaiveDate, rng: &mut SubsystemRng) -> u32 {
    let mut n = base;
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        n = ((f64::from(base) * rng.uniform(0.8, 0.95)) as u32).max(1);
    }
    if date.day() >= 25 {
        n = (f64::from(n) * 1.3) as u32;
    }
    match date.month() {
        1 => (f64::from(n) * 1.4) as u32,
        12 => (f64::from(n) * 1.2) as u32,
        _ => n,
    }
}

pub fn loan_purpose(age: u32, month: u32, rng: &mut SubsystemRng) -> &'static str {
    let by_age: &[(&str, f64)] = match age {
        a if a < 25 => &[
            ("School Fees", 50.0),
            ("Business Capital", 20.0),
            ("Holiday Spending", 15.0),
            ("Other", 15.0),
        ],
        a if a < 35 => &[
            ("Business Capital", 40.0),
            ("Household Expenses", 25.0),
            ("Rent", 20.0),
            ("Other", 15.0),
        ],
        _ => &[
            ("Medical Expenses", 35.0),
            ("Family Emergency", 30.0),
            ("Business Capital", 20.0),
            ("Other", 15.0),
        ],
    };
    let purpose = rng.weighted(by_age).copied().unwrap_or("Other");
    match month {
        1 | 5 | 9 if rng.chance(0.5) => "School Fees",
        4 | 10 if rng.chance(0.3) => "Business Capital",
        12 if rng.chance(0.4) => "Holiday Spending",
        _ => purpose,
    }
}

/// Interest, fee and total for an approved amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanPricing {
    pub interest:        Money,
    pub processing_fee:  Money,
    pub total_repayable: Money,
}

impl LoanPricing {
    /// Interest is `rate% × term / 30`. First-time borrowers pay
    /// `first_time_fee_rate` instead of the product fee.
    pub fn price(
        product: &LoanProduct,
        amount: Money,
        term_days: u32,
        first_time: bool,
        first_time_fee_rate: Decimal,
    ) -> SimResult<Self> {
        let hundred = Decimal::ONE_HUNDRED;
        let interest = validate_amount(
            "interest_amount",
            amount * product.interest_rate_pct / hundred * Decimal::from(term_days) / Decimal::from(30),
        )?;
        let fee_rate = if first_time {
            first_time_fee_rate
        } else {
            product.processing_fee_pct / hundred
        };
        let processing_fee = validate_amount("processing_fee", amount * fee_rate)?;
        let total_repayable = validate_amount("total_repayable", amount + interest + processing_fee)?;
        Ok(Self { interest, processing_fee, total_repayable })
    }
}

pub struct ApplicationSubsystem {
    name:    &'static str,
    config:  SimConfig,
    machine: CreditTierMachine,
    start:   NaiveDate,
    end:     NaiveDate,
}

impl ApplicationSubsystem {
    /// The seed window, resolved later by the historical repayment pass.
    pub fn seed(config: SimConfig, clock: &SimClock) -> Self {
        let g = &config.generation;
        let end = clock.days_before(30 * i64::from(g.transaction_months.saturating_sub(1)));
        let start = end - Duration::days(30 * i64::from(g.seed_application_months));
        Self::new("seed_applications", config, start.date(), end.date())
    }

    /// The main window, resolved later by the live repayment pass.
    pub fn main(config: SimConfig, clock: &SimClock) -> Self {
        let g = &config.generation;
        let start = clock.days_before(g.main_application_start_days_back);
        let end = clock.days_before(g.main_application_end_days_back);
        Self::new("applications", config, start.date(), end.date())
    }

    pub fn new(name: &'static str, config: SimConfig, start: NaiveDate, end: NaiveDate) -> Self {
        let machine = CreditTierMachine::new(config.credit.clone());
        Self { name, config, machine, start, end }
    }

    /// Inclusive date range covered by this pass.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }

    /// Decide, price and record one application.
    pub fn process_application<L: CreditLedger>(
        &self,
        ledger: &L,
        catalog: &ProductCatalog,
        customer_id: CustomerId,
        applied_at: SimTime,
        rng: &mut SubsystemRng,
    ) -> SimResult<ItemOutcome> {
        let customer = ledger.customer_context(customer_id)?;
        if !customer.is_active {
            return Ok(ItemOutcome::Skipped(SkipReason::InactiveCustomer));
        }
        let profile =
            ledger.credit_profile_or_initial(customer_id, &self.config.credit, applied_at)?;

        let Some(product) =
            catalog.select_for(profile.current_loan_tier, profile.max_eligible_loan_amount, rng)
        else {
            return Ok(ItemOutcome::Skipped(SkipReason::NoEligibleProduct));
        };
        let Some(draw) = AmountDraw::new(product, profile.max_eligible_loan_amount) else {
            return Ok(ItemOutcome::Skipped(SkipReason::BelowProductMinimum));
        };

        let age = customer.age_on(applied_at);
        let amount = draw.requested_amount(rng.next_f64(), age, customer.region)?;
        let term_days = if profile.current_loan_tier == 0 {
            product.min_term_days
        } else {
            rng.range_inclusive(i64::from(product.min_term_days), i64::from(product.max_term_days))
                as u32
        };
        let purpose = loan_purpose(age, applied_at.month(), rng);
        let approved = rng.chance(approval_probability(profile.credit_score, profile.active_loans));
        let decided_at = applied_at + Duration::minutes(rng.range_inclusive(0, 120));

        let rejection_reason = if approved {
            None
        } else {
            rng.pick(&REJECTION_REASONS).map(|r| r.to_string())
        };
        let application_id = ledger.append_application(&NewApplication {
            customer_id,
            product_id: product.product_id,
            application_date: applied_at,
            amount_requested: amount,
            term_days,
            purpose: purpose.to_string(),
            status: if approved { ApplicationStatus::Approved } else { ApplicationStatus::Rejected },
            status_date: decided_at,
            rejection_reason,
        })?;
        if !approved {
            return Ok(ItemOutcome::Applied);
        }

        self.disburse(ledger, &customer, &profile, product, application_id, amount, term_days, decided_at)?;
        Ok(ItemOutcome::Applied)
    }

    #[allow(clippy::too_many_arguments)]
    fn disburse<L: CreditLedger>(
        &self,
        ledger: &L,
        customer: &CustomerContext,
        profile: &CustomerCreditProfile,
        product: &LoanProduct,
        application_id: ApplicationId,
        amount: Money,
        term_days: u32,
        disbursed_at: SimTime,
    ) -> SimResult<()> {
        let pricing = LoanPricing::price(
            product,
            amount,
            term_days,
            profile.is_first_time_borrower(),
            self.config.generation.first_time_fee_rate,
        )?;
        ledger.append_loan(&NewLoan {
            application_id,
            disbursement_date: disbursed_at,
            principal_amount: amount,
            interest_amount: pricing.interest,
            processing_fee: pricing.processing_fee,
            total_repayable: pricing.total_repayable,
            due_date: disbursed_at + Duration::days(i64::from(term_days)),
        })?;
        let event = CreditEvent::Disbursed {
            customer_id: customer.customer_id,
            event_date: disbursed_at,
            principal: amount,
        };
        let next = self.machine.next(profile, &event)?;
        ledger.upsert_credit_profile(&next)
    }
}

impl SimSubsystem for ApplicationSubsystem {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary> {
        let mut summary = PhaseSummary::new(self.name);
        let catalog = store.product_catalog()?;
        let customers = store.active_customer_ids()?;
        if customers.is_empty() {
            log::warn!("{}: no active customers, nothing to apply for", self.name);
            return Ok(summary);
        }
        let (before_total, before_approved) = store.application_counts()?;

        let mut date = self.start;
        while date <= self.end {
            let day = start_of_day(date);
            for _ in 0..daily_volume(self.config.generation.loan_apps_per_day, date, rng) {
                let Some(&customer_id) = rng.pick(&customers) else { break };
                let applied_at = day + Duration::seconds(rng.range_inclusive(0, 86_399));
                process_isolated(store, &mut summary, &format!("application for customer {customer_id}"), |s| {
                    self.process_application(s, &catalog, customer_id, applied_at, rng)
                });
            }
            if date.day() == 1 {
                log::debug!("{}: reached {}", self.name, date.format("%Y-%m"));
            }
            date += Duration::days(1);
        }

        let (total, approved) = store.application_counts()?;
        log::info!(
            "{}: {} applications from {} to {}, {} approved, {} skipped, {} failed",
            self.name,
            total - before_total,
            self.start,
            self.end,
            approved - before_approved,
            summary.skipped_total(),
            summary.failed
        );
        Ok(summary)
    }
}
