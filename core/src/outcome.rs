//! Outcome simulator: one stochastic repayment outcome per due loan.
//!
//! The simulator only decides. It returns the repayment row, the loan
//! status write and the credit event; callers persist them and fold the
//! event.

use crate::{
    config::OutcomeConfig,
    error::SimResult,
    event::{CrbGate, CreditEvent},
    loan::{DueLoan, LoanStatus, LoanStatusUpdate, NewRepayment, PAYMENT_METHODS},
    money::{money_from_f64, round_money, to_f64, validate_amount},
    repayment_model::{repayment_odds, RepaymentContext},
    rng::SubsystemRng,
    types::{Money, SimTime},
};
use chrono::{Duration, NaiveTime};
use rust_decimal::Decimal;

/// Which policy set applies to the draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeMode {
    /// Loans resolved against the run's "now". Partial exposure is wide,
    /// CRB listing is a coin flip, and a loan not yet past due cannot default.
    Live { as_of: SimTime },
    /// Loans resolved month by month inside the historical window.
    /// Partial exposure is narrow and CRB listing waits for the overdue threshold.
    Historical { window_end: SimTime },
}

impl OutcomeMode {
    fn cap(&self) -> SimTime {
        match self {
            Self::Live { as_of } => *as_of,
            Self::Historical { window_end } => *window_end,
        }
    }

    fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Live { .. } => "MPESA",
            Self::Historical { .. } => "MPESA_HIST_",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanOutcome {
    pub repayment: Option<NewRepayment>,
    pub status:    LoanStatusUpdate,
    pub event:     CreditEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeDraw {
    Resolved(LoanOutcome),
    /// The draw said default, but the loan is not past due yet.
    NotYetOverdue,
}

pub struct OutcomeSimulator<'a> {
    config: &'a OutcomeConfig,
}

impl<'a> OutcomeSimulator<'a> {
    pub fn new(config: &'a OutcomeConfig) -> Self {
        Self { config }
    }

    pub fn simulate(
        &self,
        loan: &DueLoan,
        ctx: &RepaymentContext,
        mode: OutcomeMode,
        rng: &mut SubsystemRng,
    ) -> SimResult<OutcomeDraw> {
        let odds = repayment_odds(ctx);
        if rng.next_f64() <= odds.repayment {
            self.repaid(loan, ctx, odds.late, mode, rng).map(OutcomeDraw::Resolved)
        } else {
            self.defaulted(loan, mode, rng)
        }
    }

    fn repaid(
        &self,
        loan: &DueLoan,
        ctx: &RepaymentContext,
        late_probability: f64,
        mode: OutcomeMode,
        rng: &mut SubsystemRng,
    ) -> SimResult<LoanOutcome> {
        let c = self.config;
        let (days_early_or_late, late_fee) = if rng.next_f64() <= late_probability {
            let days_late = rng.range_inclusive(1, c.max_days_late);
            let fee = validate_amount(
                "late_fee",
                loan.total_repayable * c.late_fee_daily_rate * Decimal::from(days_late),
            )?;
            (-days_late, fee)
        } else {
            (rng.range_inclusive(0, c.max_days_early), Money::ZERO)
        };
        let is_late = days_early_or_late < 0;
        let paid_on = with_random_time(
            (loan.due_date - Duration::days(days_early_or_late)).min(mode.cap()),
            mode.cap(),
            rng,
        );

        let partial = match mode {
            OutcomeMode::Live { .. } => {
                let exposed =
                    ctx.age < c.partial_age_cutoff || rng.chance(c.live_partial_exposure);
                exposed && rng.chance(c.live_partial_probability)
            }
            OutcomeMode::Historical { .. } => {
                ctx.age < c.partial_age_cutoff && rng.chance(c.historical_partial_probability)
            }
        };

        let payment_method = rng.pick(&PAYMENT_METHODS).copied().unwrap_or("M-Pesa").to_string();
        let transaction_reference = format!(
            "{}{}",
            mode.reference_prefix(),
            rng.range_inclusive(100_000_000, 999_999_999)
        );
        let days_delayed = (-days_early_or_late).max(0);

        if partial {
            let fraction = rng.uniform(c.partial_fraction_min, c.partial_fraction_max);
            let paid = money_from_f64("amount_repaid", to_f64(loan.total_repayable) * fraction)?;
            return Ok(LoanOutcome {
                repayment: Some(NewRepayment {
                    loan_id: loan.loan_id,
                    repayment_date: paid_on,
                    amount: paid,
                    payment_method,
                    transaction_reference,
                    is_late,
                    late_fee,
                }),
                // A partial payment closes the loan as defaulted.
                status: LoanStatusUpdate {
                    loan_id: loan.loan_id,
                    status: LoanStatus::Defaulted,
                    last_payment_date: Some(paid_on),
                    days_delayed,
                },
                event: CreditEvent::Partial {
                    customer_id: loan.customer_id,
                    event_date: paid_on,
                    amount_repaid: paid,
                    principal_repaid: paid.min(loan.principal_amount),
                },
            });
        }

        let paid = validate_amount("amount_repaid", loan.total_repayable + late_fee)?;
        Ok(LoanOutcome {
            repayment: Some(NewRepayment {
                loan_id: loan.loan_id,
                repayment_date: paid_on,
                amount: paid,
                payment_method,
                transaction_reference,
                is_late,
                late_fee,
            }),
            status: LoanStatusUpdate {
                loan_id: loan.loan_id,
                status: LoanStatus::Paid,
                last_payment_date: Some(paid_on),
                days_delayed: if is_late { days_delayed } else { -days_early_or_late },
            },
            event: CreditEvent::Success {
                customer_id: loan.customer_id,
                event_date: paid_on,
                amount_repaid: paid,
                principal_repaid: loan.principal_amount,
                days_early_or_late,
            },
        })
    }

    fn defaulted(
        &self,
        loan: &DueLoan,
        mode: OutcomeMode,
        rng: &mut SubsystemRng,
    ) -> SimResult<OutcomeDraw> {
        let (event_date, crb_gate) = match mode {
            OutcomeMode::Live { as_of } => {
                if loan.due_date >= as_of {
                    return Ok(OutcomeDraw::NotYetOverdue);
                }
                let list = rng.chance(self.config.live_crb_listing_probability);
                (as_of, CrbGate::Drawn { list })
            }
            OutcomeMode::Historical { window_end } => {
                let lag = rng.range_inclusive(1, self.config.historical_default_max_lag_days);
                let recognised = (loan.due_date + Duration::days(lag)).min(window_end);
                (recognised.max(loan.due_date), CrbGate::OverdueThreshold)
            }
        };
        let crb_gate = if loan.crb_reporting { crb_gate } else { CrbGate::Unreported };

        Ok(OutcomeDraw::Resolved(LoanOutcome {
            repayment: None,
            status: LoanStatusUpdate {
                loan_id: loan.loan_id,
                status: LoanStatus::Defaulted,
                last_payment_date: None,
                days_delayed: (event_date - loan.due_date).num_days(),
            },
            event: CreditEvent::Default {
                customer_id: loan.customer_id,
                event_date,
                due_date: loan.due_date,
                total_repayable: loan.total_repayable,
                principal_repaid: loan.principal_amount,
                crb_gate,
            },
        }))
    }

    /// Live path only: a loan due shortly after `as_of` may be settled
    /// in full ahead of time. Returns None when the draw declines.
    pub fn early_repayment(
        &self,
        loan: &DueLoan,
        as_of: SimTime,
        rng: &mut SubsystemRng,
    ) -> SimResult<Option<LoanOutcome>> {
        let days_until_due = (loan.due_date - as_of).num_days();
        if days_until_due <= 0 || !rng.chance(self.config.early_repayment_probability) {
            return Ok(None);
        }
        let days_early = rng.range_inclusive(1, days_until_due);
        let paid_on =
            with_random_time(loan.due_date - Duration::days(days_early), loan.due_date, rng);
        let amount = round_money(loan.total_repayable);
        let payment_method = rng.pick(&PAYMENT_METHODS).copied().unwrap_or("M-Pesa").to_string();
        let transaction_reference = format!("MPESA{}", rng.range_inclusive(100_000_000, 999_999_999));

        Ok(Some(LoanOutcome {
            repayment: Some(NewRepayment {
                loan_id: loan.loan_id,
                repayment_date: paid_on,
                amount,
                payment_method,
                transaction_reference,
                is_late: false,
                late_fee: Money::ZERO,
            }),
            status: LoanStatusUpdate {
                loan_id: loan.loan_id,
                status: LoanStatus::Paid,
                last_payment_date: Some(paid_on),
                days_delayed: -days_early,
            },
            event: CreditEvent::Success {
                customer_id: loan.customer_id,
                event_date: paid_on,
                amount_repaid: amount,
                principal_repaid: loan.principal_amount,
                days_early_or_late: days_early,
            },
        }))
    }
}

/// Give `at` a random hour and minute on the same day, never later than `cap`.
fn with_random_time(at: SimTime, cap: SimTime, rng: &mut SubsystemRng) -> SimTime {
    let hour = rng.range_inclusive(0, 23) as u32;
    let minute = rng.range_inclusive(0, 59) as u32;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    at.date().and_time(time).min(cap)
}
