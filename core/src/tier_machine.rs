//! Credit tier state machine.
//!
//! `next(state, event) -> state'` is pure: no I/O, no randomness, and the
//! input profile is never mutated. Callers decide when the result is
//! persisted (immediately on the live path, once per customer after a
//! fold on the historical path).

use crate::{
    config::CreditPolicy,
    error::{SimError, SimResult},
    event::{CrbGate, CreditEvent},
    money::{round_money, saturating_sub, validate_amount},
    profile::{CrbListingType, CustomerCreditProfile},
    types::{Money, SimTime},
};

pub const PAYMENT_HISTORY_MAX: i32 = 100;
pub const EARLY_BONUS: i32 = 10;
pub const ON_TIME_BONUS: i32 = 5;
pub const LATE_PENALTY: i32 = 2;
pub const PARTIAL_PENALTY: i32 = 5;
pub const DEFAULT_PENALTY: i32 = 15;

#[derive(Debug, Clone)]
pub struct CreditTierMachine {
    policy: CreditPolicy,
}

impl CreditTierMachine {
    pub fn new(policy: CreditPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    /// Apply one event to a profile and return the resulting profile.
    pub fn next(
        &self,
        state: &CustomerCreditProfile,
        event: &CreditEvent,
    ) -> SimResult<CustomerCreditProfile> {
        let event = &event.validated()?;
        if event.customer_id() != state.customer_id {
            return Err(SimError::StateTransition {
                kind: event.kind_name(),
                customer_id: event.customer_id(),
                reason: format!("folded into the profile of customer {}", state.customer_id),
            });
        }

        let mut next = state.clone();
        match event {
            CreditEvent::Disbursed { principal, .. } => {
                // Every disbursement was preceded by a credit check.
                next.recent_inquiries += 1;
                next.total_loans_taken += 1;
                next.credit_history_length += 1;
                next.active_loans += 1;
                next.total_amount_borrowed =
                    validate_amount("total_amount_borrowed", next.total_amount_borrowed + *principal)?;
                next.active_loan_amount =
                    validate_amount("active_loan_amount", next.active_loan_amount + *principal)?;
            }
            CreditEvent::Success {
                amount_repaid,
                principal_repaid,
                days_early_or_late,
                ..
            } => {
                if *days_early_or_late >= 0 {
                    let bonus = if *days_early_or_late > 0 { EARLY_BONUS } else { ON_TIME_BONUS };
                    next.payment_history_score =
                        (next.payment_history_score + bonus).min(PAYMENT_HISTORY_MAX);
                    next.consecutive_on_time_repayments += 1;
                    self.maybe_tier_up(&mut next)?;
                } else {
                    next.consecutive_on_time_repayments = 0;
                    next.payment_history_score = (next.payment_history_score - LATE_PENALTY).max(0);
                }
                close_loan(&mut next, *principal_repaid, *amount_repaid)?;
            }
            CreditEvent::Partial {
                event_date,
                amount_repaid,
                principal_repaid,
                ..
            } => {
                self.reset_after_default(&mut next, *event_date, PARTIAL_PENALTY);
                close_loan(&mut next, *principal_repaid, *amount_repaid)?;
            }
            CreditEvent::Default {
                event_date,
                due_date,
                total_repayable,
                principal_repaid,
                crb_gate,
                ..
            } => {
                self.reset_after_default(&mut next, *event_date, DEFAULT_PENALTY);
                close_loan(&mut next, *principal_repaid, Money::ZERO)?;
                let (list, major_threshold) = match crb_gate {
                    CrbGate::OverdueThreshold => (
                        (*event_date - *due_date).num_days() >= self.policy.crb_listing_threshold_days,
                        self.policy.historical_crb_major_default_threshold,
                    ),
                    CrbGate::Drawn { list } => (*list, self.policy.crb_major_default_threshold),
                    CrbGate::Unreported => (false, self.policy.crb_major_default_threshold),
                };
                if list && !next.crb_listed {
                    next.crb_listed = true;
                    next.crb_listing_date = Some(*event_date);
                    next.crb_listing_type =
                        Some(CrbListingType::for_amount(*total_repayable, major_threshold));
                    next.credit_score = (next.credit_score - self.policy.crb_listing_score_penalty)
                        .max(self.policy.credit_score_floor);
                }
            }
            CreditEvent::OverdraftActivity { times, fees, .. } => {
                next.times_overdrafted += *times;
                next.total_overdraft_fees =
                    validate_amount("total_overdraft_fees", next.total_overdraft_fees + *fees)?;
            }
            CreditEvent::Inquiry { .. } => {
                next.recent_inquiries += 1;
            }
        }

        next.last_updated = next.last_updated.max(event.event_date());
        next.refresh_derived();
        Ok(next)
    }

    fn maybe_tier_up(&self, p: &mut CustomerCreditProfile) -> SimResult<()> {
        if p.consecutive_on_time_repayments < self.policy.tier_upgrade_threshold
            || p.current_loan_tier >= self.policy.max_tier
        {
            return Ok(());
        }
        p.current_loan_tier += 1;
        let grown = p.max_eligible_loan_amount * self.policy.tier_amount_multiplier
            + self.policy.tier_amount_increment * Money::from(p.current_loan_tier);
        p.max_eligible_loan_amount = validate_amount(
            "max_eligible_loan_amount",
            round_money(grown.min(self.policy.absolute_max_loan_amount)),
        )?;
        // The streak is consumed by the promotion.
        p.consecutive_on_time_repayments = 0;
        Ok(())
    }

    fn reset_after_default(&self, p: &mut CustomerCreditProfile, at: SimTime, penalty: i32) {
        p.consecutive_on_time_repayments = 0;
        p.times_defaulted += 1;
        p.last_default_date = Some(at);
        p.current_loan_tier = 0;
        p.max_eligible_loan_amount = self.policy.initial_max_eligible_amount;
        p.payment_history_score = (p.payment_history_score - penalty).max(0);
    }
}

fn close_loan(p: &mut CustomerCreditProfile, principal: Money, repaid: Money) -> SimResult<()> {
    p.active_loans = p.active_loans.saturating_sub(1);
    p.active_loan_amount =
        validate_amount("active_loan_amount", saturating_sub(p.active_loan_amount, principal))?;
    p.total_amount_repaid =
        validate_amount("total_amount_repaid", p.total_amount_repaid + repaid)?;
    Ok(())
}
