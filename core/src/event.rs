//! Credit events: the only way a credit profile changes.
//!
//! RULE: producers build a CreditEvent, the tier machine consumes it,
//! and nothing else mutates a CustomerCreditProfile. Events are
//! transient and never persisted as their own entity.

use crate::{
    error::{SimError, SimResult},
    money::validate_amount,
    types::{CustomerId, Money, SimTime},
};
use serde::{Deserialize, Serialize};

/// How a hard default decides whether it is listed with the CRB.
///
/// The live and historical paths use different policies on purpose.
/// Both are kept; neither is derived from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CrbGate {
    /// Listed when `event_date − due_date ≥ crb_listing_threshold_days`.
    OverdueThreshold,
    /// The listing decision was already drawn by the outcome simulator.
    Drawn { list: bool },
    /// The product does not report to the CRB. Never listed.
    Unreported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreditEvent {
    /// An approved loan was disbursed.
    Disbursed {
        customer_id: CustomerId,
        event_date:  SimTime,
        principal:   Money,
    },
    /// Repaid in full. Positive `days_early_or_late` is early, negative is late.
    Success {
        customer_id:        CustomerId,
        event_date:         SimTime,
        amount_repaid:      Money,
        principal_repaid:   Money,
        days_early_or_late: i64,
    },
    /// Some money changed hands, but the loan is treated as a soft default.
    Partial {
        customer_id:      CustomerId,
        event_date:       SimTime,
        amount_repaid:    Money,
        principal_repaid: Money,
    },
    Default {
        customer_id:      CustomerId,
        event_date:       SimTime,
        due_date:         SimTime,
        total_repayable:  Money,
        principal_repaid: Money,
        crb_gate:         CrbGate,
    },
    /// Wallet overdrafts accumulated over a stretch of mobile-money activity.
    OverdraftActivity {
        customer_id: CustomerId,
        event_date:  SimTime,
        times:       u32,
        fees:        Money,
    },
    /// A lender pulled the customer's credit report.
    Inquiry {
        customer_id: CustomerId,
        event_date:  SimTime,
    },
}

impl CreditEvent {
    pub fn customer_id(&self) -> CustomerId {
        match self {
            Self::Disbursed { customer_id, .. }
            | Self::Success { customer_id, .. }
            | Self::Partial { customer_id, .. }
            | Self::Default { customer_id, .. }
            | Self::OverdraftActivity { customer_id, .. }
            | Self::Inquiry { customer_id, .. } => *customer_id,
        }
    }

    pub fn event_date(&self) -> SimTime {
        match self {
            Self::Disbursed { event_date, .. }
            | Self::Success { event_date, .. }
            | Self::Partial { event_date, .. }
            | Self::Default { event_date, .. }
            | Self::OverdraftActivity { event_date, .. }
            | Self::Inquiry { event_date, .. } => *event_date,
        }
    }

    /// Stable name used in logs and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Disbursed { .. } => "disbursed",
            Self::Success { .. } => "success",
            Self::Partial { .. } => "partial",
            Self::Default { .. } => "default",
            Self::OverdraftActivity { .. } => "overdraft_activity",
            Self::Inquiry { .. } => "inquiry",
        }
    }

    /// Reject payloads that do not make sense for their kind and return
    /// the event with every amount rounded to money precision.
    pub fn validated(&self) -> SimResult<Self> {
        let reject = |reason: String| SimError::StateTransition {
            kind: self.kind_name(),
            customer_id: self.customer_id(),
            reason,
        };
        let mut event = self.clone();
        match &mut event {
            Self::Disbursed { principal, .. } => {
                *principal = validate_amount("principal", *principal)?;
                if principal.is_zero() {
                    return Err(reject("disbursed principal is zero".into()));
                }
            }
            Self::Success { amount_repaid, principal_repaid, .. }
            | Self::Partial { amount_repaid, principal_repaid, .. } => {
                *amount_repaid = validate_amount("amount_repaid", *amount_repaid)?;
                *principal_repaid = validate_amount("principal_repaid", *principal_repaid)?;
                if principal_repaid > amount_repaid {
                    return Err(reject(format!(
                        "principal repaid {principal_repaid} exceeds amount repaid {amount_repaid}"
                    )));
                }
                if matches!(self, Self::Partial { .. }) && amount_repaid.is_zero() {
                    return Err(reject("partial repayment of zero".into()));
                }
            }
            Self::Default { event_date, due_date, total_repayable, principal_repaid, .. } => {
                *total_repayable = validate_amount("total_repayable", *total_repayable)?;
                *principal_repaid = validate_amount("principal_repaid", *principal_repaid)?;
                if event_date < due_date {
                    return Err(reject(format!(
                        "default dated {event_date} before due date {due_date}"
                    )));
                }
                if principal_repaid > total_repayable {
                    return Err(reject(format!(
                        "principal {principal_repaid} exceeds total repayable {total_repayable}"
                    )));
                }
            }
            Self::OverdraftActivity { fees, .. } => {
                *fees = validate_amount("fees", *fees)?;
            }
            Self::Inquiry { .. } => {}
        }
        Ok(event)
    }
}
