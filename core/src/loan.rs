//! Application, loan and repayment records.

use crate::{
    error::{SimError, SimResult},
    product::LoanCategory,
    types::{ApplicationId, CustomerId, LoanId, Money, ProductId, SimTime},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// `Active → {Paid, Defaulted}`; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    Paid,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Paid => "Paid",
            Self::Defaulted => "Defaulted",
        }
    }

    pub fn parse(s: &str) -> SimResult<Self> {
        match s {
            "Active" => Ok(Self::Active),
            "Paid" => Ok(Self::Paid),
            "Defaulted" => Ok(Self::Defaulted),
            other => Err(SimError::Persistence(format!("unknown loan status '{other}'"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

pub const PAYMENT_METHODS: [&str; 5] = ["M-Pesa", "Airtel Money", "T-Kash", "Bank Transfer", "Cash"];

pub const REJECTION_REASONS: [&str; 3] = [
    "Insufficient Credit History",
    "High Default Risk",
    "Incomplete Information",
];

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub customer_id:      CustomerId,
    pub product_id:       ProductId,
    pub application_date: SimTime,
    pub amount_requested: Money,
    pub term_days:        u32,
    pub purpose:          String,
    pub status:           ApplicationStatus,
    pub status_date:      SimTime,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub application_id:    ApplicationId,
    pub disbursement_date: SimTime,
    pub principal_amount:  Money,
    pub interest_amount:   Money,
    pub processing_fee:    Money,
    pub total_repayable:   Money,
    pub due_date:          SimTime,
}

/// A loan joined with what the outcome simulator needs to know about it.
#[derive(Debug, Clone, PartialEq)]
pub struct DueLoan {
    pub loan_id:          LoanId,
    pub customer_id:      CustomerId,
    pub category:         LoanCategory,
    pub principal_amount: Money,
    pub total_repayable:  Money,
    pub due_date:         SimTime,
    /// The product reports defaults to the CRB.
    pub crb_reporting:    bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRepayment {
    pub loan_id:               LoanId,
    pub repayment_date:        SimTime,
    pub amount:                Money,
    pub payment_method:        String,
    pub transaction_reference: String,
    pub is_late:               bool,
    pub late_fee:              Money,
}

/// The status write that accompanies an outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanStatusUpdate {
    pub loan_id:           LoanId,
    pub status:            LoanStatus,
    pub last_payment_date: Option<SimTime>,
    pub days_delayed:      i64,
}
