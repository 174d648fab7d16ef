use crate::types::CustomerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed or out-of-range monetary, date or count input.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Event payload inconsistent with its kind or with the profile it is folded into.
    #[error("Rejected {kind} event for customer {customer_id}: {reason}")]
    StateTransition {
        kind:        &'static str,
        customer_id: CustomerId,
        reason:      String,
    },

    /// Adapter failure that is not a raw SQLite error (bad stored value, missing row).
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Customer {customer_id} not found")]
    CustomerNotFound { customer_id: CustomerId },

    #[error("Loan product catalog is empty")]
    EmptyCatalog,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }
}

pub type SimResult<T> = Result<T, SimError>;
