//! Shared primitive types used across the entire simulation.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Database identity of a customer.
pub type CustomerId = i64;

/// Database identity of a loan application.
pub type ApplicationId = i64;

/// Database identity of a disbursed loan.
pub type LoanId = i64;

/// Catalog identity of a loan product.
pub type ProductId = i64;

/// The canonical run identifier.
pub type RunId = String;

/// All monetary values, fixed to 2 decimal places by `money::validate_money`.
pub type Money = Decimal;

/// Every simulated instant. Naive: the simulation runs in a single local zone.
pub type SimTime = NaiveDateTime;
