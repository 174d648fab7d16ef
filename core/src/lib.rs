//! microlend-core: a deterministic microlending credit-history simulator.
//!
//! Generates customers, wallet activity, loan applications and repayment
//! outcomes, and maintains one credit profile per customer by folding
//! credit events through the tier machine.

pub mod application_subsystem;
pub mod clock;
pub mod config;
pub mod customer_subsystem;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_fold;
pub mod historical_repayment_subsystem;
pub mod inquiry_subsystem;
pub mod ledger;
pub mod loan;
pub mod mobile_money_subsystem;
pub mod money;
pub mod name_generator;
pub mod outcome;
pub mod product;
pub mod profile;
pub mod repayment_model;
pub mod repayment_subsystem;
pub mod rng;
pub mod store;
pub mod subsystem;
pub mod tier_machine;
pub mod types;
