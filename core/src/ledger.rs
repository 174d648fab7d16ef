//! The persistence boundary the credit core depends on.
//!
//! RULE: the outcome simulator, event fold and application pipeline only
//! talk to storage through this trait. `SimStore` is the production
//! implementation (store/ledger.rs).

use crate::{
    config::CreditPolicy,
    customer_subsystem::CustomerContext,
    error::SimResult,
    loan::{LoanStatusUpdate, NewApplication, NewLoan, NewRepayment},
    product::ProductCatalog,
    profile::CustomerCreditProfile,
    types::{ApplicationId, CustomerId, LoanId, SimTime},
};

pub trait CreditLedger {
    fn product_catalog(&self) -> SimResult<ProductCatalog>;

    fn customer_context(&self, customer_id: CustomerId) -> SimResult<CustomerContext>;

    /// The persisted profile, or None when the customer has none yet.
    fn credit_profile(&self, customer_id: CustomerId) -> SimResult<Option<CustomerCreditProfile>>;

    fn append_application(&self, application: &NewApplication) -> SimResult<ApplicationId>;

    fn append_loan(&self, loan: &NewLoan) -> SimResult<LoanId>;

    fn append_repayment(&self, repayment: &NewRepayment) -> SimResult<()>;

    fn update_loan_status(&self, update: &LoanStatusUpdate) -> SimResult<()>;

    /// Replace the full profile row.
    fn upsert_credit_profile(&self, profile: &CustomerCreditProfile) -> SimResult<()>;

    /// Run `f` as one unit of work: every write inside it is committed
    /// together, or discarded together when `f` returns an error.
    fn unit_of_work<T, F>(&self, f: F) -> SimResult<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> SimResult<T>;

    /// The persisted profile, or a fresh tier-0 profile.
    fn credit_profile_or_initial(
        &self,
        customer_id: CustomerId,
        policy: &CreditPolicy,
        at: SimTime,
    ) -> SimResult<CustomerCreditProfile> {
        Ok(self
            .credit_profile(customer_id)?
            .unwrap_or_else(|| CustomerCreditProfile::initial(customer_id, policy, at)))
    }
}
