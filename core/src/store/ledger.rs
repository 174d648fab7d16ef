use super::SimStore;
use crate::{
    customer_subsystem::CustomerContext,
    error::SimResult,
    ledger::CreditLedger,
    loan::{LoanStatusUpdate, NewApplication, NewLoan, NewRepayment},
    product::ProductCatalog,
    profile::CustomerCreditProfile,
    types::{ApplicationId, CustomerId, LoanId},
};

impl CreditLedger for SimStore {
    fn product_catalog(&self) -> SimResult<ProductCatalog> {
        ProductCatalog::new(self.load_products()?)
    }

    fn customer_context(&self, customer_id: CustomerId) -> SimResult<CustomerContext> {
        self.load_customer_context(customer_id)
    }

    fn credit_profile(&self, customer_id: CustomerId) -> SimResult<Option<CustomerCreditProfile>> {
        self.load_credit_profile(customer_id)
    }

    fn append_application(&self, application: &NewApplication) -> SimResult<ApplicationId> {
        self.insert_application(application)
    }

    fn append_loan(&self, loan: &NewLoan) -> SimResult<LoanId> {
        self.insert_loan(loan)
    }

    fn append_repayment(&self, repayment: &NewRepayment) -> SimResult<()> {
        self.insert_repayment(repayment)
    }

    fn update_loan_status(&self, update: &LoanStatusUpdate) -> SimResult<()> {
        self.set_loan_status(update)
    }

    fn upsert_credit_profile(&self, profile: &CustomerCreditProfile) -> SimResult<()> {
        self.save_credit_profile(profile)
    }

    fn unit_of_work<T, F>(&self, f: F) -> SimResult<T>
    where
        F: FnOnce(&Self) -> SimResult<T>,
    {
        SimStore::unit_of_work(self, f)
    }
}
