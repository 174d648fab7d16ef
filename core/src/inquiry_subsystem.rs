//! Credit inquiries: outside lenders pulling a customer's credit report.
//!
//! Every customer gets 0..=N inquiries spread over the transaction
//! window. Rows are persisted as-is; the profile's inquiry counter moves
//! only by folding one `Inquiry` credit event per row.

use crate::{
    clock::SimClock,
    config::SimConfig,
    error::SimResult,
    event::CreditEvent,
    event_fold::EventFold,
    ledger::CreditLedger,
    money::money_from_f64,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::{process_isolated, ItemOutcome, PhaseSummary, SimSubsystem},
    tier_machine::CreditTierMachine,
    types::{CustomerId, Money, SimTime},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LenderType {
    CommercialBank,
    Sacco,
    Microfinance,
    MobileLender,
}

impl LenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommercialBank => "Commercial Bank",
            Self::Sacco => "Sacco",
            Self::Microfinance => "Microfinance",
            Self::MobileLender => "Mobile Lender",
        }
    }

    /// `[low, low + span)` requested by this kind of lender.
    pub fn amount_range(&self) -> (f64, f64) {
        match self {
            Self::CommercialBank => (50_000.0, 500_000.0),
            Self::Sacco => (20_000.0, 300_000.0),
            Self::Microfinance => (5_000.0, 100_000.0),
            Self::MobileLender => (1_000.0, 50_000.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryPurpose {
    LoanApplication,
    CreditCard,
    Overdraft,
}

impl InquiryPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoanApplication => "Loan Application",
            Self::CreditCard => "Credit Card",
            Self::Overdraft => "Overdraft",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryStatus {
    Approved,
    Pending,
    Rejected,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Pending => "Pending",
            Self::Rejected => "Rejected",
        }
    }
}

const LENDERS: [(LenderType, f64); 4] = [
    (LenderType::CommercialBank, 30.0),
    (LenderType::Sacco, 25.0),
    (LenderType::Microfinance, 20.0),
    (LenderType::MobileLender, 25.0),
];

const PURPOSES: [(InquiryPurpose, f64); 3] = [
    (InquiryPurpose::LoanApplication, 40.0),
    (InquiryPurpose::CreditCard, 30.0),
    (InquiryPurpose::Overdraft, 30.0),
];

const STATUSES: [(InquiryStatus, f64); 3] = [
    (InquiryStatus::Approved, 40.0),
    (InquiryStatus::Pending, 30.0),
    (InquiryStatus::Rejected, 30.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CreditInquiry {
    pub customer_id:      CustomerId,
    pub inquiry_date:     SimTime,
    pub lender_type:      LenderType,
    pub purpose:          InquiryPurpose,
    pub amount_requested: Money,
    pub status:           InquiryStatus,
}

impl CreditInquiry {
    pub fn event(&self) -> CreditEvent {
        CreditEvent::Inquiry { customer_id: self.customer_id, event_date: self.inquiry_date }
    }
}

pub struct InquirySubsystem {
    config:  SimConfig,
    clock:   SimClock,
    machine: CreditTierMachine,
}

impl InquirySubsystem {
    pub fn new(config: SimConfig, clock: SimClock) -> Self {
        let machine = CreditTierMachine::new(config.credit.clone());
        Self { config, clock, machine }
    }

    /// `[as_of − 30 × transaction_months days, as_of)`.
    pub fn window(&self) -> (SimTime, SimTime) {
        let months = i64::from(self.config.generation.transaction_months);
        (self.clock.days_before(30 * months), self.clock.now())
    }

    /// The inquiries on one customer's file, in date order.
    pub fn draw_inquiries(
        &self,
        customer_id: CustomerId,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<CreditInquiry>> {
        let (start, end) = self.window();
        let span = (end - start).num_seconds().max(1);
        let count = rng.range_inclusive(0, i64::from(self.config.generation.max_inquiries_per_customer));

        let mut inquiries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let inquiry_date = start + Duration::seconds(rng.range_inclusive(0, span - 1));
            let lender_type = *rng.weighted(&LENDERS).unwrap_or(&LenderType::MobileLender);
            let purpose = *rng.weighted(&PURPOSES).unwrap_or(&InquiryPurpose::LoanApplication);
            let (low, span) = lender_type.amount_range();
            let amount = low + rng.next_f64() * span;
            let status = *rng.weighted(&STATUSES).unwrap_or(&InquiryStatus::Pending);
            inquiries.push(CreditInquiry {
                customer_id,
                inquiry_date,
                lender_type,
                purpose,
                amount_requested: money_from_f64("amount_requested", amount)?,
                status,
            });
        }
        inquiries.sort_by_key(|i| i.inquiry_date);
        Ok(inquiries)
    }

    fn process_customer(
        &self,
        store: &SimStore,
        customer_id: CustomerId,
        rng: &mut SubsystemRng,
    ) -> SimResult<usize> {
        let inquiries = self.draw_inquiries(customer_id, rng)?;
        if inquiries.is_empty() {
            return Ok(0);
        }
        for inquiry in &inquiries {
            store.insert_credit_inquiry(inquiry)?;
        }
        let events: Vec<CreditEvent> = inquiries.iter().map(CreditInquiry::event).collect();
        let profile =
            store.credit_profile_or_initial(customer_id, &self.config.credit, self.clock.now())?;
        let next = EventFold::new(&self.machine).fold(&profile, &events)?;
        store.upsert_credit_profile(&next)?;
        Ok(inquiries.len())
    }
}

impl SimSubsystem for InquirySubsystem {
    fn name(&self) -> &'static str {
        "credit_inquiries"
    }

    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary> {
        let mut summary = PhaseSummary::new(self.name());
        let mut total = 0;
        for customer_id in store.customer_ids()? {
            process_isolated(store, &mut summary, &format!("customer {customer_id}"), |s| {
                total += self.process_customer(s, customer_id, rng)?;
                Ok(ItemOutcome::Applied)
            });
        }
        log::info!(
            "credit_inquiries: {} inquiries over {} customers ({} failed)",
            total,
            summary.applied,
            summary.failed
        );
        Ok(summary)
    }
}
