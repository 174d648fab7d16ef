//! Mobile-money wallet activity.
//!
//! Simulates daily wallet transactions for every active customer over a
//! window ending one year before the run date. Debits that take the
//! balance below zero draw on the customer's overdraft limit and are
//! charged a fee; the customer's overdraft counters then change through
//! an `OverdraftActivity` credit event, like every other profile change.

use crate::{
    clock::{start_of_day, SimClock},
    config::SimConfig,
    customer_subsystem::{CustomerContext, Employment},
    error::SimResult,
    event::CreditEvent,
    ledger::CreditLedger,
    money::{money_from_f64, signed_money_from_f64, to_f64},
    rng::SubsystemRng,
    store::SimStore,
    subsystem::{process_isolated, ItemOutcome, PhaseSummary, SimSubsystem},
    tier_machine::CreditTierMachine,
    types::{CustomerId, Money, SimTime},
};
use chrono::{Datelike, Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const OVERDRAFT_FEE_RATE: f64 = 0.05;
pub const MAX_OVERDRAFT_LIMIT: f64 = 20_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Payment,
    Transfer,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Payment => "Payment",
            Self::Transfer => "Transfer",
            Self::Withdrawal => "Withdrawal",
        }
    }

    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::Transfer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobileMoneyTransaction {
    pub customer_id:      CustomerId,
    pub transaction_date: SimTime,
    pub transaction_type: TransactionType,
    pub amount:           Money,
    pub balance_after:    Money,
    pub is_overdraft:     bool,
    pub overdraft_fee:    Money,
}

/// Overdraft totals for one customer's simulated window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletActivity {
    pub transactions: Vec<MobileMoneyTransaction>,
    pub overdrafts:   u32,
    pub fees:         f64,
}

pub struct MobileMoneySubsystem {
    config:  SimConfig,
    clock:   SimClock,
    machine: CreditTierMachine,
}

impl MobileMoneySubsystem {
    pub fn new(config: SimConfig, clock: SimClock) -> Self {
        let machine = CreditTierMachine::new(config.credit.clone());
        Self { config, clock, machine }
    }

    /// `[start, end)` of the wallet window, in whole days.
    pub fn window(&self) -> (SimTime, SimTime) {
        let end = start_of_day(self.clock.days_before(365).date());
        let start = end - Duration::days(i64::from(self.config.generation.mobile_money_days));
        (start, end)
    }

    pub fn simulate_wallet(
        &self,
        customer: &CustomerContext,
        overdraft_limit: Money,
        rng: &mut SubsystemRng,
    ) -> SimResult<WalletActivity> {
        let (start, end) = self.window();
        let limit = to_f64(overdraft_limit).clamp(0.0, MAX_OVERDRAFT_LIMIT);
        let intensity = self.config.generation.mobile_money_daily_intensity;
        let mut activity = WalletActivity::default();

        let mut day = start;
        while day < end {
            let date = day.date();
            let mut multiplier = if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) { 0.7 } else { 1.0 };
            if date.day() >= 25 {
                multiplier *= 1.5;
            }
            let count = (intensity * multiplier * rng.uniform(0.8, 1.2)).ceil() as u32;
            let mut balance = rng.uniform(500.0, 5_500.0);

            for _ in 0..count {
                let kind = if customer.employment == Employment::Employed
                    && date.day() >= 25
                    && rng.chance(0.3)
                {
                    TransactionType::Deposit
                } else {
                    *rng.weighted(&[
                        (TransactionType::Payment, 40.0),
                        (TransactionType::Transfer, 30.0),
                        (TransactionType::Withdrawal, 30.0),
                    ])
                    .unwrap_or(&TransactionType::Payment)
                };
                let mut amount = match kind {
                    TransactionType::Deposit if customer.employment == Employment::Employed => {
                        rng.uniform(10_000.0, 60_000.0)
                    }
                    TransactionType::Deposit => rng.uniform(500.0, 5_500.0),
                    TransactionType::Withdrawal if customer.is_urban => rng.uniform(200.0, 3_200.0),
                    TransactionType::Withdrawal => rng.uniform(100.0, 2_100.0),
                    TransactionType::Payment => rng.uniform(50.0, 5_050.0),
                    TransactionType::Transfer => rng.uniform(100.0, 3_100.0),
                };
                amount *= rng.uniform(0.8, 1.2);

                let mut fee = 0.0;
                if kind.is_credit() {
                    balance += amount;
                } else {
                    if balance - amount < -limit {
                        // Truncate the debit to what the overdraft allows.
                        amount = balance + limit;
                        if amount <= 0.0 {
                            continue;
                        }
                    }
                    balance -= amount;
                    if balance < 0.0 {
                        fee = -balance * OVERDRAFT_FEE_RATE;
                        activity.overdrafts += 1;
                        activity.fees += fee;
                    }
                }

                let hour = rng.range_inclusive(7, 23) as u32;
                let minute = rng.range_inclusive(0, 59) as u32;
                let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
                activity.transactions.push(MobileMoneyTransaction {
                    customer_id: customer.customer_id,
                    transaction_date: date.and_time(time),
                    transaction_type: kind,
                    amount: money_from_f64("amount", amount)?,
                    balance_after: signed_money_from_f64("balance_after", balance)?,
                    is_overdraft: fee > 0.0,
                    overdraft_fee: money_from_f64("overdraft_fee", fee)?,
                });
            }
            day += Duration::days(1);
        }
        Ok(activity)
    }

    fn process_customer(
        &self,
        store: &SimStore,
        customer: &CustomerContext,
        rng: &mut SubsystemRng,
    ) -> SimResult<ItemOutcome> {
        let profile = store.credit_profile_or_initial(
            customer.customer_id,
            &self.config.credit,
            self.clock.now(),
        )?;
        let activity = self.simulate_wallet(customer, profile.overdraft_limit, rng)?;
        for t in &activity.transactions {
            store.insert_mobile_money_transaction(t)?;
        }
        if activity.overdrafts > 0 {
            let (_, end) = self.window();
            let event = CreditEvent::OverdraftActivity {
                customer_id: customer.customer_id,
                event_date: end,
                times: activity.overdrafts,
                fees: money_from_f64("overdraft_fees", activity.fees)?,
            };
            let next = self.machine.next(&profile, &event)?;
            store.upsert_credit_profile(&next)?;
        }
        Ok(ItemOutcome::Applied)
    }
}

impl SimSubsystem for MobileMoneySubsystem {
    fn name(&self) -> &'static str {
        "mobile_money"
    }

    fn run(&mut self, store: &SimStore, rng: &mut SubsystemRng) -> SimResult<PhaseSummary> {
        let mut summary = PhaseSummary::new(self.name());
        let customers = store.active_customers()?;
        for customer in &customers {
            process_isolated(store, &mut summary, &format!("customer {}", customer.customer_id), |s| {
                self.process_customer(s, customer, rng)
            });
        }
        let (start, end) = self.window();
        log::info!(
            "mobile_money: {} wallets simulated from {} to {} ({} failed)",
            summary.applied,
            start.date(),
            end.date(),
            summary.failed
        );
        Ok(summary)
    }
}
