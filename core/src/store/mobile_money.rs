use super::{money_to_sql, time_to_sql, SimStore};
use crate::{error::SimResult, mobile_money_subsystem::MobileMoneyTransaction, types::CustomerId};
use rusqlite::params;

impl SimStore {
    // ── Mobile money ──────────────────────────────────────────────

    pub fn insert_mobile_money_transaction(&self, t: &MobileMoneyTransaction) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO mobile_money_transaction (
                customer_id, transaction_date, transaction_type, amount, balance_after,
                is_overdraft, overdraft_fee
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                t.customer_id,
                time_to_sql(t.transaction_date),
                t.transaction_type.as_str(),
                money_to_sql(t.amount),
                money_to_sql(t.balance_after),
                t.is_overdraft,
                money_to_sql(t.overdraft_fee),
            ],
        )?;
        Ok(())
    }

    pub fn mobile_money_count(&self, customer_id: CustomerId) -> SimResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM mobile_money_transaction WHERE customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )?)
    }

    pub fn overdraft_count(&self, customer_id: CustomerId) -> SimResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM mobile_money_transaction
             WHERE customer_id = ?1 AND is_overdraft = 1",
            params![customer_id],
            |row| row.get(0),
        )?)
    }
}
