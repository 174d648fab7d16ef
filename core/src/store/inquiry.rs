use super::{money_to_sql, time_to_sql, SimStore};
use crate::{error::SimResult, inquiry_subsystem::CreditInquiry, types::CustomerId};
use rusqlite::params;

impl SimStore {
    // ── Credit inquiries ──────────────────────────────────────────

    pub fn insert_credit_inquiry(&self, i: &CreditInquiry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO credit_inquiry (
                customer_id, inquiry_date, lender_type, purpose, amount_requested, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                i.customer_id,
                time_to_sql(i.inquiry_date),
                i.lender_type.as_str(),
                i.purpose.as_str(),
                money_to_sql(i.amount_requested),
                i.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn inquiry_count(&self, customer_id: CustomerId) -> SimResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM credit_inquiry WHERE customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )?)
    }
}
