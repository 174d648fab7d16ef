use super::{conversion_error, date_col, date_to_sql, money_col, money_to_sql, time_to_sql, SimStore};
use crate::{
    customer_subsystem::{CustomerContext, CustomerRecord, Employment, RegionCategory},
    error::{SimError, SimResult},
    types::CustomerId,
};
use rusqlite::{params, OptionalExtension, Row};

const CONTEXT_COLUMNS: &str =
    "customer_id, date_of_birth, monthly_income, employment_status, county, is_urban, is_active";

fn context_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerContext> {
    let employment: String = row.get(3)?;
    let county: String = row.get(4)?;
    Ok(CustomerContext {
        customer_id:    row.get(0)?,
        date_of_birth:  date_col(row, 1)?,
        monthly_income: money_col(row, 2)?,
        employment:     Employment::parse(&employment).map_err(|e| conversion_error(3, e))?,
        region:         RegionCategory::for_county(&county),
        county,
        is_urban:       row.get::<_, i32>(5)? != 0,
        is_active:      row.get::<_, i32>(6)? != 0,
    })
}

impl SimStore {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &CustomerRecord) -> SimResult<CustomerId> {
        self.conn.execute(
            "INSERT INTO customer (
                first_name, last_name, gender, date_of_birth, county, is_urban,
                employment_status, monthly_income, registration_date, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &c.first_name,
                &c.last_name,
                &c.gender,
                date_to_sql(c.date_of_birth),
                &c.county,
                if c.is_urban { 1 } else { 0 },
                c.employment.as_str(),
                money_to_sql(c.monthly_income),
                time_to_sql(c.registration_date),
                if c.is_active { 1 } else { 0 },
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn load_customer_context(&self, customer_id: CustomerId) -> SimResult<CustomerContext> {
        self.conn
            .query_row(
                &format!("SELECT {CONTEXT_COLUMNS} FROM customer WHERE customer_id = ?1"),
                params![customer_id],
                context_from_row,
            )
            .optional()?
            .ok_or(SimError::CustomerNotFound { customer_id })
    }

    /// Active customers in ascending id order.
    pub fn active_customers(&self) -> SimResult<Vec<CustomerContext>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTEXT_COLUMNS} FROM customer WHERE is_active = 1 ORDER BY customer_id"
        ))?;
        let rows = stmt
            .query_map([], context_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn active_customer_ids(&self) -> SimResult<Vec<CustomerId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT customer_id FROM customer WHERE is_active = 1 ORDER BY customer_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<CustomerId>, _>>()?;
        Ok(ids)
    }

    /// Every customer, active or not, in ascending id order.
    pub fn customer_ids(&self) -> SimResult<Vec<CustomerId>> {
        let mut stmt = self.conn.prepare("SELECT customer_id FROM customer ORDER BY customer_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<CustomerId>, _>>()?;
        Ok(ids)
    }

    pub fn customer_count(&self) -> SimResult<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))?)
    }
}
