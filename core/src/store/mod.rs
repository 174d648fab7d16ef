//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Subsystems call store methods (or the CreditLedger trait); they never
//! execute SQL directly.

mod customer;
mod inquiry;
mod ledger;
mod loan;
mod mobile_money;
mod product;
mod profile;

pub use loan::LoanRow;
pub use profile::ProfileStats;

use crate::{
    error::SimResult,
    types::{Money, SimTime},
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, types::Type, Connection, Row};
use rust_decimal::Decimal;
use std::{cell::Cell, str::FromStr};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SimStore {
    conn:  Connection,
    path:  Option<String>, // None for :memory:, Some(path) for file
    depth: Cell<u32>,      // open savepoints
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
            depth: Cell::new(0),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None, depth: Cell::new(0) })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_customers.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_loans.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_credit_profile.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_mobile_money.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/006_credit_inquiries.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        version: &str,
        as_of: SimTime,
    ) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, as_of, started_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![run_id, seed as i64, version, time_to_sql(as_of)],
        )?;
        Ok(())
    }

    // ── Units of work ──────────────────────────────────────────

    /// Run `f` inside a savepoint. Released when `f` succeeds, rolled back
    /// when it fails. Savepoints nest, so an item-level unit inside a
    /// batch-level one only discards the item.
    pub fn unit_of_work<T, F>(&self, f: F) -> SimResult<T>
    where
        F: FnOnce(&Self) -> SimResult<T>,
    {
        let depth = self.depth.get();
        let name = format!("uow_{depth}");
        self.conn.execute_batch(&format!("SAVEPOINT {name};"))?;
        self.depth.set(depth + 1);
        let result = f(self);
        self.depth.set(depth);
        match result {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {name};"))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) =
                    self.conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
                {
                    log::error!("rollback of {name} failed: {rollback}");
                }
                Err(e)
            }
        }
    }
}

// ── Column codecs ──────────────────────────────────────────────

pub(crate) fn time_to_sql(t: SimTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

pub(crate) fn opt_time_to_sql(t: Option<SimTime>) -> Option<String> {
    t.map(time_to_sql)
}

pub(crate) fn date_to_sql(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub(crate) fn money_to_sql(m: Money) -> String {
    m.to_string()
}

#[cfg(test)]
pub(crate) fn parse_time(s: &str) -> SimResult<SimTime> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| crate::error::SimError::Persistence(format!("bad timestamp '{s}': {e}")))
}

pub(crate) fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn money_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Money> {
    let s: String = row.get(idx)?;
    Decimal::from_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<SimTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, TIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<SimTime>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDateTime::parse_from_str(&s, TIME_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}
