use super::{conversion_error, money_col, money_to_sql, opt_time_col, opt_time_to_sql, time_col, time_to_sql, SimStore};
use crate::{
    error::{SimError, SimResult},
    loan::{DueLoan, LoanStatus, LoanStatusUpdate, NewApplication, NewLoan, NewRepayment},
    product::LoanCategory,
    types::{ApplicationId, CustomerId, LoanId, Money, SimTime},
};
use rusqlite::{params, Row};
use std::collections::BTreeMap;

/// A loan as stored, joined to its borrower.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRow {
    pub loan_id:           LoanId,
    pub customer_id:       CustomerId,
    pub principal_amount:  Money,
    pub total_repayable:   Money,
    pub disbursement_date: SimTime,
    pub due_date:          SimTime,
    pub status:            LoanStatus,
    pub last_payment_date: Option<SimTime>,
    pub days_delayed:      i64,
}

fn status_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<LoanStatus> {
    let s: String = row.get(idx)?;
    LoanStatus::parse(&s).map_err(|e| conversion_error(idx, e))
}

impl SimStore {
    // ── Applications ──────────────────────────────────────────────

    pub fn insert_application(&self, a: &NewApplication) -> SimResult<ApplicationId> {
        self.conn.execute(
            "INSERT INTO loan_application (
                customer_id, product_id, application_date, amount_requested, term_days,
                purpose, status, status_date, rejection_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                a.customer_id,
                a.product_id,
                time_to_sql(a.application_date),
                money_to_sql(a.amount_requested),
                a.term_days,
                &a.purpose,
                a.status.as_str(),
                time_to_sql(a.status_date),
                a.rejection_reason.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// (total, approved)
    pub fn application_counts(&self) -> SimResult<(i64, i64)> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'Approved'), 0) FROM loan_application",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
    }

    // ── Loans ─────────────────────────────────────────────────────

    pub fn insert_loan(&self, l: &NewLoan) -> SimResult<LoanId> {
        self.conn.execute(
            "INSERT INTO loan (
                application_id, disbursement_date, principal_amount, interest_amount,
                processing_fee, total_repayable, due_date, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'Active')",
            params![
                l.application_id,
                time_to_sql(l.disbursement_date),
                money_to_sql(l.principal_amount),
                money_to_sql(l.interest_amount),
                money_to_sql(l.processing_fee),
                money_to_sql(l.total_repayable),
                time_to_sql(l.due_date),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Move an Active loan to its outcome. A loan that is no longer
    /// Active is an error: terminal statuses are never rewritten.
    pub fn set_loan_status(&self, u: &LoanStatusUpdate) -> SimResult<()> {
        let changed = self.conn.execute(
            "UPDATE loan SET status = ?1, last_payment_date = ?2, days_delayed = ?3
             WHERE loan_id = ?4 AND status = 'Active'",
            params![
                u.status.as_str(),
                opt_time_to_sql(u.last_payment_date),
                u.days_delayed,
                u.loan_id,
            ],
        )?;
        if changed == 0 {
            return Err(SimError::Persistence(format!(
                "loan {} is missing or no longer Active",
                u.loan_id
            )));
        }
        Ok(())
    }

    /// Active loans due in `[start, end]`, by due date, then borrower, then loan id.
    pub fn active_loans_due_between(&self, start: SimTime, end: SimTime) -> SimResult<Vec<DueLoan>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.loan_id, a.customer_id, p.category, l.principal_amount,
                    l.total_repayable, l.due_date, p.crb_reporting
             FROM loan l
             JOIN loan_application a ON a.application_id = l.application_id
             JOIN loan_product p ON p.product_id = a.product_id
             WHERE l.status = 'Active' AND l.due_date >= ?1 AND l.due_date <= ?2
             ORDER BY l.due_date, a.customer_id, l.loan_id",
        )?;
        let loans = stmt
            .query_map(params![time_to_sql(start), time_to_sql(end)], |row| {
                let category: String = row.get(2)?;
                Ok(DueLoan {
                    loan_id:          row.get(0)?,
                    customer_id:      row.get(1)?,
                    category:         LoanCategory::parse(&category)
                        .map_err(|e| conversion_error(2, e))?,
                    principal_amount: money_col(row, 3)?,
                    total_repayable:  money_col(row, 4)?,
                    due_date:         time_col(row, 5)?,
                    crb_reporting:    row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    pub fn all_loans(&self) -> SimResult<Vec<LoanRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.loan_id, a.customer_id, l.principal_amount, l.total_repayable,
                    l.disbursement_date, l.due_date, l.status, l.last_payment_date,
                    l.days_delayed
             FROM loan l
             JOIN loan_application a ON a.application_id = l.application_id
             ORDER BY l.loan_id",
        )?;
        let loans = stmt
            .query_map([], |row| {
                Ok(LoanRow {
                    loan_id:           row.get(0)?,
                    customer_id:       row.get(1)?,
                    principal_amount:  money_col(row, 2)?,
                    total_repayable:   money_col(row, 3)?,
                    disbursement_date: time_col(row, 4)?,
                    due_date:          time_col(row, 5)?,
                    status:            status_col(row, 6)?,
                    last_payment_date: opt_time_col(row, 7)?,
                    days_delayed:      row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    pub fn loan_status_counts(&self) -> SimResult<BTreeMap<LoanStatus, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM loan GROUP BY status ORDER BY status")?;
        let counts = stmt
            .query_map([], |row| Ok((status_col(row, 0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }

    // ── Repayments ────────────────────────────────────────────────

    pub fn insert_repayment(&self, r: &NewRepayment) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO repayment (
                loan_id, repayment_date, amount, payment_method, transaction_reference,
                is_late, late_fee
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                r.loan_id,
                time_to_sql(r.repayment_date),
                money_to_sql(r.amount),
                &r.payment_method,
                &r.transaction_reference,
                r.is_late,
                money_to_sql(r.late_fee),
            ],
        )?;
        Ok(())
    }

    pub fn repayments_for_loan(&self, loan_id: LoanId) -> SimResult<Vec<NewRepayment>> {
        let mut stmt = self.conn.prepare(
            "SELECT loan_id, repayment_date, amount, payment_method, transaction_reference,
                    is_late, late_fee
             FROM repayment WHERE loan_id = ?1 ORDER BY repayment_id",
        )?;
        let rows = stmt
            .query_map(params![loan_id], |row| {
                Ok(NewRepayment {
                    loan_id:               row.get(0)?,
                    repayment_date:        time_col(row, 1)?,
                    amount:                money_col(row, 2)?,
                    payment_method:        row.get(3)?,
                    transaction_reference: row.get(4)?,
                    is_late:               row.get(5)?,
                    late_fee:              money_col(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sum of every repayment row, per borrower.
    pub fn repaid_by_customer(&self) -> SimResult<BTreeMap<CustomerId, Money>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.customer_id, r.amount
             FROM repayment r
             JOIN loan l ON l.loan_id = r.loan_id
             JOIN loan_application a ON a.application_id = l.application_id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, CustomerId>(0)?, money_col(row, 1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut totals: BTreeMap<CustomerId, Money> = BTreeMap::new();
        for (customer_id, amount) in rows {
            *totals.entry(customer_id).or_default() += amount;
        }
        Ok(totals)
    }
}
