use super::{conversion_error, money_col, money_to_sql, SimStore};
use crate::{
    error::SimResult,
    product::{LoanCategory, LoanProduct},
};
use rusqlite::params;

impl SimStore {
    // ── Loan products ─────────────────────────────────────────────

    /// Replace the catalog rows with `products`.
    pub fn save_products(&self, products: &[LoanProduct]) -> SimResult<()> {
        for p in products {
            self.conn.execute(
                "INSERT OR REPLACE INTO loan_product (
                    product_id, name, category, min_amount, max_amount, min_term_days,
                    max_term_days, interest_rate_pct, processing_fee_pct, is_first_time,
                    crb_reporting
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    p.product_id,
                    &p.name,
                    p.category.as_str(),
                    money_to_sql(p.min_amount),
                    money_to_sql(p.max_amount),
                    p.min_term_days,
                    p.max_term_days,
                    p.interest_rate_pct.to_string(),
                    p.processing_fee_pct.to_string(),
                    p.is_first_time,
                    p.crb_reporting,
                ],
            )?;
        }
        Ok(())
    }

    pub fn load_products(&self) -> SimResult<Vec<LoanProduct>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, name, category, min_amount, max_amount, min_term_days,
                    max_term_days, interest_rate_pct, processing_fee_pct, is_first_time,
                    crb_reporting
             FROM loan_product ORDER BY product_id",
        )?;
        let products = stmt
            .query_map([], |row| {
                let category: String = row.get(2)?;
                Ok(LoanProduct {
                    product_id:         row.get(0)?,
                    name:               row.get(1)?,
                    category:           LoanCategory::parse(&category)
                        .map_err(|e| conversion_error(2, e))?,
                    min_amount:         money_col(row, 3)?,
                    max_amount:         money_col(row, 4)?,
                    min_term_days:      row.get(5)?,
                    max_term_days:      row.get(6)?,
                    interest_rate_pct:  money_col(row, 7)?,
                    processing_fee_pct: money_col(row, 8)?,
                    is_first_time:      row.get(9)?,
                    crb_reporting:      row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }
}
