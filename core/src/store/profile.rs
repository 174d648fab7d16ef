use super::{conversion_error, money_col, money_to_sql, opt_time_col, opt_time_to_sql, time_col, time_to_sql, SimStore};
use crate::{
    error::SimResult,
    profile::{CrbListingType, CustomerCreditProfile},
    types::CustomerId,
};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::BTreeMap;

const PROFILE_COLUMNS: &str = "customer_id, credit_score, payment_history_score,
    credit_utilization, credit_history_length, total_loans_taken, total_amount_borrowed,
    total_amount_repaid, active_loans, active_loan_amount, times_defaulted,
    last_default_date, days_since_last_default, crb_listed, crb_listing_date,
    crb_listing_type, current_loan_tier, max_eligible_loan_amount,
    consecutive_on_time_repayments, overdraft_limit, times_overdrafted,
    total_overdraft_fees, recent_inquiries, last_updated";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerCreditProfile> {
    let listing: Option<String> = row.get(15)?;
    Ok(CustomerCreditProfile {
        customer_id:                    row.get(0)?,
        credit_score:                   row.get(1)?,
        payment_history_score:          row.get(2)?,
        credit_utilization:             money_col(row, 3)?,
        credit_history_length:          row.get(4)?,
        total_loans_taken:              row.get(5)?,
        total_amount_borrowed:          money_col(row, 6)?,
        total_amount_repaid:            money_col(row, 7)?,
        active_loans:                   row.get(8)?,
        active_loan_amount:             money_col(row, 9)?,
        times_defaulted:                row.get(10)?,
        last_default_date:              opt_time_col(row, 11)?,
        days_since_last_default:        row.get(12)?,
        crb_listed:                     row.get(13)?,
        crb_listing_date:               opt_time_col(row, 14)?,
        crb_listing_type:               listing
            .map(|s| CrbListingType::parse(&s).map_err(|e| conversion_error(15, e)))
            .transpose()?,
        current_loan_tier:              row.get(16)?,
        max_eligible_loan_amount:       money_col(row, 17)?,
        consecutive_on_time_repayments: row.get(18)?,
        overdraft_limit:                money_col(row, 19)?,
        times_overdrafted:              row.get(20)?,
        total_overdraft_fees:           money_col(row, 21)?,
        recent_inquiries:               row.get(22)?,
        last_updated:                   time_col(row, 23)?,
    })
}

/// Aggregates printed at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub tier_distribution: BTreeMap<u32, i64>,
    pub crb_listings:      BTreeMap<String, i64>,
    /// (band label, customers)
    pub score_bands:       Vec<(String, i64)>,
}

impl SimStore {
    // ── Credit profile ────────────────────────────────────────────

    pub fn load_credit_profile(
        &self,
        customer_id: CustomerId,
    ) -> SimResult<Option<CustomerCreditProfile>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM credit_profile WHERE customer_id = ?1"),
                params![customer_id],
                profile_from_row,
            )
            .optional()?)
    }

    /// Replace the whole row. Reruns with the same profile are no-ops.
    pub fn save_credit_profile(&self, p: &CustomerCreditProfile) -> SimResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO credit_profile ({PROFILE_COLUMNS}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
                )"
            ),
            params![
                p.customer_id,
                p.credit_score,
                p.payment_history_score,
                p.credit_utilization.to_string(),
                p.credit_history_length,
                p.total_loans_taken,
                money_to_sql(p.total_amount_borrowed),
                money_to_sql(p.total_amount_repaid),
                p.active_loans,
                money_to_sql(p.active_loan_amount),
                p.times_defaulted,
                opt_time_to_sql(p.last_default_date),
                p.days_since_last_default,
                p.crb_listed,
                opt_time_to_sql(p.crb_listing_date),
                p.crb_listing_type.map(|t| t.as_str()),
                p.current_loan_tier,
                money_to_sql(p.max_eligible_loan_amount),
                p.consecutive_on_time_repayments,
                money_to_sql(p.overdraft_limit),
                p.times_overdrafted,
                money_to_sql(p.total_overdraft_fees),
                p.recent_inquiries,
                time_to_sql(p.last_updated),
            ],
        )?;
        Ok(())
    }

    /// Every profile, in ascending customer id order.
    pub fn all_credit_profiles(&self) -> SimResult<Vec<CustomerCreditProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM credit_profile ORDER BY customer_id"
        ))?;
        let profiles = stmt
            .query_map([], profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    pub fn profile_stats(&self) -> SimResult<ProfileStats> {
        let mut stats = ProfileStats::default();

        let mut stmt = self.conn.prepare(
            "SELECT current_loan_tier, COUNT(*) FROM credit_profile
             GROUP BY current_loan_tier ORDER BY current_loan_tier",
        )?;
        stats.tier_distribution = stmt
            .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<_, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT crb_listing_type, COUNT(*) FROM credit_profile
             WHERE crb_listed = 1 GROUP BY crb_listing_type ORDER BY crb_listing_type",
        )?;
        stats.crb_listings = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<_, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT CASE
                        WHEN credit_score < 400 THEN '300-399'
                        WHEN credit_score < 500 THEN '400-499'
                        WHEN credit_score < 600 THEN '500-599'
                        WHEN credit_score < 700 THEN '600-699'
                        ELSE '700-850'
                    END AS band,
                    COUNT(*)
             FROM credit_profile GROUP BY band ORDER BY band",
        )?;
        stats.score_bands = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<_, _>>()?;

        Ok(stats)
    }
}
