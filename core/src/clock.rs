//! Simulation calendar. Owns the fixed "now" of a run and the
//! month windows the historical pass walks through.
//!
//! RULE: no code reads the wall clock. Every "now" is `SimClock::now()`.

use crate::types::{RunId, SimTime};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id: RunId,
    pub as_of:  SimTime,
}

/// One calendar month (or the tail of one) of the historical window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: SimTime,
    /// Inclusive: the last second of the window.
    pub end:   SimTime,
}

impl MonthWindow {
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

impl SimClock {
    /// Anchor the run at the start of `as_of_date`.
    pub fn new(run_id: RunId, as_of_date: NaiveDate) -> Self {
        Self {
            run_id,
            as_of: as_of_date.and_time(NaiveTime::MIN),
        }
    }

    pub fn now(&self) -> SimTime {
        self.as_of
    }

    pub fn days_before(&self, days: i64) -> SimTime {
        self.as_of - Duration::days(days)
    }

    pub fn days_after(&self, days: i64) -> SimTime {
        self.as_of + Duration::days(days)
    }

    /// The last day fully in the past: midnight of `as_of − 1 day`.
    pub fn historical_end(&self) -> SimTime {
        start_of_day(self.as_of.date()) - Duration::days(1)
    }

    /// `historical_end − 30 × months_back` days, moved to the 1st of that month.
    pub fn historical_start(&self, months_back: u32) -> SimTime {
        let raw = self.historical_end() - Duration::days(30 * i64::from(months_back));
        first_of_month(raw.date())
    }

    /// Split `[historical_start, historical_end]` into calendar months.
    pub fn month_windows(&self, months_back: u32) -> Vec<MonthWindow> {
        let end = self.historical_end();
        let mut windows = Vec::new();
        let mut cursor = self.historical_start(months_back);
        while cursor <= end {
            let next = next_month(cursor.date());
            let month_end = (next - Duration::seconds(1)).min(end_of_day(end.date()));
            windows.push(MonthWindow { start: cursor, end: month_end });
            cursor = next;
        }
        windows
    }
}

pub fn start_of_day(date: NaiveDate) -> SimTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> SimTime {
    start_of_day(date) + Duration::seconds(86_399)
}

fn first_of_month(date: NaiveDate) -> SimTime {
    start_of_day(date.with_day(1).unwrap_or(date))
}

fn next_month(date: NaiveDate) -> SimTime {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date);
    start_of_day(first)
}

/// Whole years between `born` and `on`.
pub fn age_on(born: NaiveDate, on: NaiveDate) -> u32 {
    let mut years = on.year() - born.year();
    if (on.month(), on.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
