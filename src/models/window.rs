//! Query time window.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days (UTC) sent to the news API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Window covering `days_back` days before `today` up to `today`.
    pub fn ending(today: NaiveDate, days_back: u32) -> Self {
        let from = today
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }

    /// Whether a timestamp falls on a day inside the window.
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        let day = ts.date_naive();
        day >= self.from && day <= self.to
    }

    /// Label stored on each article, `from_to_to`.
    pub fn label(&self) -> String {
        format!(
            "{}_to_{}",
            self.from.format("%Y-%m-%d"),
            self.to.format("%Y-%m-%d")
        )
    }
}
