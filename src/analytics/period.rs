//! Reporting windows

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }
}

/// Analytics look-back period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    Day,
    Week,
    Month,
}

impl AnalyticsPeriod {
    /// Map a dashboard range key to a period.
    ///
    /// Only "7days" selects a week; every other key, known or not, gets a
    /// month window. No key means the dashboard default of 7 days.
    pub fn from_range_key(key: Option<&str>) -> Self {
        match key {
            None | Some("7days") => AnalyticsPeriod::Week,
            Some(_) => AnalyticsPeriod::Month,
        }
    }

    /// Window ending on `today`
    pub fn date_range(&self, today: NaiveDate) -> DateRange {
        let from = match self {
            AnalyticsPeriod::Day => today.checked_sub_days(Days::new(1)),
            AnalyticsPeriod::Week => today.checked_sub_days(Days::new(7)),
            AnalyticsPeriod::Month => today.checked_sub_months(Months::new(1)),
        };

        DateRange::new(from.unwrap_or(NaiveDate::MIN), today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_range_keys() {
        assert_eq!(AnalyticsPeriod::from_range_key(None), AnalyticsPeriod::Week);
        assert_eq!(AnalyticsPeriod::from_range_key(Some("7days")), AnalyticsPeriod::Week);
        assert_eq!(AnalyticsPeriod::from_range_key(Some("30days")), AnalyticsPeriod::Month);
        assert_eq!(AnalyticsPeriod::from_range_key(Some("year")), AnalyticsPeriod::Month);
    }

    #[test]
    fn test_windows() {
        let today = day("2024-03-15");
        assert_eq!(
            AnalyticsPeriod::Day.date_range(today),
            DateRange::new(day("2024-03-14"), today)
        );
        assert_eq!(
            AnalyticsPeriod::Week.date_range(today),
            DateRange::new(day("2024-03-08"), today)
        );
        assert_eq!(
            AnalyticsPeriod::Month.date_range(today),
            DateRange::new(day("2024-02-15"), today)
        );
    }

    #[test]
    fn test_month_window_clamps_to_month_end() {
        let range = AnalyticsPeriod::Month.date_range(day("2024-03-31"));
        assert_eq!(range.from, day("2024-02-29"));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::new(day("2024-03-01"), day("2024-03-07"));
        assert!(range.contains(day("2024-03-01")));
        assert!(range.contains(day("2024-03-07")));
        assert!(!range.contains(day("2024-03-08")));
    }
}
