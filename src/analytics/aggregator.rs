//! Analytics Aggregation
//!
//! Reduces a flat list of per-day, per-post metric rows into one time
//! series, ranked geography/referral tables and summary scalars.
//!
//! Rate-like fields (`avg_time_on_page`, `bounce_rate`) are averaged as a
//! mean of the per-row means, not re-derived from raw totals.

use crate::models::{Counts, MetricRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of countries kept in the geography table
pub const GEOGRAPHY_TOP: usize = 6;

/// Aggregation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("Metric row {index} has no date")]
    InvalidRow { index: usize },
}

// ============================================
// Output Types
// ============================================

/// All rows of one calendar day, merged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedDay {
    pub date: NaiveDate,
    pub page_views: i64,
    pub unique_visitors: i64,
    pub avg_time_on_page: f64,
    pub bounce_rate: f64,
    pub geo_distribution: Counts,
    pub referral_sources: Counts,
    /// Number of input rows merged into this day
    pub row_count: usize,
}

/// One point of the views chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub views: i64,
}

/// One row of a ranked breakdown table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub value: f64,
}

/// Dashboard analytics for a window of rows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub views_series: Vec<SeriesPoint>,
    pub geography_top: Vec<RankedEntry>,
    pub referral_ranked: Vec<RankedEntry>,
    pub total_views: i64,
    pub total_visitors: i64,
    pub avg_time_on_page: f64,
    pub bounce_rate: f64,
}

// ============================================
// Accumulators
// ============================================

/// Name -> running sum, in first-seen order
#[derive(Debug, Default)]
struct Tally {
    entries: Vec<(String, f64)>,
    positions: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, name: &str, value: f64) {
        match self.positions.get(name) {
            Some(&pos) => self.entries[pos].1 += value,
            None => {
                self.positions.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), value));
            }
        }
    }

    fn add_all<'a>(&mut self, counts: impl Iterator<Item = (&'a str, f64)>) {
        for (name, value) in counts {
            self.add(name, value);
        }
    }

    fn into_counts(self) -> Counts {
        self.entries.into_iter().collect()
    }

    /// Descending by value; ties keep first-seen order
    fn ranked(self) -> Vec<RankedEntry> {
        let mut ranked: Vec<RankedEntry> = self
            .entries
            .into_iter()
            .map(|(name, value)| RankedEntry { name, value })
            .collect();
        ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        ranked
    }
}

/// Per-date accumulator
#[derive(Debug)]
struct DayBucket {
    date: NaiveDate,
    page_views: i64,
    unique_visitors: i64,
    time_on_page_sum: f64,
    bounce_rate_sum: f64,
    rows: usize,
    geo: Tally,
    referrals: Tally,
}

impl DayBucket {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            page_views: 0,
            unique_visitors: 0,
            time_on_page_sum: 0.0,
            bounce_rate_sum: 0.0,
            rows: 0,
            geo: Tally::default(),
            referrals: Tally::default(),
        }
    }

    fn absorb(&mut self, row: &MetricRow) {
        self.page_views += row.page_views.unwrap_or(0);
        self.unique_visitors += row.unique_visitors.unwrap_or(0);
        self.time_on_page_sum += row.avg_time_on_page.unwrap_or(0.0);
        self.bounce_rate_sum += row.bounce_rate.unwrap_or(0.0);
        self.rows += 1;

        if let Some(geo) = &row.geo_distribution {
            self.geo.add_all(geo.iter());
        }
        if let Some(referrals) = &row.referral_sources {
            self.referrals.add_all(referrals.iter());
        }
    }

    fn finish(self) -> AggregatedDay {
        // a bucket only exists once a row landed in it
        let rows = self.rows.max(1) as f64;
        AggregatedDay {
            date: self.date,
            page_views: self.page_views,
            unique_visitors: self.unique_visitors,
            avg_time_on_page: self.time_on_page_sum / rows,
            bounce_rate: self.bounce_rate_sum / rows,
            geo_distribution: self.geo.into_counts(),
            referral_sources: self.referrals.into_counts(),
            row_count: self.rows,
        }
    }
}

// ============================================
// Aggregation
// ============================================

/// Group rows by date.
///
/// Days come out in the order their first row appeared, not sorted by
/// date. Fails on the first row without a date.
pub fn aggregate_days(rows: &[MetricRow]) -> Result<Vec<AggregatedDay>, AggregateError> {
    let mut buckets: Vec<DayBucket> = Vec::new();
    let mut positions: HashMap<NaiveDate, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let date = row.date.ok_or(AggregateError::InvalidRow { index })?;

        let pos = *positions.entry(date).or_insert_with(|| {
            buckets.push(DayBucket::new(date));
            buckets.len() - 1
        });
        buckets[pos].absorb(row);
    }

    Ok(buckets.into_iter().map(DayBucket::finish).collect())
}

/// Roll merged days up into the dashboard summary
pub fn summarize(days: &[AggregatedDay]) -> AnalyticsSummary {
    let mut geo = Tally::default();
    let mut referrals = Tally::default();
    let mut time_on_page_sum = 0.0;
    let mut bounce_rate_sum = 0.0;
    let mut row_count = 0usize;

    for day in days {
        geo.add_all(day.geo_distribution.iter());
        referrals.add_all(day.referral_sources.iter());
        time_on_page_sum += day.avg_time_on_page;
        bounce_rate_sum += day.bounce_rate;
        row_count += day.row_count;
    }

    let (avg_time_on_page, bounce_rate) = if row_count > 0 {
        (
            time_on_page_sum / row_count as f64,
            bounce_rate_sum / row_count as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let mut geography_top = geo.ranked();
    geography_top.truncate(GEOGRAPHY_TOP);

    AnalyticsSummary {
        views_series: days
            .iter()
            .map(|day| SeriesPoint {
                date: day.date,
                views: day.page_views,
            })
            .collect(),
        geography_top,
        referral_ranked: referrals.ranked(),
        total_views: days.iter().map(|d| d.page_views).sum(),
        total_visitors: days.iter().map(|d| d.unique_visitors).sum(),
        avg_time_on_page,
        bounce_rate,
    }
}

/// Aggregate raw metric rows into a summary
pub fn aggregate(rows: &[MetricRow]) -> Result<AnalyticsSummary, AggregateError> {
    let days = aggregate_days(rows)?;
    Ok(summarize(&days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(date: &str, views: i64, visitors: i64) -> MetricRow {
        MetricRow {
            date: Some(day(date)),
            page_views: Some(views),
            unique_visitors: Some(visitors),
            ..MetricRow::default()
        }
    }

    fn counts(entries: &[(&str, f64)]) -> Counts {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_empty_input() {
        let summary = aggregate(&[]).unwrap();
        assert_eq!(summary, AnalyticsSummary::default());
        assert_eq!(summary.avg_time_on_page, 0.0);
        assert_eq!(summary.bounce_rate, 0.0);
    }

    #[test]
    fn test_same_date_rows_sum() {
        let days = aggregate_days(&[row("2024-03-01", 3, 1), row("2024-03-01", 5, 2)]).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].page_views, 8);
        assert_eq!(days[0].unique_visitors, 3);
        assert_eq!(days[0].row_count, 2);
    }

    #[test]
    fn test_rates_are_mean_of_means() {
        let rows: Vec<MetricRow> = [1.0, 2.0, 3.0]
            .iter()
            .map(|t| MetricRow {
                avg_time_on_page: Some(*t),
                bounce_rate: Some(*t * 10.0),
                ..row("2024-03-01", 1, 1)
            })
            .collect();

        let days = aggregate_days(&rows).unwrap();
        assert_eq!(days[0].avg_time_on_page, 2.0);
        assert_eq!(days[0].bounce_rate, 20.0);
    }

    #[test]
    fn test_geo_merge_within_day() {
        let rows = vec![
            MetricRow {
                geo_distribution: Some(counts(&[("US", 2.0)])),
                ..row("2024-03-01", 1, 1)
            },
            MetricRow {
                geo_distribution: Some(counts(&[("US", 3.0), ("FR", 1.0)])),
                ..row("2024-03-01", 1, 1)
            },
        ];

        let days = aggregate_days(&rows).unwrap();
        assert_eq!(days[0].geo_distribution, counts(&[("US", 5.0), ("FR", 1.0)]));
    }

    #[test]
    fn test_geography_keeps_top_six() {
        let geo: Vec<(String, f64)> = (0..10)
            .map(|i| (format!("C{}", i), (100 - i * 10) as f64))
            .collect();
        let rows = vec![MetricRow {
            geo_distribution: Some(geo.into_iter().collect()),
            ..row("2024-03-01", 1, 1)
        }];

        let summary = aggregate(&rows).unwrap();
        assert_eq!(summary.geography_top.len(), GEOGRAPHY_TOP);
        assert_eq!(summary.geography_top[0].name, "C0");
        assert_eq!(summary.geography_top[0].value, 100.0);
        assert_eq!(summary.geography_top[5].name, "C5");
    }

    #[test]
    fn test_referrals_rank_across_days_with_stable_ties() {
        let rows = vec![
            MetricRow {
                referral_sources: Some(counts(&[("twitter", 2.0), ("google", 1.0)])),
                ..row("2024-03-01", 1, 1)
            },
            MetricRow {
                referral_sources: Some(counts(&[("direct", 3.0), ("google", 1.0)])),
                ..row("2024-03-02", 1, 1)
            },
        ];

        let summary = aggregate(&rows).unwrap();
        let ranked: Vec<(&str, f64)> = summary
            .referral_ranked
            .iter()
            .map(|e| (e.name.as_str(), e.value))
            .collect();

        // twitter and google tie at 2; twitter was seen first
        assert_eq!(ranked, vec![("direct", 3.0), ("twitter", 2.0), ("google", 2.0)]);
    }

    #[test]
    fn test_missing_date_is_rejected() {
        let rows = vec![
            row("2024-03-01", 1, 1),
            MetricRow {
                date: None,
                page_views: Some(4),
                ..MetricRow::default()
            },
        ];

        assert_eq!(
            aggregate(&rows),
            Err(AggregateError::InvalidRow { index: 1 })
        );
    }

    #[test]
    fn test_null_numbers_count_as_zero() {
        let rows = vec![
            MetricRow {
                date: Some(day("2024-03-01")),
                ..MetricRow::default()
            },
            row("2024-03-01", 4, 2),
        ];

        let summary = aggregate(&rows).unwrap();
        assert_eq!(summary.total_views, 4);
        assert_eq!(summary.total_visitors, 2);
    }

    #[test]
    fn test_end_to_end_totals_and_series() {
        let rows = vec![
            row("2024-01-01", 10, 5),
            row("2024-01-01", 7, 3),
            row("2024-01-02", 4, 2),
        ];

        let summary = aggregate(&rows).unwrap();
        assert_eq!(summary.total_views, 21);
        assert_eq!(summary.total_visitors, 10);
        assert_eq!(
            summary.views_series,
            vec![
                SeriesPoint {
                    date: day("2024-01-01"),
                    views: 17
                },
                SeriesPoint {
                    date: day("2024-01-02"),
                    views: 4
                },
            ]
        );
    }

    #[test]
    fn test_series_follows_first_appearance() {
        let rows = vec![
            row("2024-01-05", 1, 1),
            row("2024-01-02", 2, 1),
            row("2024-01-05", 3, 1),
        ];

        let series = aggregate(&rows).unwrap().views_series;
        let dates: Vec<NaiveDate> = series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day("2024-01-05"), day("2024-01-02")]);
        assert_eq!(series[0].views, 4);
    }

    #[test]
    fn test_grand_rates_weighted_by_row_count() {
        // day one: two rows averaging 4.0; day two: one row of 1.0
        let rows = vec![
            MetricRow {
                avg_time_on_page: Some(2.0),
                ..row("2024-01-01", 1, 1)
            },
            MetricRow {
                avg_time_on_page: Some(6.0),
                ..row("2024-01-01", 1, 1)
            },
            MetricRow {
                avg_time_on_page: Some(1.0),
                ..row("2024-01-02", 1, 1)
            },
        ];

        let summary = aggregate(&rows).unwrap();
        // (4.0 + 1.0) / 3 rows
        assert!((summary.avg_time_on_page - 5.0 / 3.0).abs() < 1e-9);
    }
}
