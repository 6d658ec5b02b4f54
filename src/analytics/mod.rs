//! Analytics
//!
//! Dashboard analytics over the backend's per-day metric rows, plus view
//! recording for article reads.

mod aggregator;
mod period;

pub use aggregator::*;
pub use period::*;

use crate::gateway::{timed, DataGateway, GatewayError, MetricScope};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============================================
// Analytics Service
// ============================================

pub struct AnalyticsService {
    gateway: Arc<dyn DataGateway>,
    timeout: Duration,
}

impl AnalyticsService {
    pub fn new(gateway: Arc<dyn DataGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Summary for a period ending today (UTC)
    pub async fn summary(
        &self,
        scope: MetricScope,
        period: AnalyticsPeriod,
    ) -> Result<AnalyticsSummary, AnalyticsError> {
        let today = Utc::now().date_naive();
        self.summary_for(scope, period.date_range(today)).await
    }

    /// Summary over an explicit date range
    pub async fn summary_for(
        &self,
        scope: MetricScope,
        range: DateRange,
    ) -> Result<AnalyticsSummary, AnalyticsError> {
        let rows = timed(self.timeout, self.gateway.fetch_metric_rows(scope, range)).await?;

        let summary = aggregate(&rows)?;

        tracing::debug!(
            ?scope,
            from = %range.from,
            to = %range.to,
            rows = rows.len(),
            total_views = summary.total_views,
            "Analytics summary computed"
        );

        Ok(summary)
    }

    /// Count one view of a post today
    pub async fn record_view(&self, post_id: Uuid) -> Result<(), GatewayError> {
        self.record_view_on(post_id, Utc::now().date_naive()).await
    }

    pub async fn record_view_on(&self, post_id: Uuid, day: NaiveDate) -> Result<(), GatewayError> {
        timed(self.timeout, self.gateway.record_view(post_id, day)).await
    }
}

// ============================================
// Error Types
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use crate::models::MetricRow;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn service(gateway: Arc<MemoryGateway>) -> AnalyticsService {
        AnalyticsService::new(gateway, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_summary_filters_scope_and_range() {
        let post = Uuid::new_v4();
        let other = Uuid::new_v4();
        let gateway = Arc::new(MemoryGateway::default());
        *gateway.rows.lock().await = vec![
            MetricRow {
                post_id: Some(post),
                date: Some(day("2024-03-10")),
                page_views: Some(5),
                ..MetricRow::default()
            },
            MetricRow {
                post_id: Some(other),
                date: Some(day("2024-03-10")),
                page_views: Some(7),
                ..MetricRow::default()
            },
            MetricRow {
                post_id: Some(post),
                date: Some(day("2024-01-01")),
                page_views: Some(100),
                ..MetricRow::default()
            },
        ];

        let range = AnalyticsPeriod::Week.date_range(day("2024-03-12"));
        let service = service(gateway);

        let all = service.summary_for(MetricScope::AllPosts, range).await.unwrap();
        assert_eq!(all.total_views, 12);

        let single = service.summary_for(MetricScope::Post(post), range).await.unwrap();
        assert_eq!(single.total_views, 5);
    }

    #[tokio::test]
    async fn test_record_view_upserts_daily_row() {
        let post = Uuid::new_v4();
        let gateway = Arc::new(MemoryGateway::default());
        let service = service(gateway.clone());
        let today = day("2024-03-12");

        service.record_view_on(post, today).await.unwrap();
        service.record_view_on(post, today).await.unwrap();

        let rows = gateway.rows.lock().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].page_views, Some(2));
        assert_eq!(rows[0].unique_visitors, Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_first_views_share_one_row() {
        let post = Uuid::new_v4();
        let gateway = Arc::new(MemoryGateway::default());
        let service = service(gateway.clone());
        let today = day("2024-03-12");

        let (a, b) = tokio::join!(
            service.record_view_on(post, today),
            service.record_view_on(post, today)
        );
        a.unwrap();
        b.unwrap();

        let rows = gateway.rows.lock().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].page_views, Some(2));
    }
}
