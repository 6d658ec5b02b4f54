//! Backend Data Gateway
//!
//! Fetch/insert/update access to the managed backend's Postgres schema for
//! the analytics and featured-content workflows. Everything behind this
//! trait is I/O; the aggregation and reconciliation logic never touches the
//! pool directly.

use crate::analytics::DateRange;
use crate::models::*;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Column list for `blogs` rows, aliased as `b`
pub(crate) const POST_COLUMNS: &str = "b.id, b.title, b.content, b.excerpt, b.author_id, \
     b.category_id, b.status, b.views::bigint AS views, b.image_url, \
     COALESCE(b.is_featured, false) AS is_featured, b.created_at, b.updated_at";

/// Gateway errors, passed through to callers unchanged
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => GatewayError::NotFound("row not found".into()),
            other => GatewayError::Database(other.to_string()),
        }
    }
}

/// Run one gateway call under a deadline
pub async fn timed<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| GatewayError::Timeout(limit))?
}

/// Which posts a metrics fetch covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricScope {
    AllPosts,
    Post(Uuid),
}

impl MetricScope {
    /// Parse the dashboard's post selector: "all" or a post id
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("all") => Some(MetricScope::AllPosts),
            Some(id) => Uuid::parse_str(id).ok().map(MetricScope::Post),
        }
    }

    fn post_id(&self) -> Option<Uuid> {
        match self {
            MetricScope::AllPosts => None,
            MetricScope::Post(id) => Some(*id),
        }
    }
}

/// Managed backend operations used by analytics and featured content
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Metric rows inside `range` (inclusive), ordered by date ascending
    async fn fetch_metric_rows(
        &self,
        scope: MetricScope,
        range: DateRange,
    ) -> Result<Vec<MetricRow>, GatewayError>;

    /// All posts, optionally restricted to one status
    async fn fetch_posts(&self, status: Option<PostStatus>) -> Result<Vec<Post>, GatewayError>;

    /// All categories, ordered by name
    async fn fetch_categories(&self) -> Result<Vec<Category>, GatewayError>;

    /// Create a category, or return the existing one with the same name
    async fn create_category(&self, name: &str) -> Result<Category, GatewayError>;

    /// Move a post to another category
    async fn update_post_category(&self, post_id: Uuid, category_id: Uuid)
        -> Result<(), GatewayError>;

    /// Count one view of a post on `day`
    async fn record_view(&self, post_id: Uuid, day: NaiveDate) -> Result<(), GatewayError>;
}

// ============================================
// Postgres Implementation
// ============================================

#[derive(FromRow)]
struct MetricRecord {
    blog_id: Option<Uuid>,
    date: Option<NaiveDate>,
    page_views: Option<i64>,
    unique_visitors: Option<i64>,
    avg_time_on_page: Option<f64>,
    bounce_rate: Option<f64>,
    geo_distribution: Option<Json<Counts>>,
    referral_sources: Option<Json<Counts>>,
}

impl From<MetricRecord> for MetricRow {
    fn from(record: MetricRecord) -> Self {
        MetricRow {
            post_id: record.blog_id,
            date: record.date,
            page_views: record.page_views,
            unique_visitors: record.unique_visitors,
            avg_time_on_page: record.avg_time_on_page,
            bounce_rate: record.bounce_rate,
            geo_distribution: record.geo_distribution.map(|Json(c)| c),
            referral_sources: record.referral_sources.map(|Json(c)| c),
        }
    }
}

/// Gateway over the backend's Postgres database
#[derive(Clone)]
pub struct PgGateway {
    db: PgPool,
}

impl PgGateway {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DataGateway for PgGateway {
    async fn fetch_metric_rows(
        &self,
        scope: MetricScope,
        range: DateRange,
    ) -> Result<Vec<MetricRow>, GatewayError> {
        let records: Vec<MetricRecord> = sqlx::query_as(
            r#"SELECT blog_id, date,
                      page_views::bigint AS page_views,
                      unique_visitors::bigint AS unique_visitors,
                      avg_time_on_page::float8 AS avg_time_on_page,
                      bounce_rate::float8 AS bounce_rate,
                      geo_distribution, referral_sources
               FROM analytics
               WHERE date BETWEEN $1 AND $2
                 AND ($3::uuid IS NULL OR blog_id = $3)
               ORDER BY date ASC"#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(scope.post_id())
        .fetch_all(&self.db)
        .await?;

        tracing::debug!(rows = records.len(), ?scope, "Fetched analytics rows");

        Ok(records.into_iter().map(MetricRow::from).collect())
    }

    async fn fetch_posts(&self, status: Option<PostStatus>) -> Result<Vec<Post>, GatewayError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blogs b
             WHERE ($1::text IS NULL OR b.status = $1)
             ORDER BY b.created_at DESC"
        );

        let posts: Vec<Post> = sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.db)
            .await?;

        Ok(posts)
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, GatewayError> {
        let categories: Vec<Category> =
            sqlx::query_as("SELECT id, name FROM categories ORDER BY name ASC")
                .fetch_all(&self.db)
                .await?;

        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> Result<Category, GatewayError> {
        let existing: Option<Category> = sqlx::query_as(
            "SELECT id, name FROM categories WHERE lower(name) = lower($1) LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        if let Some(category) = existing {
            tracing::debug!(category = %category.name, "Category already exists");
            return Ok(category);
        }

        let category: Category =
            sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.db)
                .await?;

        tracing::info!(category = %category.name, id = %category.id, "Category created");
        Ok(category)
    }

    async fn update_post_category(
        &self,
        post_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), GatewayError> {
        let result =
            sqlx::query("UPDATE blogs SET category_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(post_id)
                .bind(category_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("Post not found: {}", post_id)));
        }

        Ok(())
    }

    async fn record_view(&self, post_id: Uuid, day: NaiveDate) -> Result<(), GatewayError> {
        let mut tx = self.db.begin().await?;

        // `analytics` has no unique (blog_id, date) key to upsert on, so
        // concurrent first views of a day serialise on a per-row lock.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(view_lock_key(post_id, day))
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            r#"UPDATE analytics
               SET page_views = COALESCE(page_views, 0) + 1,
                   unique_visitors = COALESCE(unique_visitors, 0) + 1
               WHERE blog_id = $1 AND date = $2"#,
        )
        .bind(post_id)
        .bind(day)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"INSERT INTO analytics
                   (blog_id, date, page_views, unique_visitors, avg_time_on_page,
                    bounce_rate, geo_distribution, referral_sources)
                   VALUES ($1, $2, 1, 1, 0, 0, '{}'::jsonb, '{}'::jsonb)"#,
            )
            .bind(post_id)
            .bind(day)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Advisory lock key for one post's metrics row on one day
fn view_lock_key(post_id: Uuid, day: NaiveDate) -> i64 {
    let id = post_id.as_u128();
    let folded = (id >> 64) as u64 ^ id as u64;
    (folded ^ (day.num_days_from_ce() as u64).rotate_left(32)) as i64
}

// ============================================
// In-memory gateway for tests
// ============================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!(MetricScope::parse(None), Some(MetricScope::AllPosts));
        assert_eq!(MetricScope::parse(Some("all")), Some(MetricScope::AllPosts));

        let id = Uuid::new_v4();
        assert_eq!(
            MetricScope::parse(Some(&id.to_string())),
            Some(MetricScope::Post(id))
        );
        assert_eq!(MetricScope::parse(Some("not-a-post")), None);
    }

    #[test]
    fn test_view_lock_key_per_post_and_day() {
        let post = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();

        assert_eq!(view_lock_key(post, day), view_lock_key(post, day));
        assert_ne!(view_lock_key(post, day), view_lock_key(post, next));
        assert_ne!(view_lock_key(post, day), view_lock_key(Uuid::new_v4(), day));
    }

    #[tokio::test]
    async fn test_timed_call_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, GatewayError>(())
        };

        let result = timed(Duration::from_millis(10), slow).await;
        assert!(matches!(result, Err(GatewayError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_timed_call_passes_result_through() {
        let result = timed(Duration::from_secs(1), async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
