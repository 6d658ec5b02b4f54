//! Analytics Handlers

use crate::analytics::AnalyticsPeriod;
use crate::gateway::MetricScope;
use crate::models::AnalyticsQuery;
use crate::services::ServiceError;
use crate::BlogServices;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// GET /analytics?range=&post= - Dashboard analytics
pub async fn summary(
    State(services): State<Arc<BlogServices>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let scope = MetricScope::parse(query.post.as_deref())
        .ok_or_else(|| ServiceError::Validation("post must be \"all\" or a post id".into()))?;
    let period = AnalyticsPeriod::from_range_key(query.range.as_deref());

    let summary = services.analytics.summary(scope, period).await?;

    Ok(Json(summary))
}
