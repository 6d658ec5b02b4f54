//! Dashboard Handlers

use crate::services::ServiceError;
use crate::BlogServices;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

/// GET /dashboard/stats - Post counts and total views
pub async fn stats(
    State(services): State<Arc<BlogServices>>,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = services.posts.stats().await?;
    Ok(Json(stats))
}
