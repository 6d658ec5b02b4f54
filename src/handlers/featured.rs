//! Featured Content Handlers

use crate::featured::FeaturedAssignment;
use crate::models::FeaturedRequest;
use crate::services::ServiceError;
use crate::BlogServices;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

/// GET /featured - Featured sections currently in effect
pub async fn current(
    State(services): State<Arc<BlogServices>>,
) -> Result<impl IntoResponse, ServiceError> {
    let assignment = services.featured.current().await?;
    Ok(Json(assignment))
}

/// PUT /featured - Save featured sections
pub async fn save(
    State(services): State<Arc<BlogServices>>,
    Json(req): Json<FeaturedRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let assignment = FeaturedAssignment::from(req);

    let (plan, report) = services.featured.apply(&assignment).await?;

    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|(post_id, error)| {
            serde_json::json!({
                "post_id": post_id,
                "error": error.to_string(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "plan": plan,
        "applied": report.applied,
        "failed": failed,
    })))
}
