//! Media Handlers

use crate::extractors::AuthUser;
use crate::models::*;
use crate::handlers::validated;
use crate::services::ServiceError;
use crate::BlogServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// GET /media - List the media library
pub async fn list_media(
    State(services): State<Arc<BlogServices>>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = services.media.list().await?;
    Ok(Json(serde_json::json!({
        "data": items,
        "count": items.len()
    })))
}

/// POST /media - Register an uploaded object
pub async fn record_media(
    State(services): State<Arc<BlogServices>>,
    AuthUser(user): AuthUser,
    Json(req): Json<MediaRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let req = validated(req)?;

    let item = services.media.record(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /media/:id - Remove a media record
pub async fn delete_media(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    services.media.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
