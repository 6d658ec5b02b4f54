//! Category Handlers
//!
//! Reads are public. Writes are admin-only, and the featured-content
//! categories are created on demand by the featured workflow as well.

use crate::handlers::validated;
use crate::models::*;
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

/// GET /categories - Category names for menus and the featured editor
pub async fn list_categories(
    State(services): State<Arc<BlogServices>>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = services.categories.list().await?;
    Ok(Json(serde_json::json!({
        "data": categories,
        "count": categories.len()
    })))
}

/// POST /categories - Find or create a category by name
pub async fn create_category(
    State(services): State<Arc<BlogServices>>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = services.categories.create(validated(req)?).await?;
    tracing::info!(category_id = %category.id, name = %category.name, "Category ready");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /categories/:id - Rename; 409 when the name is taken
pub async fn rename_category(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = services.categories.rename(id, validated(req)?).await?;
    Ok(Json(category))
}

/// DELETE /categories/:id - Posts in it fall back to "Uncategorized"
pub async fn delete_category(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    services.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
