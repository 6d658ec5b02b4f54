//! Comment Handlers

use crate::models::*;
use crate::services::ServiceError;
use crate::BlogServices;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// GET /posts/:id/comments - Approved comments on a post
pub async fn list_comments(
    State(services): State<Arc<BlogServices>>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let comments = services
        .comments
        .list_for_post(post_id, Some(CommentStatus::Approved))
        .await?;
    Ok(Json(serde_json::json!({
        "data": comments,
        "count": comments.len()
    })))
}

/// GET /dashboard/posts/:id/comments - Comments of any status
pub async fn list_all_comments(
    State(services): State<Arc<BlogServices>>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<CommentQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let comments = services
        .comments
        .list_for_post(post_id, query.status)
        .await?;
    Ok(Json(serde_json::json!({
        "data": comments,
        "count": comments.len()
    })))
}

/// PUT /comments/:id/status - Moderate a comment
pub async fn set_comment_status(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let comment = services.comments.set_status(id, req.status).await?;
    Ok(Json(comment))
}
