//! Post Handlers

use crate::extractors::AuthUser;
use crate::models::*;
use crate::handlers::validated;
use crate::services::ServiceError;
use crate::BlogServices;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// GET /posts - List published posts, optionally by category name
pub async fn list_posts(
    State(services): State<Arc<BlogServices>>,
    Query(query): Query<PostQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let posts = services
        .posts
        .list(Some(PostStatus::Published), &query)
        .await?;
    Ok(Json(posts))
}

/// GET /posts/:id - Get a published post
pub async fn get_post(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let post = services.posts.get_published(id).await?;
    Ok(Json(post))
}

/// GET /dashboard/posts - List posts of any status
pub async fn list_dashboard_posts(
    State(services): State<Arc<BlogServices>>,
    Query(query): Query<PostQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let posts = services.posts.list(query.status, &query).await?;
    Ok(Json(posts))
}

/// POST /posts - Create a new post
pub async fn create_post(
    State(services): State<Arc<BlogServices>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let req = validated(req)?;

    let post = services.posts.create(user.id, req).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /posts/:id - Update a post
pub async fn update_post(
    State(services): State<Arc<BlogServices>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let req = validated(req)?;

    let post = services
        .posts
        .update(id, user.id, user.is_admin(), req)
        .await?;

    Ok(Json(post))
}

/// DELETE /posts/:id - Delete a post
pub async fn delete_post(
    State(services): State<Arc<BlogServices>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    services.posts.delete(id, user.id, user.is_admin()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /posts/:id/feature - Make this the one featured post
pub async fn feature_post(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let post = services.posts.set_featured(id).await?;
    Ok(Json(post))
}
