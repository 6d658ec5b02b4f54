//! User Management Handlers

use crate::models::*;
use crate::services::ServiceError;
use crate::BlogServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// Both invite fields, trimmed and non-empty
fn invite_fields(req: &InviteRequest) -> Option<(&str, &str)> {
    let email = req.email.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
    let role = req.role.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
    Some((email, role))
}

/// POST /send-email - Send an invitation email
pub async fn send_email(
    State(services): State<Arc<BlogServices>>,
    Json(req): Json<InviteRequest>,
) -> Response {
    let Some((email, role)) = invite_fields(&req) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Email and role are required" })),
        )
            .into_response();
    };

    match services.mailer.send_invite(email, role).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Invitation email failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// POST /users/invite - Invite a user who has no profile yet
pub async fn invite_user(
    State(services): State<Arc<BlogServices>>,
    Json(req): Json<InviteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (email, role) = invite_fields(&req)
        .ok_or_else(|| ServiceError::Validation("Email and role are required".into()))?;

    services.users.invite(email, role).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /users - List users with their roles
pub async fn list_users(
    State(services): State<Arc<BlogServices>>,
) -> Result<impl IntoResponse, ServiceError> {
    let users = services.users.list().await?;
    Ok(Json(serde_json::json!({
        "data": users,
        "count": users.len()
    })))
}

/// PUT /users/:id/role - Change a user's role
pub async fn change_role(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    services.users.change_role(id, req.role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /users/:id - Remove a user's profile and roles
pub async fn delete_user(
    State(services): State<Arc<BlogServices>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_fields_require_both() {
        let req = |email: Option<&str>, role: Option<&str>| InviteRequest {
            email: email.map(String::from),
            role: role.map(String::from),
        };

        assert_eq!(
            invite_fields(&req(Some("a@example.com"), Some("editor"))),
            Some(("a@example.com", "editor"))
        );
        assert!(invite_fields(&req(None, Some("editor"))).is_none());
        assert!(invite_fields(&req(Some("a@example.com"), Some("  "))).is_none());
    }
}
