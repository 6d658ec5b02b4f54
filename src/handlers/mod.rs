//! Blog API Handlers

pub mod analytics;
pub mod categories;
pub mod comments;
pub mod dashboard;
pub mod featured;
pub mod media;
pub mod posts;
pub mod users;

use crate::analytics::AnalyticsError;
use crate::featured::FeaturedError;
use crate::gateway::GatewayError;
use crate::models::ApiError;
use crate::services::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

/// Validate a request body, reporting the first field message
pub(crate) fn validated<T: Validate>(req: T) -> Result<T, ServiceError> {
    req.validate().map_err(|errors| {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .find_map(|(_, errs)| errs.iter().find_map(|e| e.message.as_ref()))
            .map(|m| m.to_string())
            .or_else(|| fields.first().map(|(field, _)| format!("Invalid {}", field)))
            .unwrap_or_else(|| errors.to_string());

        ServiceError::Validation(message)
    })?;
    Ok(req)
}

fn gateway_status(err: &GatewayError) -> (StatusCode, &'static str, String) {
    match err {
        GatewayError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
        other => {
            tracing::error!("Gateway error: {}", other);
            (
                StatusCode::BAD_GATEWAY,
                "gateway_error",
                "The backend could not complete the request".to_string(),
            )
        }
    }
}

/// Convert service errors to HTTP responses
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let mut details = None;

        let (status, error, message) = match self {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ServiceError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ServiceError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                "You don't have permission to perform this action".to_string(),
            ),
            ServiceError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            ServiceError::Gateway(e) => gateway_status(&e),
            ServiceError::Analytics(e) => {
                tracing::error!("Analytics error: {}", e);
                let status = match e {
                    AnalyticsError::Gateway(_) => StatusCode::BAD_GATEWAY,
                    AnalyticsError::Aggregate(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "analytics_unavailable", "Analytics unavailable".to_string())
            }
            ServiceError::Featured(FeaturedError::Resolution(e)) => {
                tracing::warn!("Featured content not saved: {}", e);
                details = Some(serde_json::json!({ "missing": e.missing_categories() }));
                (StatusCode::UNPROCESSABLE_ENTITY, "category_missing", e.to_string())
            }
            ServiceError::Featured(FeaturedError::Gateway(e)) => gateway_status(&e),
            ServiceError::Email(e) => {
                tracing::error!("Email error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "email_error", e.to_string())
            }
        };

        let mut body = ApiError::new(error, &message);
        if let Some(details) = details {
            body = body.with_details(details);
        }

        (status, Json(body)).into_response()
    }
}
