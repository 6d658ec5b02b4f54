//! Custom Axum Extractors
//!
//! Extractors for the authenticated user. Tokens are issued by the managed
//! auth service and verified by the auth middleware, which stores the claims
//! in request extensions.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ApiError;

/// Role name granting dashboard administration
pub const ADMIN_ROLE: &str = "admin";

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User id
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Auth-service role ("authenticated", "anon", ...)
    #[serde(default)]
    pub role: Option<String>,
    /// Application role name ("admin", "editor", "author", ...)
    #[serde(default)]
    pub user_role: Option<String>,
    pub aud: String,
    pub exp: usize,
}

/// Authenticated user information extracted from JWT claims
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: String,
}

impl User {
    /// Create user from JWT claims
    pub fn from_claims(claims: &AccessTokenClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
            role: claims.user_role.clone().unwrap_or_else(|| "user".to_string()),
        }
    }

    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Extractor for authenticated user
///
/// Only valid behind `require_auth` / `require_admin`.
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessTokenClaims>()
            .map(|claims| AuthUser(User::from_claims(claims)))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiError::new("unauthorized", "Authentication required")),
                )
                    .into_response()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_role: Option<&str>) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: Uuid::new_v4(),
            email: Some("editor@example.com".into()),
            role: Some("authenticated".into()),
            user_role: user_role.map(String::from),
            aud: "authenticated".into(),
            exp: 0,
        }
    }

    #[test]
    fn test_user_roles() {
        assert!(User::from_claims(&claims(Some("admin"))).is_admin());
        assert!(!User::from_claims(&claims(Some("editor"))).is_admin());

        let user = User::from_claims(&claims(None));
        assert_eq!(user.role, "user");
        assert!(!user.is_admin());
    }
}
