//! Authentication Middleware
//!
//! Verifies access tokens issued by the managed auth service (HS256, shared
//! secret) and stores the claims in request extensions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

use crate::extractors::{AccessTokenClaims, ADMIN_ROLE};
use crate::models::ApiError;
use crate::BlogServices;

fn reject(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(ApiError::new(error, message))).into_response()
}

/// Access token verifier
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Extract and validate the bearer token from an Authorization header
    pub fn verify(&self, auth_header: Option<&str>) -> Result<AccessTokenClaims, Response> {
        let header = auth_header.ok_or_else(|| {
            reject(StatusCode::UNAUTHORIZED, "unauthorized", "Authentication required")
        })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            reject(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid authorization header format",
            )
        })?;

        decode::<AccessTokenClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {:?}", e);
                reject(StatusCode::UNAUTHORIZED, "invalid_token", "Invalid or expired token")
            })
    }
}

fn authorization(req: &Request) -> Option<&str> {
    req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// Require authenticated user
pub async fn require_auth(
    State(services): State<Arc<BlogServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let claims = services.verifier.verify(authorization(&req))?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Require admin role
pub async fn require_admin(
    State(services): State<Arc<BlogServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let claims = services.verifier.verify(authorization(&req))?;

    if claims.user_role.as_deref() != Some(ADMIN_ROLE) {
        tracing::debug!(user_id = %claims.sub, "Admin access denied");
        return Err(reject(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Admin access required",
        ));
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token(aud: &str, exp_offset: i64) -> String {
        let claims = AccessTokenClaims {
            sub: Uuid::new_v4(),
            email: None,
            role: Some("authenticated".into()),
            user_role: Some("admin".into()),
            aud: aud.into(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET, "authenticated");
        let header = format!("Bearer {}", token("authenticated", 3600));

        let claims = verifier.verify(Some(&header)).unwrap();
        assert_eq!(claims.user_role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_rejected_tokens() {
        let verifier = TokenVerifier::new(SECRET, "authenticated");

        let missing = verifier.verify(None).unwrap_err();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let scheme = format!("Token {}", token("authenticated", 3600));
        assert!(verifier.verify(Some(&scheme)).is_err());

        let audience = format!("Bearer {}", token("other", 3600));
        assert!(verifier.verify(Some(&audience)).is_err());

        let expired = format!("Bearer {}", token("authenticated", -3600));
        assert!(verifier.verify(Some(&expired)).is_err());
    }
}
