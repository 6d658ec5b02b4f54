//! View Counter Middleware

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::BlogServices;

/// Post id of a `/posts/:id` path
fn post_id_from_path(path: &str) -> Option<Uuid> {
    let id = path.strip_prefix("/posts/")?;
    if id.contains('/') {
        return None;
    }
    Uuid::parse_str(id).ok()
}

/// Record a view for successful article reads.
///
/// Counting happens in the background; failures are logged and never
/// affect the response.
pub async fn record_views(
    State(services): State<Arc<BlogServices>>,
    req: Request,
    next: Next,
) -> Response {
    let post_id = if req.method() == Method::GET {
        post_id_from_path(req.uri().path())
    } else {
        None
    };

    let response = next.run(req).await;

    if let Some(post_id) = post_id.filter(|_| response.status().is_success()) {
        tokio::spawn(async move {
            if let Err(e) = services.analytics.record_view(post_id).await {
                tracing::warn!(post_id = %post_id, error = %e, "Failed to record post view");
            }
            if let Err(e) = services.posts.increment_views(post_id).await {
                tracing::warn!(post_id = %post_id, error = %e, "Failed to increment post views");
            }
        });
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_from_path() {
        let id = Uuid::new_v4();
        assert_eq!(post_id_from_path(&format!("/posts/{}", id)), Some(id));
        assert_eq!(post_id_from_path(&format!("/posts/{}/comments", id)), None);
        assert_eq!(post_id_from_path("/posts/hello-world"), None);
        assert_eq!(post_id_from_path("/categories"), None);
    }
}
