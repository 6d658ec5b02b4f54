//! PixelPress Blog API
//!
//! Reader site and editorial dashboard API for a blog hosted on a managed
//! Postgres/auth backend: posts, categories, comments, media, users,
//! per-post analytics and featured-content curation.

pub mod analytics;
pub mod config;
pub mod email;
pub mod extractors;
pub mod featured;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

pub use config::AppConfig;

use analytics::AnalyticsService;
use email::{BrevoMailer, EmailError, EmailGateway};
use featured::FeaturedService;
use gateway::{DataGateway, PgGateway};
use middleware::auth::TokenVerifier;

/// Application lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Email client error: {0}")]
    Email(#[from] EmailError),

    #[error("Application is not active")]
    NotActive,
}

/// Aggregated services container
pub struct BlogServices {
    pub config: AppConfig,
    pub posts: services::PostService,
    pub categories: services::CategoryService,
    pub comments: services::CommentService,
    pub media: services::MediaService,
    pub users: services::UserService,
    pub analytics: AnalyticsService,
    pub featured: FeaturedService,
    pub mailer: Arc<dyn EmailGateway>,
    pub verifier: TokenVerifier,
}

impl BlogServices {
    pub fn new(
        config: AppConfig,
        db: PgPool,
        gateway: Arc<dyn DataGateway>,
        mailer: Arc<dyn EmailGateway>,
    ) -> Self {
        let timeout = config.gateway_timeout;

        Self {
            posts: services::PostService::new(db.clone(), config.posts_per_page),
            categories: services::CategoryService::new(db.clone(), gateway.clone(), timeout),
            comments: services::CommentService::new(db.clone()),
            media: services::MediaService::new(db.clone()),
            users: services::UserService::new(db, mailer.clone()),
            analytics: AnalyticsService::new(gateway.clone(), timeout),
            featured: FeaturedService::new(gateway, timeout),
            mailer,
            verifier: TokenVerifier::new(&config.jwt_secret, &config.jwt_audience),
            config,
        }
    }
}

/// Blog API Application
pub struct BlogApp {
    config: AppConfig,
    services: Option<Arc<BlogServices>>,
}

impl BlogApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            services: None,
        }
    }

    pub async fn activate(&mut self, db: PgPool) -> Result<(), AppError> {
        tracing::info!("Activating Blog API");

        self.config.validate()?;

        let gateway: Arc<dyn DataGateway> = Arc::new(PgGateway::new(db.clone()));
        let mailer: Arc<dyn EmailGateway> = Arc::new(BrevoMailer::new(&self.config)?);

        if self.config.brevo_api_key.is_none() {
            tracing::warn!("BREVO_API_KEY not set; invitation emails are disabled");
        }

        self.services = Some(Arc::new(BlogServices::new(
            self.config.clone(),
            db,
            gateway,
            mailer,
        )));

        tracing::info!("Blog API activated successfully");
        Ok(())
    }

    pub async fn deactivate(&mut self) -> Result<(), AppError> {
        tracing::info!("Deactivating Blog API");
        self.services = None;
        Ok(())
    }

    pub fn routes(&self) -> Result<Router, AppError> {
        let services = self.services.clone().ok_or(AppError::NotActive)?;
        Ok(build_router(services))
    }
}

/// Build the API router over a services container
pub fn build_router(services: Arc<BlogServices>) -> Router {
    let require_auth =
        || axum_middleware::from_fn_with_state(services.clone(), middleware::auth::require_auth);
    let require_admin =
        || axum_middleware::from_fn_with_state(services.clone(), middleware::auth::require_admin);

    // Article reads count as views
    let article = Router::new()
        .route("/posts/:id", get(handlers::posts::get_post))
        .route_layer(axum_middleware::from_fn_with_state(
            services.clone(),
            middleware::view_counter::record_views,
        ));

    // Public routes
    let public = Router::new()
        .route("/posts", get(handlers::posts::list_posts))
        .route("/posts/:id/comments", get(handlers::comments::list_comments))
        .route("/categories", get(handlers::categories::list_categories));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/posts", post(handlers::posts::create_post))
        .route(
            "/posts/:id",
            put(handlers::posts::update_post).delete(handlers::posts::delete_post),
        )
        .route("/dashboard/posts", get(handlers::posts::list_dashboard_posts))
        .route(
            "/dashboard/posts/:id/comments",
            get(handlers::comments::list_all_comments),
        )
        .route("/comments/:id/status", put(handlers::comments::set_comment_status))
        .route(
            "/media",
            get(handlers::media::list_media).post(handlers::media::record_media),
        )
        .route("/media/:id", delete(handlers::media::delete_media))
        .route_layer(require_auth());

    // Admin routes
    let admin = Router::new()
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route("/posts/:id/feature", post(handlers::posts::feature_post))
        .route("/analytics", get(handlers::analytics::summary))
        .route(
            "/featured",
            get(handlers::featured::current).put(handlers::featured::save),
        )
        .route("/categories", post(handlers::categories::create_category))
        .route(
            "/categories/:id",
            put(handlers::categories::rename_category)
                .delete(handlers::categories::delete_category),
        )
        .route("/users", get(handlers::users::list_users))
        .route("/users/invite", post(handlers::users::invite_user))
        .route("/users/:id", delete(handlers::users::delete_user))
        .route("/users/:id/role", put(handlers::users::change_role))
        .route("/send-email", post(handlers::users::send_email))
        .route_layer(require_admin());

    Router::new()
        .merge(article)
        .merge(public)
        .merge(protected)
        .merge(admin)
        .with_state(services)
}
