//! PixelPress API server

use anyhow::Context;
use pixelpress::{AppConfig, BlogApp};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pixelpress=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    config.validate()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.gateway_timeout)
        .connect(&config.database_url)
        .await
        .context("connecting to DATABASE_URL")?;

    let bind_addr = config.bind_addr.clone();

    let mut app = BlogApp::new(config);
    app.activate(db).await?;
    let router = app.routes()?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!(addr = %bind_addr, "PixelPress API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    app.deactivate().await?;
    Ok(())
}
