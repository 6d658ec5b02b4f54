//! Application Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets.

use std::env;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string of the managed backend (DATABASE_URL)
    pub database_url: String,

    /// Listen address (BIND_ADDR)
    pub bind_addr: String,

    /// Secret used by the auth service to sign access tokens (JWT_SECRET)
    pub jwt_secret: String,

    /// Expected audience claim (JWT_AUDIENCE)
    pub jwt_audience: String,

    /// Page size of reader listings (POSTS_PER_PAGE)
    pub posts_per_page: i64,

    /// Transactional email API key (BREVO_API_KEY); invites fail when unset
    pub brevo_api_key: Option<String>,

    /// Transactional email endpoint (BREVO_API_URL)
    pub brevo_api_url: String,

    /// Sender display name (EMAIL_SENDER_NAME)
    pub email_sender_name: String,

    /// Sender address (EMAIL_SENDER_ADDRESS)
    pub email_sender_address: String,

    /// Public site URL used in invitation links (APP_URL)
    pub app_url: String,

    /// Timeout applied to each outbound backend call (GATEWAY_TIMEOUT_SECS)
    pub gateway_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,

            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "authenticated".to_string()),

            posts_per_page: env::var("POSTS_PER_PAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            brevo_api_key: env::var("BREVO_API_KEY").ok().filter(|v| !v.is_empty()),

            brevo_api_url: env::var("BREVO_API_URL")
                .unwrap_or_else(|_| "https://api.brevo.com/v3/smtp/email".to_string()),

            email_sender_name: env::var("EMAIL_SENDER_NAME")
                .unwrap_or_else(|_| "Love&Pixels".to_string()),

            email_sender_address: env::var("EMAIL_SENDER_ADDRESS")
                .unwrap_or_else(|_| "no-reply@localhost".to_string()),

            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),

            gateway_timeout: Duration::from_secs(
                env::var("GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if !(1..=100).contains(&self.posts_per_page) {
            return Err(ConfigError::Invalid(
                "POSTS_PER_PAGE must be between 1 and 100".to_string(),
            ));
        }

        if self.gateway_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "GATEWAY_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        if url::Url::parse(&self.app_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "APP_URL is not a valid URL: {}",
                self.app_url
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/pixelpress".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "a".repeat(32),
        jwt_audience: "authenticated".to_string(),
        posts_per_page: 10,
        brevo_api_key: None,
        brevo_api_url: "https://api.brevo.com/v3/smtp/email".to_string(),
        email_sender_name: "Love&Pixels".to_string(),
        email_sender_address: "editor@example.com".to_string(),
        app_url: "https://blog.example.com".to_string(),
        gateway_timeout: Duration::from_secs(10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AppConfig {
            jwt_secret: "short".to_string(),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_page_size() {
        let config = AppConfig {
            posts_per_page: 0,
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_app_url() {
        let config = AppConfig {
            app_url: "not a url".to_string(),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }
}
