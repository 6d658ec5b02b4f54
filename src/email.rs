//! Invitation Email
//!
//! Templated invitation sent through the Brevo transactional email API.

use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const INVITE_SUBJECT: &str = "Invitation to join our platform";

/// Email errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email transport error: {0}")]
    Transport(String),

    #[error("{message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        EmailError::Transport(err.to_string())
    }
}

/// Outbound email provider
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send one invitation to `email` for `role`
    async fn send_invite(&self, email: &str, role: &str) -> Result<(), EmailError>;
}

// ============================================
// Template
// ============================================

/// Rendered invitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteEmail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

impl InviteEmail {
    pub fn render(email: &str, role: &str, app_url: &str) -> Self {
        let link = signup_link(app_url, email);

        let html = format!(
            "<h1>You've been invited!</h1>\n\
             <p>You have been invited to join our platform as a {}.</p>\n\
             <p>Click the link below to set up your account:</p>\n\
             <a href=\"{}\">Set up your account</a>\n",
            html_escape::encode_text(role),
            html_escape::encode_double_quoted_attribute(&link),
        );

        Self {
            to_email: email.to_string(),
            to_name: display_name(email).to_string(),
            subject: INVITE_SUBJECT.to_string(),
            html,
        }
    }
}

/// Sign-up deep link carrying the invited address
pub fn signup_link(app_url: &str, email: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("{}/auth/signup?email={}", app_url.trim_end_matches('/'), encoded)
}

/// Local part of an address
fn display_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

// ============================================
// Brevo
// ============================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: BrevoContact<'a>,
    to: [BrevoContact<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
}

#[derive(Serialize)]
struct BrevoContact<'a> {
    name: &'a str,
    email: &'a str,
}

pub struct BrevoMailer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    sender_name: String,
    sender_address: String,
    app_url: String,
}

impl BrevoMailer {
    pub fn new(config: &AppConfig) -> Result<Self, EmailError> {
        let client = Client::builder()
            .timeout(config.gateway_timeout.max(Duration::from_secs(1)))
            .build()?;

        Ok(Self {
            client,
            api_url: config.brevo_api_url.clone(),
            api_key: config.brevo_api_key.clone(),
            sender_name: config.email_sender_name.clone(),
            sender_address: config.email_sender_address.clone(),
            app_url: config.app_url.clone(),
        })
    }
}

#[async_trait]
impl EmailGateway for BrevoMailer {
    async fn send_invite(&self, email: &str, role: &str) -> Result<(), EmailError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("Invite not sent: BREVO_API_KEY is not set");
            return Err(EmailError::NotConfigured);
        };

        let invite = InviteEmail::render(email, role, &self.app_url);
        let payload = BrevoPayload {
            sender: BrevoContact {
                name: &self.sender_name,
                email: &self.sender_address,
            },
            to: [BrevoContact {
                name: &invite.to_name,
                email: &invite.to_email,
            }],
            subject: &invite.subject,
            html_content: &invite.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Failed to send email")
                .to_string();

            tracing::error!(status = status.as_u16(), %message, "Invite rejected by email provider");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(role, "Invitation email sent");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use tokio::sync::Mutex;

    /// Records invites instead of sending them
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail_with: Option<String>,
    }

    #[async_trait]
    impl EmailGateway for RecordingMailer {
        async fn send_invite(&self, email: &str, role: &str) -> Result<(), EmailError> {
            if let Some(message) = &self.fail_with {
                return Err(EmailError::Rejected {
                    status: 400,
                    message: message.clone(),
                });
            }
            self.sent
                .lock()
                .await
                .push((email.to_string(), role.to_string()));
            Ok(())
        }
    }
}
