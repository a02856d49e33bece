//! Transactional email
//!
//! Handlers build a [`MailMessage`] and hand it to [`dispatch`], which sends
//! it in the background. A failed send is logged and never fails the request
//! that triggered it.
//!
//! Two mailers ship:
//!
//! - [`LogMailer`] writes messages to the log (the default)
//! - [`MemoryMailer`] keeps them in memory for tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

/// An outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Email delivery failure
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to deliver email: {0}")]
    Delivery(String),
}

/// Sends email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Mailer that writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "Email queued");
        tracing::debug!(body = %message.text, "Email body");
        Ok(())
    }
}

/// Mailer that records messages in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn sent_messages(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());
        Ok(())
    }
}

/// Sends a message on the runtime without waiting for it
pub fn dispatch(mailer: Arc<dyn Mailer>, message: MailMessage) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&message).await {
            tracing::warn!(to = %message.to, subject = %message.subject, error = %e, "Email delivery failed");
        }
    })
}

/// Escapes text for HTML element content and double-quoted attributes
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render(greeting: &str, intro: &str, action: &str, url: &str, outro: &str) -> (String, String) {
    let text = format!("{}\n\n{}\n\n{}: {}\n\n{}\n", greeting, intro, action, url, outro);
    let html = format!(
        "<p>{}</p><p>{}</p><p><a href=\"{}\">{}</a></p><p>{}</p>",
        escape_html(greeting),
        escape_html(intro),
        escape_html(url),
        escape_html(action),
        escape_html(outro)
    );
    (text, html)
}

/// Builds the email asking a new user to verify their address
pub fn email_verification_message(to: &str, username: &str, verification_url: &str) -> MailMessage {
    let (text, html) = render(
        &format!("Hi {},", username),
        "Welcome to Basecampy! We're excited to have you on board.",
        "Verify your email",
        verification_url,
        "Need help, or have questions? Just reply to this email.",
    );

    MailMessage {
        to: to.to_string(),
        subject: "Please verify your email".to_string(),
        text,
        html,
    }
}

/// Builds the email carrying a password reset link
pub fn password_reset_message(to: &str, username: &str, reset_url: &str) -> MailMessage {
    let (text, html) = render(
        &format!("Hi {},", username),
        "We got a request to reset the password of your account.",
        "Reset password",
        reset_url,
        "If you did not ask for this, you can ignore this email.",
    );

    MailMessage {
        to: to.to_string(),
        subject: "Password reset request".to_string(),
        text,
        html,
    }
}
