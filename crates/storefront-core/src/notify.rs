//! Email notifications
//!
//! Newsletter signups send two emails: a welcome to the subscriber and an
//! alert to the store operator. Nothing is written to the database, so a
//! delivery failure has nothing to undo; it is reported to the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{Backend, Config};

/// Errors from the notification side-channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The address cannot receive mail
    #[error("Invalid email address: '{0}'")]
    InvalidAddress(String),

    /// The email API refused or could not be reached
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// A setting needed to send mail is missing
    #[error("Email is not configured: {0} is not set")]
    NotConfigured(&'static str),
}

/// An outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Sends emails
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

/// Shared handle to a notifier
pub type SharedNotifier = Arc<dyn Notifier>;

/// Email API client (Resend-compatible `POST /emails`)
pub struct HttpNotifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpNotifier {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        debug!("Sending '{}' to {:?}", email.subject, email.to);
        let response = self
            .http
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}

/// Keeps sent emails in memory instead of delivering them
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<Email>>,
    failing: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox whose every send fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Delivery("outbox is failing".to_string()));
        }
        info!("Outbox: '{}' to {}", email.subject, email.to.join(", "));
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

/// Build the configured notifier
///
/// The mock backend keeps emails in an in-memory outbox. The live backend
/// needs `email_api_key`.
pub fn connect(config: &Config) -> Result<SharedNotifier> {
    match config.backend {
        Backend::Mock => Ok(Arc::new(Outbox::new())),
        Backend::Live => {
            let Some(ref key) = config.email_api_key else {
                bail!(
                    "email_api_key is required for the live backend. \
                     Set one with: storefront config set email_api_key <KEY>"
                );
            };
            Ok(Arc::new(HttpNotifier::new(
                &config.email_api_url,
                key,
                config.request_timeout(),
            )?))
        }
    }
}

/// A newsletter signup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Sends the signup emails
pub struct Newsletter {
    notifier: SharedNotifier,
    from: String,
    operator: Option<String>,
    store_name: String,
}

impl Newsletter {
    pub fn new(notifier: SharedNotifier, config: &Config) -> Self {
        Self {
            notifier,
            from: config.email_from.clone(),
            operator: config.operator_email.clone(),
            store_name: config.store_name.clone(),
        }
    }

    /// Welcome the subscriber and tell the operator
    pub async fn subscribe(&self, subscriber: &Subscriber) -> Result<(), NotifyError> {
        let address = subscriber.email.trim();
        if !is_valid_email(address) {
            return Err(NotifyError::InvalidAddress(subscriber.email.clone()));
        }
        let operator = self
            .operator
            .as_deref()
            .ok_or(NotifyError::NotConfigured("operator_email"))?;

        self.notifier
            .send(&welcome_email(&self.store_name, &self.from, address, subscriber))
            .await?;
        self.notifier
            .send(&operator_alert(&self.store_name, &self.from, operator, subscriber))
            .await?;

        info!("Newsletter signup: {}", address);
        Ok(())
    }
}

fn welcome_email(store: &str, from: &str, to: &str, subscriber: &Subscriber) -> Email {
    let greeting = match subscriber.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("Hi {},", escape_html(name)),
        _ => "Hi there,".to_string(),
    };

    Email {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: format!("Welcome to the {} newsletter", store),
        html: format!(
            "<p>{}</p>\
             <p>Thanks for subscribing to {}. You'll be the first to hear about \
             new arrivals and offers.</p>",
            greeting,
            escape_html(store)
        ),
    }
}

fn operator_alert(store: &str, from: &str, to: &str, subscriber: &Subscriber) -> Email {
    Email {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: format!("New {} newsletter subscriber", store),
        html: format!(
            "<p>New subscriber: <strong>{}</strong></p><p>Name: {}</p>",
            escape_html(subscriber.email.trim()),
            escape_html(subscriber.name.as_deref().unwrap_or("(not given)"))
        ),
    }
}

/// Loose address check: one `@`, something before it, a dotted domain after
pub fn is_valid_email(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
