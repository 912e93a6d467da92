mod email;
mod telegram;

pub use email::*;
pub use telegram::*;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{0} channel is not configured")]
    NotConfigured(&'static str),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{channel} rejected the message ({status}): {body}")]
    Rejected {
        channel: &'static str,
        status: u16,
        body: String,
    },
}

/// A human-readable status message for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub subject: Option<String>,
    pub urgent: bool,
}

impl Notification {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), subject: None, urgent: false }
    }

    pub fn urgent(text: impl Into<String>) -> Self {
        Self { text: text.into(), subject: None, urgent: true }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Subject line, falling back to the message itself.
    pub fn subject_line(&self) -> String {
        let subject = self.subject.clone().unwrap_or_else(|| self.text.clone());
        if self.urgent {
            format!("[URGENT] {}", subject)
        } else {
            subject
        }
    }
}

/// Outbound delivery channel. Delivery is best-effort from the miner's point of view.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// True when `host` names a development deployment.
pub fn is_dev_host(host: Option<&str>) -> bool {
    host.map(|h| h.contains("localhost") || h.contains("pagekite"))
        .unwrap_or(false)
}

/// Fans a notification out to every configured channel. Individual failures are logged and
/// never returned.
#[derive(Clone, Default)]
pub struct NotifierSet {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: Arc<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for NotifierSet {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.channels.is_empty() {
            debug!("No notification channels configured, dropping: {}", notification.text);
            return Ok(());
        }

        let results = join_all(self.channels.iter().map(|c| c.notify(notification))).await;
        for result in results {
            if let Err(e) = result {
                warn!("Notification delivery failed: {}", e);
            }
        }
        Ok(())
    }
}
