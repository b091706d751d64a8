//! Transition alerts.
//!
//! [`AlertTracker`] remembers the last classified state of every service and
//! reports changes. [`AlertDispatcher`] decides which changes are worth a
//! notification under the current [`AlertConfig`] and hands them to a
//! [`Notifier`] without making the caller wait for delivery.

pub mod dispatcher;
pub mod message;
pub mod notifier;
pub mod tracker;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dispatcher::AlertDispatcher;
pub use message::Notification;
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use tracker::{AlertTracker, Transition};

/// Alert settings, editable at runtime and persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    pub alert_email: String,
    pub from_email: String,
    pub alert_on_down: bool,
    pub alert_on_degraded: bool,
    pub alert_on_up: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            alert_email: String::new(),
            from_email: String::new(),
            alert_on_down: true,
            alert_on_degraded: true,
            alert_on_up: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alerts not configured or disabled")]
    Disabled,

    #[error("failed to build webhook client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("webhook delivery failed: {0}")]
    Delivery(#[source] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Rejected(u16),
}
