use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AlertConfig, Transition};
use crate::types::HealthState;

pub const TEST_SUBJECT: &str = "Test Alert from Servicarr";

/// A rendered alert, ready for any transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub service: String,
    pub state: HealthState,
    pub text: String,
    pub html: String,
    pub sent_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_transition(
        config: &AlertConfig,
        label: &str,
        transition: &Transition,
        at: DateTime<Utc>,
    ) -> Self {
        let subject = match transition.to {
            HealthState::Down => format!("[Servicarr] {label} is DOWN"),
            HealthState::Degraded => format!("[Servicarr] {label} is DEGRADED"),
            HealthState::Up => format!("[Servicarr] {label} has RECOVERED"),
            HealthState::Unknown => format!("[Servicarr] {label} status unknown"),
        };
        let message = match transition.to {
            HealthState::Down => format!("{label} stopped responding as expected."),
            HealthState::Degraded => format!("{label} is responding slowly."),
            HealthState::Up => format!("{label} is back up and responding normally."),
            HealthState::Unknown => format!("{label} has no recent result."),
        };

        Self::render(config, subject, label, transition.to, &message, at)
    }

    pub fn test(config: &AlertConfig, at: DateTime<Utc>) -> Self {
        Self::render(
            config,
            TEST_SUBJECT.to_owned(),
            "Test Service",
            HealthState::Up,
            "This is a test alert from your Servicarr monitoring system. If you received this, \
             your alert configuration is working correctly!",
            at,
        )
    }

    fn render(
        config: &AlertConfig,
        subject: String,
        service: &str,
        state: HealthState,
        message: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let when = at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let text = format!("{subject}\n\nService: {service}\nStatus: {state}\nTime: {when}\n\n{message}\n");

        let color = match state {
            HealthState::Up => "#16a34a",
            HealthState::Degraded => "#d97706",
            HealthState::Down => "#dc2626",
            HealthState::Unknown => "#6b7280",
        };
        let html = format!(
            "<!DOCTYPE html><html><body style=\"font-family:sans-serif\">\
             <h2 style=\"color:{color}\">{subject}</h2>\
             <p><strong>Service:</strong> {service}<br>\
             <strong>Status:</strong> {state}<br>\
             <strong>Time:</strong> {when}</p>\
             <p>{message}</p></body></html>",
            subject = escape_html(&subject),
            service = escape_html(service),
            message = escape_html(message),
        );

        Self {
            to: config.alert_email.clone(),
            from: config.from_email.clone(),
            subject,
            service: service.to_owned(),
            state,
            text,
            html,
            sent_at: at,
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
