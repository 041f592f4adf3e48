//! Webhook alerting
//!
//! Fire-and-forget notifications for trade outcomes and urgent conditions
//! (kill switch, safety veto). The webhook URL comes from configuration;
//! without one the alerter is a no-op so the trading path never depends on
//! an external messaging service being up.
//!
//! Author: AI-Generated
//! Created: 2026-03-01

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warn,
    Urgent,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "INFO"),
            AlertLevel::Warn => write!(f, "WARN"),
            AlertLevel::Urgent => write!(f, "URGENT"),
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload {
    content: String,
}

pub struct AlertSender {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl AlertSender {
    pub fn new(webhook_url: Option<String>) -> Self {
        if webhook_url.is_some() {
            info!("webhook alerts enabled");
        } else {
            warn!("no alert webhook configured - alerts go to the log only");
        }
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Send an alert. Failures are logged and swallowed; alerting must
    /// never take down the trading loop.
    pub async fn send(&self, level: AlertLevel, message: &str) {
        let line = format!("[{}] {}", level, message);
        match level {
            AlertLevel::Urgent => warn!("🚨 {}", line),
            _ => info!("{}", line),
        }
        let Some(url) = &self.webhook_url else {
            return;
        };
        let payload = WebhookPayload { content: line };
        if let Err(e) = self.client.post(url).json(&payload).send().await {
            warn!("alert webhook failed: {}", e);
        }
    }
}
