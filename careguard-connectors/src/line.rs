//! LINE Messaging API push notifier
//!
//! Implements [`careguard_core::Notifier`] by pushing to one LINE user:
//!
//! 1. a text message with the alert text, level and device time
//! 2. a location message when the alert carries coordinates
//! 3. for Emergency alerts, quick-reply buttons on the text message
//!    (ask for status, ask for location, call the emergency number)
//!
//! Requests go out synchronously through `ureq` with a bounded timeout, so
//! a slow API delays the tick at most by that timeout. How often a kind may
//! be pushed is decided by the engine's aggregator, not here.
//!
//! ```rust,no_run
//! use careguard_connectors::line::{LineConfig, LineNotifier};
//!
//! let config = LineConfig::new("channel-access-token", "U0123456789abcdef");
//! let notifier = LineNotifier::new(config)?;
//! # Ok::<(), careguard_connectors::line::LineError>(())
//! ```

use std::time::Duration;

use careguard_core::{alerts::Severity, AlertRecord, Notifier, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::payload::alert_text;

/// Push endpoint of the Messaging API
pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

/// LINE-specific errors
#[derive(Debug, Error)]
pub enum LineError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<&LineError> for TransportError {
    fn from(err: &LineError) -> Self {
        match err {
            LineError::Request(_) => TransportError::NotConnected,
            LineError::ServerError { status: 401 | 403, .. } => TransportError::Rejected { reason: "unauthorized" },
            LineError::ServerError { status: 429, .. } => TransportError::Rejected { reason: "rate limited" },
            LineError::ServerError { .. } => TransportError::Rejected { reason: "server error" },
            LineError::Config(_) => TransportError::Rejected { reason: "configuration" },
        }
    }
}

/// LINE configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Channel access token (bearer)
    pub channel_access_token: String,
    /// Recipient user id
    pub user_id: String,
    /// Push endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Number dialled by the emergency quick reply
    #[serde(default = "default_emergency_number")]
    pub emergency_number: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    LINE_PUSH_ENDPOINT.into()
}

fn default_emergency_number() -> String {
    "119".into()
}

fn default_timeout_secs() -> u64 {
    10
}

impl LineConfig {
    /// Configuration for one recipient
    pub fn new(channel_access_token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            channel_access_token: channel_access_token.into(),
            user_id: user_id.into(),
            endpoint: default_endpoint(),
            emergency_number: default_emergency_number(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Set the emergency number
    pub fn emergency_number(mut self, number: impl Into<String>) -> Self {
        self.emergency_number = number.into();
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn validate(&self) -> Result<(), LineError> {
        if self.channel_access_token.is_empty() {
            return Err(LineError::Config("channel access token is empty".into()));
        }
        if self.user_id.is_empty() {
            return Err(LineError::Config("user id is empty".into()));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(LineError::Config("endpoint must start with http:// or https://".into()));
        }
        Ok(())
    }
}

/// Build the push request body for one alert
pub fn push_body(config: &LineConfig, device_id: &str, record: &AlertRecord) -> Value {
    let mut text = json!({
        "type": "text",
        "text": format!(
            "{}\nLevel: {} ({})\nDevice: {}\nTime: {} s since boot",
            alert_text(record),
            record.severity().level(),
            record.severity().as_str(),
            device_id,
            record.raised_at_ms() / 1_000,
        ),
    });

    if record.severity() == Severity::Emergency {
        text["quickReply"] = json!({
            "items": [
                { "type": "action", "action": { "type": "message", "label": "Status", "text": "status" } },
                { "type": "action", "action": { "type": "message", "label": "Location", "text": "location" } },
                {
                    "type": "action",
                    "action": {
                        "type": "uri",
                        "label": "Emergency call",
                        "uri": format!("tel:{}", config.emergency_number),
                    },
                },
            ],
        });
    }

    let mut messages = vec![text];
    if let Some(p) = record.position() {
        messages.push(json!({
            "type": "location",
            "title": "Current position",
            "address": format!("Lat {:.6}, Lon {:.6}", p.latitude, p.longitude),
            "latitude": p.latitude,
            "longitude": p.longitude,
        }));
    }

    json!({ "to": config.user_id, "messages": messages })
}

/// Push notifier for the LINE Messaging API
pub struct LineNotifier {
    config: LineConfig,
    agent: ureq::Agent,
    sent: u64,
}

impl LineNotifier {
    /// Create from configuration
    pub fn new(config: LineConfig) -> Result<Self, LineError> {
        config.validate()?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&format!("CareGuard/{}", env!("CARGO_PKG_VERSION")))
            .build();
        Ok(Self { config, agent, sent: 0 })
    }

    /// Push one alert
    pub fn push(&self, device_id: &str, record: &AlertRecord) -> Result<(), LineError> {
        let body = push_body(&self.config, device_id, record).to_string();
        let response = self
            .agent
            .post(&self.config.endpoint)
            .set("Authorization", &format!("Bearer {}", self.config.channel_access_token))
            .set("Content-Type", "application/json")
            .send_string(&body);

        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, resp)) => Err(LineError::ServerError {
                status,
                message: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(LineError::Request(e.to_string())),
        }
    }

    /// Pushes delivered so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Notifier for LineNotifier {
    fn notify(&mut self, device_id: &str, record: &AlertRecord) -> Result<(), TransportError> {
        match self.push(device_id, record) {
            Ok(()) => {
                self.sent += 1;
                log::info!("LINE push for {} sent", record.kind().name());
                Ok(())
            }
            Err(e) => {
                log::warn!("LINE push for {} failed: {}", record.kind().name(), e);
                Err(TransportError::from(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careguard_core::{alerts::AlertPayload, AlertKind, GeoPoint};

    fn escape() -> AlertRecord {
        AlertRecord::new(
            AlertKind::GeofenceEscape,
            Severity::Emergency,
            61_000,
            AlertPayload::Location { distance_m: 1_200.0, position: GeoPoint::new(33.59, 130.34) },
        )
    }

    #[test]
    fn emergency_gets_quick_replies_and_location() {
        let config = LineConfig::new("token", "user");
        let body = push_body(&config, "collar", &escape());

        assert_eq!(body["to"], "user");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["type"], "location");
        let items = messages[0]["quickReply"]["items"].as_array().unwrap();
        assert_eq!(items[2]["action"]["uri"], "tel:119");
        assert!(messages[0]["text"].as_str().unwrap().contains("Level: 3"));
    }

    #[test]
    fn warning_is_plain_text() {
        let record = AlertRecord::new(
            AlertKind::NoMotion,
            Severity::Warning,
            0,
            AlertPayload::Inactivity { elapsed_ms: 300_000 },
        );
        let body = push_body(&LineConfig::new("t", "u"), "care", &record);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].get("quickReply").is_none());
    }

    #[test]
    fn config_validation() {
        assert!(LineNotifier::new(LineConfig::new("", "u")).is_err());
        let mut config = LineConfig::new("t", "u");
        config.endpoint = "ftp://example".into();
        assert!(LineNotifier::new(config).is_err());
        assert!(LineNotifier::new(LineConfig::new("t", "u").timeout_secs(2)).is_ok());
    }

    #[test]
    fn status_codes_map_to_transport_errors() {
        let unauthorized = LineError::ServerError { status: 401, message: String::new() };
        assert_eq!(TransportError::from(&unauthorized), TransportError::Rejected { reason: "unauthorized" });
        let throttled = LineError::ServerError { status: 429, message: String::new() };
        assert_eq!(TransportError::from(&throttled), TransportError::Rejected { reason: "rate limited" });
    }
}
