//! Collaborator adapters for the CareGuard alert engine
//!
//! ## Overview
//!
//! The core engine only knows two outbound traits,
//! [`careguard_core::Transport`] and [`careguard_core::Notifier`]. This crate
//! supplies the implementations used on real deployments:
//!
//! | Piece | Role |
//! |-------|------|
//! | [`JsonTransport`] | encodes alerts, snapshots, heartbeats and summaries as JSON and hands them to a [`Connector`] |
//! | [`mqtt::MqttConnector`] | publish/subscribe link via `rumqttc` (feature `mqtt`, default) |
//! | [`line::LineNotifier`] | LINE Messaging API push via `ureq` (feature `http`) |
//! | [`MemoryConnector`] | in-process connector for tests and bench replays |
//! | [`settings::Settings`] | one JSON file combining engine, MQTT and LINE settings |
//!
//! ## Topic layout
//!
//! The default [`Topics`] match the LINE backend:
//!
//! ```text
//! care/sensor/data   periodic snapshot
//! care/alert         alert records
//! care/status        heartbeat
//! care/location      position, published with each snapshot that has a fix
//! care/summary       activity summary
//! ```
//!
//! [`Topics::per_device`] gives the `care/<id>/...` layout the main backend
//! subscribes to.
//!
//! ## Failure handling
//!
//! Connectors never retry on their own. A failed send becomes a
//! [`careguard_core::TransportError`], which the engine logs and counts;
//! the next due report simply tries again.
//!
//! ## Example Usage
//!
//! ```rust
//! use careguard_connectors::{JsonTransport, MemoryConnector, Topics};
//! use careguard_core::{Engine, EngineConfig, Reading};
//!
//! let mut engine = Engine::new(EngineConfig::eldercare())?;
//! let mut transport = JsonTransport::new(MemoryConnector::new(), Topics::default());
//!
//! engine.push(Reading::Temperature(23.5), 0, true);
//! engine.tick(0, &mut transport);
//!
//! let snapshot = transport.connector().last_json("care/sensor/data").unwrap();
//! assert_eq!(snapshot["device_id"], "M5_CARE_001");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod memory;
pub mod payload;
pub mod settings;
pub mod topics;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "http")]
pub mod line;

// Re-export common types
pub use memory::MemoryConnector;
pub use topics::Topics;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttError};

#[cfg(feature = "http")]
pub use line::{LineConfig, LineNotifier};

use careguard_core::{
    telemetry::{ActivitySummary, Heartbeat},
    AlertRecord, StateSnapshot, Timestamp, Transport, TransportError,
};
use serde::Serialize;
use thiserror::Error;

use payload::{AlertMessage, LocationMessage, SnapshotMessage, StatusMessage, SummaryMessage};

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Buffer full")]
    BufferFull,

    #[error("Timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<&ConnectorError> for TransportError {
    fn from(err: &ConnectorError) -> Self {
        match err {
            ConnectorError::NotConnected => TransportError::NotConnected,
            ConnectorError::BufferFull => TransportError::BufferFull,
            ConnectorError::Timeout => TransportError::Timeout,
            ConnectorError::ProtocolError(_) => TransportError::Rejected { reason: "protocol" },
            ConnectorError::ConfigError(_) => TransportError::Rejected { reason: "configuration" },
            ConnectorError::Encoding(_) => TransportError::Encoding,
        }
    }
}

/// Trait for all protocol connectors
pub trait Connector {
    /// Connector-specific failure
    type Error: Into<ConnectorError>;

    /// Send one encoded message
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Account for one successful send
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Account for one failed send
    pub fn record_failure(&mut self, error: &impl std::fmt::Display) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

/// JSON encoder sitting between the engine and a [`Connector`]
#[derive(Debug)]
pub struct JsonTransport<C> {
    connector: C,
    topics: Topics,
}

impl<C: Connector> JsonTransport<C> {
    /// Wrap a connector
    pub fn new(connector: C, topics: Topics) -> Self {
        Self { connector, topics }
    }

    /// Underlying connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Underlying connector, mutably
    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Topics in use
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Unwrap the connector
    pub fn into_inner(self) -> C {
        self.connector
    }

    fn send_json<T: Serialize>(&mut self, topic: &str, message: &T) -> Result<(), TransportError> {
        let bytes = serde_json::to_vec(message).map_err(|e| {
            log::error!("failed to encode message for {}: {}", topic, e);
            TransportError::Encoding
        })?;

        self.connector.send(topic, &bytes).map_err(|e| {
            let err: ConnectorError = e.into();
            log::warn!("send to {} failed: {}", topic, err);
            TransportError::from(&err)
        })
    }
}

impl<C: Connector> Transport for JsonTransport<C> {
    fn publish(&mut self, device_id: &str, record: &AlertRecord) -> Result<(), TransportError> {
        let message = AlertMessage::new(device_id, record);
        let topic = self.topics.alert.clone();
        self.send_json(&topic, &message)
    }

    fn publish_snapshot(
        &mut self,
        device_id: &str,
        snapshot: &StateSnapshot,
        timestamp: Timestamp,
    ) -> Result<(), TransportError> {
        let topic = self.topics.data.clone();
        self.send_json(&topic, &SnapshotMessage::new(device_id, snapshot, timestamp))?;

        if let Some(location) = LocationMessage::from_snapshot(device_id, snapshot, timestamp) {
            let topic = self.topics.location.clone();
            self.send_json(&topic, &location)?;
        }
        Ok(())
    }

    fn publish_heartbeat(&mut self, device_id: &str, heartbeat: &Heartbeat) -> Result<(), TransportError> {
        let topic = self.topics.status.clone();
        self.send_json(&topic, &StatusMessage::new(device_id, heartbeat))
    }

    fn publish_summary(&mut self, device_id: &str, summary: &ActivitySummary) -> Result<(), TransportError> {
        let topic = self.topics.summary.clone();
        self.send_json(&topic, &SummaryMessage::new(device_id, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_errors_map_to_transport_errors() {
        assert_eq!(TransportError::from(&ConnectorError::NotConnected), TransportError::NotConnected);
        assert_eq!(TransportError::from(&ConnectorError::BufferFull), TransportError::BufferFull);
        assert_eq!(
            TransportError::from(&ConnectorError::ProtocolError("bad packet".into())),
            TransportError::Rejected { reason: "protocol" }
        );
    }

    #[test]
    fn stats_keep_the_last_error() {
        let mut stats = ConnectionStats::default();
        stats.record_sent(10);
        stats.record_failure(&ConnectorError::Timeout);
        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.bytes_sent, 10);
        assert_eq!(stats.last_error.as_deref(), Some("Timeout"));
    }
}
