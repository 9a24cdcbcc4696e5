//! In-process connector
//!
//! Keeps every message it is handed. Used by the integration tests and for
//! replaying recorded sensor logs on a bench without a broker.

use crate::{ConnectionStats, Connector, ConnectorError};

/// Connector that stores messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    messages: Vec<(String, Vec<u8>)>,
    disconnected: bool,
    stats: ConnectionStats,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a dropped (`false`) or restored (`true`) link
    pub fn set_connected(&mut self, connected: bool) {
        if connected && self.disconnected {
            self.stats.reconnections += 1;
        }
        self.disconnected = !connected;
    }

    /// Every message as `(topic, payload)`, oldest first
    pub fn messages(&self) -> &[(String, Vec<u8>)] {
        &self.messages
    }

    /// Payloads sent to one topic, oldest first
    pub fn on_topic<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.messages
            .iter()
            .filter(move |(t, _)| t == topic)
            .map(|(_, payload)| payload.as_slice())
    }

    /// Latest payload on a topic, parsed as JSON
    pub fn last_json(&self, topic: &str) -> Option<serde_json::Value> {
        let payload = self.on_topic(topic).last()?;
        serde_json::from_slice(payload).ok()
    }

    /// Forget stored messages
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Connector for MemoryConnector {
    type Error = ConnectorError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if self.disconnected {
            let err = ConnectorError::NotConnected;
            self.stats.record_failure(&err);
            return Err(err);
        }
        self.stats.record_sent(data.len());
        self.messages.push((topic.to_owned(), data.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
