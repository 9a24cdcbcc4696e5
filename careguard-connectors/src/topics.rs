//! Topic names

use serde::{Deserialize, Serialize};

/// Topic for each kind of outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topics {
    /// Periodic state snapshots
    pub data: String,
    /// Alert records
    pub alert: String,
    /// Heartbeats
    pub status: String,
    /// Position updates
    pub location: String,
    /// Activity summaries
    pub summary: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            data: "care/sensor/data".into(),
            alert: "care/alert".into(),
            status: "care/status".into(),
            location: "care/location".into(),
            summary: "care/summary".into(),
        }
    }
}

impl Topics {
    /// `<prefix>/<device_id>/<leaf>` layout
    ///
    /// ```rust
    /// use careguard_connectors::Topics;
    ///
    /// let topics = Topics::per_device("care", "M5_CARE_001");
    /// assert_eq!(topics.alert, "care/M5_CARE_001/alert");
    /// ```
    pub fn per_device(prefix: &str, device_id: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        let topic = |leaf: &str| format!("{}/{}/{}", prefix, device_id, leaf);
        Self {
            data: topic("data"),
            alert: topic("alert"),
            status: topic("status"),
            location: topic("location"),
            summary: topic("summary"),
        }
    }

    /// Every topic, for subscriptions and LWT setup
    pub fn all(&self) -> [&str; 5] {
        [&self.data, &self.alert, &self.status, &self.location, &self.summary]
    }
}
