//! Outbound collaborator traits
//!
//! The engine never talks to a network itself. Everything it wants to send
//! goes through two traits implemented outside the core:
//!
//! - [`Transport`]: the publish channel (MQTT in the field). Alerts,
//!   snapshots, heartbeats and activity summaries.
//! - [`Notifier`]: the push-notification channel (LINE for the pet tracker).
//!
//! Both are called synchronously from the tick and must not block for long;
//! a failed call is logged and counted by the caller and never retried.
//!
//! [`RecordingTransport`] and [`RecordingNotifier`] keep what they receive in
//! fixed-size buffers. They are meant for tests, replays and bring-up on a
//! bench without a broker.

use heapless::Vec;

use crate::{
    alerts::AlertRecord,
    errors::TransportError,
    telemetry::{ActivitySummary, Heartbeat, StateSnapshot},
    time::Timestamp,
};

/// Publish channel
pub trait Transport {
    /// Publish an alert record
    fn publish(&mut self, device_id: &str, record: &AlertRecord) -> Result<(), TransportError>;

    /// Publish a periodic state snapshot
    fn publish_snapshot(
        &mut self,
        device_id: &str,
        snapshot: &StateSnapshot,
        timestamp: Timestamp,
    ) -> Result<(), TransportError>;

    /// Publish a heartbeat/status report
    fn publish_heartbeat(&mut self, _device_id: &str, _heartbeat: &Heartbeat) -> Result<(), TransportError> {
        Ok(())
    }

    /// Publish an activity summary
    fn publish_summary(&mut self, _device_id: &str, _summary: &ActivitySummary) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Push-notification channel
pub trait Notifier {
    /// Push one alert to the caregiver/owner
    fn notify(&mut self, device_id: &str, record: &AlertRecord) -> Result<(), TransportError>;

    /// Disabled notifiers are skipped without touching the ledger
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Notifier for devices without a push channel
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNotifier;

impl Notifier for NoNotifier {
    fn notify(&mut self, _device_id: &str, _record: &AlertRecord) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Alerts kept by [`RecordingTransport`]
pub const RECORDED_ALERTS: usize = 64;

/// In-memory transport
///
/// Keeps the first [`RECORDED_ALERTS`] alerts and the latest snapshot,
/// heartbeat and summary, and counts everything.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    alerts: Vec<AlertRecord, RECORDED_ALERTS>,
    alert_count: usize,
    last_snapshot: Option<(StateSnapshot, Timestamp)>,
    snapshot_count: usize,
    last_heartbeat: Option<Heartbeat>,
    heartbeat_count: usize,
    last_summary: Option<ActivitySummary>,
    summary_count: usize,
    failure: Option<TransportError>,
}

impl RecordingTransport {
    /// Make every following call fail with `failure` (`None` restores)
    pub fn fail_with(&mut self, failure: Option<TransportError>) {
        self.failure = failure;
    }

    fn check(&self) -> Result<(), TransportError> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Recorded alerts, oldest first
    pub fn alerts(&self) -> &[AlertRecord] {
        &self.alerts
    }

    /// Alerts accepted so far
    pub fn alert_count(&self) -> usize {
        self.alert_count
    }

    /// Latest snapshot and its timestamp
    pub fn last_snapshot(&self) -> Option<&(StateSnapshot, Timestamp)> {
        self.last_snapshot.as_ref()
    }

    /// Snapshots accepted so far
    pub fn snapshot_count(&self) -> usize {
        self.snapshot_count
    }

    /// Latest heartbeat
    pub fn last_heartbeat(&self) -> Option<&Heartbeat> {
        self.last_heartbeat.as_ref()
    }

    /// Heartbeats accepted so far
    pub fn heartbeat_count(&self) -> usize {
        self.heartbeat_count
    }

    /// Latest activity summary
    pub fn last_summary(&self) -> Option<&ActivitySummary> {
        self.last_summary.as_ref()
    }

    /// Summaries accepted so far
    pub fn summary_count(&self) -> usize {
        self.summary_count
    }

    /// Forget everything recorded
    pub fn clear(&mut self) {
        let failure = self.failure;
        *self = Self::default();
        self.failure = failure;
    }
}

impl Transport for RecordingTransport {
    fn publish(&mut self, _device_id: &str, record: &AlertRecord) -> Result<(), TransportError> {
        self.check()?;
        self.alert_count += 1;
        // Past capacity only the count grows
        let _ = self.alerts.push(*record);
        Ok(())
    }

    fn publish_snapshot(
        &mut self,
        _device_id: &str,
        snapshot: &StateSnapshot,
        timestamp: Timestamp,
    ) -> Result<(), TransportError> {
        self.check()?;
        self.snapshot_count += 1;
        self.last_snapshot = Some((*snapshot, timestamp));
        Ok(())
    }

    fn publish_heartbeat(&mut self, _device_id: &str, heartbeat: &Heartbeat) -> Result<(), TransportError> {
        self.check()?;
        self.heartbeat_count += 1;
        self.last_heartbeat = Some(heartbeat.clone());
        Ok(())
    }

    fn publish_summary(&mut self, _device_id: &str, summary: &ActivitySummary) -> Result<(), TransportError> {
        self.check()?;
        self.summary_count += 1;
        self.last_summary = Some(*summary);
        Ok(())
    }
}

/// In-memory notifier
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    records: Vec<AlertRecord, 16>,
    count: usize,
    failure: Option<TransportError>,
}

impl RecordingNotifier {
    /// Make every following call fail with `failure` (`None` restores)
    pub fn fail_with(&mut self, failure: Option<TransportError>) {
        self.failure = failure;
    }

    /// Recorded notifications, oldest first
    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    /// Notifications accepted so far
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, _device_id: &str, record: &AlertRecord) -> Result<(), TransportError> {
        if let Some(e) = self.failure {
            return Err(e);
        }
        self.count += 1;
        let _ = self.records.push(*record);
        Ok(())
    }
}
