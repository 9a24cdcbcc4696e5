//! Periodic telemetry
//!
//! Three independent cadences run alongside the alert path:
//!
//! | Report | Cadence | Content |
//! |--------|---------|---------|
//! | [`StateSnapshot`] | `snapshot_interval_ms` | every monitor state plus buffered values |
//! | [`Heartbeat`] | `heartbeat_interval_ms` | uptime, firmware, sensor health, counters |
//! | [`ActivitySummary`] | `summary_interval_ms` (optional) | steps, active time and calories for the period |
//!
//! Snapshots and heartbeats go out on the first tick after boot; the first
//! summary waits for a full period. A cadence that falls behind (long tick,
//! transport stall) fires once and then restarts from the current tick
//! rather than bursting.

use heapless::String;

use crate::{
    aggregator::DispatchStats,
    config::TelemetryConfig,
    constants::MAX_FIRMWARE_VERSION_LEN,
    monitors::{
        activity::ActivityState,
        environment::EnvChannelState,
        geofence::{GeoPoint, ZoneState},
        proximity::ProximityState,
    },
    time::Timestamp,
};

/// Fixed-interval trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    interval_ms: u64,
    next_due: Option<Timestamp>,
    deferred: bool,
}

impl Cadence {
    /// Fires on the first poll
    pub const fn immediate(interval_ms: u64) -> Self {
        Self { interval_ms, next_due: None, deferred: false }
    }

    /// First fires one full interval after the first poll
    pub const fn deferred(interval_ms: u64) -> Self {
        Self { interval_ms, next_due: None, deferred: true }
    }

    /// True when due at `now`; schedules the next occurrence
    pub fn poll(&mut self, now: Timestamp) -> bool {
        match self.next_due {
            None if self.deferred => {
                self.next_due = Some(now.saturating_add(self.interval_ms));
                false
            }
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now.saturating_add(self.interval_ms));
                true
            }
        }
    }

    /// Interval
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

/// Point-in-time view of every monitor
///
/// Built from buffered values only; nothing is sampled to produce it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSnapshot {
    /// Tick time
    pub timestamp: Timestamp,
    /// Committed activity
    pub activity: ActivityState,
    /// Steps since boot
    pub steps: u32,
    /// A fall is latched
    pub fall_detected: bool,
    /// Calories since boot
    pub calories_kcal: f32,
    /// Fresh ToF distance, `None` when stale or no target
    pub distance_mm: Option<f32>,
    /// Proximity zone
    pub proximity: ProximityState,
    /// Fresh temperature
    pub temperature_c: Option<f32>,
    /// Fresh humidity
    pub humidity_pct: Option<f32>,
    /// Temperature channel state
    pub temperature_state: EnvChannelState,
    /// Humidity channel state
    pub humidity_state: EnvChannelState,
    /// Last accepted GPS position
    pub position: Option<GeoPoint>,
    /// Distance of that position from home
    pub distance_from_home_m: Option<f64>,
    /// Geofence zone
    pub zone: ZoneState,
    /// GPS buffer is stale (position and zone are frozen)
    pub gps_stale: bool,
    /// Time since qualifying motion
    pub no_motion_ms: u64,
}

/// Health of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorStatus {
    /// Fresh data
    Ok,
    /// Fitted but no fresh data
    #[default]
    Stale,
    /// Not fitted on this device
    Disabled,
}

/// Health of every sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorHealth {
    /// IMU
    pub motion: SensorStatus,
    /// ToF
    pub proximity: SensorStatus,
    /// GPS
    pub location: SensorStatus,
    /// Temperature
    pub temperature: SensorStatus,
    /// Humidity
    pub humidity: SensorStatus,
}

/// Status report
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Heartbeat {
    /// Tick time
    pub timestamp: Timestamp,
    /// Time since the first tick
    pub uptime_ms: u64,
    /// Firmware version string
    pub firmware_version: String<MAX_FIRMWARE_VERSION_LEN>,
    /// Per-sensor health
    pub sensors: SensorHealth,
    /// Delivery counters
    pub stats: DispatchStats,
    /// Samples refused by the buffers
    pub rejected_samples: u32,
    /// Telemetry reports that failed to publish
    pub telemetry_failures: u32,
}

/// Activity over one summary period
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivitySummary {
    /// Period start
    pub period_start: Timestamp,
    /// Period end (tick time)
    pub period_end: Timestamp,
    /// Steps in the period
    pub steps: u32,
    /// Walking/running time in the period
    pub active_ms: u64,
    /// Calories in the period
    pub calories_kcal: f32,
    /// Steps since boot
    pub total_steps: u32,
}

/// Which reports are due on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryDue {
    /// Snapshot due
    pub snapshot: bool,
    /// Heartbeat due
    pub heartbeat: bool,
    /// Summary due; carries the period start
    pub summary: Option<Timestamp>,
}

/// Drives the three cadences
#[derive(Debug, Clone)]
pub struct TelemetryScheduler {
    snapshot: Cadence,
    heartbeat: Cadence,
    summary: Option<Cadence>,
    period_start: Option<Timestamp>,
    failures: u32,
}

impl TelemetryScheduler {
    /// Create from validated configuration
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            snapshot: Cadence::immediate(config.snapshot_interval_ms),
            heartbeat: Cadence::immediate(config.heartbeat_interval_ms),
            summary: config.summary_interval_ms.map(Cadence::deferred),
            period_start: None,
            failures: 0,
        }
    }

    /// Poll every cadence
    pub fn poll(&mut self, now: Timestamp) -> TelemetryDue {
        let period_start = *self.period_start.get_or_insert(now);
        let summary = match self.summary.as_mut().map(|cadence| cadence.poll(now)) {
            Some(true) => {
                self.period_start = Some(now);
                Some(period_start)
            }
            _ => None,
        };

        TelemetryDue {
            snapshot: self.snapshot.poll(now),
            heartbeat: self.heartbeat.poll(now),
            summary,
        }
    }

    /// Count a failed report
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Failed reports since boot
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_cadence_fires_first_then_every_interval() {
        let mut c = Cadence::immediate(5_000);
        assert!(c.poll(0));
        assert!(!c.poll(4_999));
        assert!(c.poll(5_000));
        assert!(!c.poll(6_000));
    }

    #[test]
    fn missed_intervals_fire_once() {
        let mut c = Cadence::immediate(1_000);
        assert!(c.poll(0));
        assert!(c.poll(10_000));
        assert!(!c.poll(10_500));
        assert!(c.poll(11_000));
    }

    #[test]
    fn deferred_cadence_waits_one_interval() {
        let mut c = Cadence::deferred(3_600_000);
        assert!(!c.poll(100));
        assert!(!c.poll(3_600_099));
        assert!(c.poll(3_600_100));
    }

    #[test]
    fn summary_reports_period_start() {
        let config = TelemetryConfig {
            snapshot_interval_ms: 10_000,
            heartbeat_interval_ms: 300_000,
            summary_interval_ms: Some(60_000),
        };
        let mut s = TelemetryScheduler::new(&config);

        let first = s.poll(1_000);
        assert!(first.snapshot && first.heartbeat);
        assert_eq!(first.summary, None);

        assert_eq!(s.poll(61_000).summary, Some(1_000));
        assert_eq!(s.poll(121_000).summary, Some(61_000));
    }
}
