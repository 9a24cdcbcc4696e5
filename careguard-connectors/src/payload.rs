//! JSON wire messages
//!
//! Field names follow what the backends already parse: alerts carry
//! `level` (0 Info .. 3 Emergency), `type` and a human-readable `message`;
//! zone strings are upper-case (`FAR`, `BED_EXIT`, `ESCAPED`).

use careguard_core::{
    alerts::{AlertKind, AlertPayload},
    telemetry::{ActivitySummary, Heartbeat},
    AlertRecord, StateSnapshot, Timestamp,
};
use serde::Serialize;

/// Message on the alert topic
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage<'a> {
    /// Reporting device
    pub device_id: &'a str,
    /// Numeric severity, 0 Info .. 3 Emergency
    pub level: u8,
    /// Severity name
    pub severity: &'static str,
    /// Alert kind name, serialized as `type`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Human-readable text
    pub message: String,
    /// Device time the alert was raised (ms)
    pub timestamp: Timestamp,
    /// Fix latitude for location alerts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Fix longitude for location alerts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Kind-specific detail
    pub data: AlertPayload,
}

impl<'a> AlertMessage<'a> {
    /// Encode one alert record
    pub fn new(device_id: &'a str, record: &AlertRecord) -> Self {
        let position = record.position();
        Self {
            device_id,
            level: record.severity().level(),
            severity: record.severity().as_str(),
            kind: record.kind().name(),
            message: alert_text(record),
            timestamp: record.raised_at_ms(),
            latitude: position.map(|p| p.latitude),
            longitude: position.map(|p| p.longitude),
            data: *record.payload(),
        }
    }
}

/// One-line description of an alert for people
pub fn alert_text(record: &AlertRecord) -> String {
    let payload = *record.payload();
    match (record.kind(), payload) {
        (AlertKind::Fall, AlertPayload::Impact { magnitude_g }) => {
            format!("Fall detected (impact {:.1} g)", magnitude_g)
        }
        (AlertKind::Fall, _) => "Fall detected".into(),
        (AlertKind::ActivityChange, AlertPayload::Activity { from, to }) => {
            format!("Activity changed: {} -> {}", from.as_str(), to.as_str())
        }
        (AlertKind::ActivityChange, _) => "Activity changed".into(),
        (AlertKind::ProximityNear, _) => "Someone is close to the device".into(),
        (AlertKind::BedExit, _) => "Bed exit detected".into(),
        (AlertKind::GeofenceWarning, AlertPayload::Location { distance_m, .. }) => {
            format!("Left the home area ({:.0} m from home)", distance_m)
        }
        (AlertKind::GeofenceEscape, AlertPayload::Location { distance_m, .. }) => {
            format!("Escape alert: {:.0} m from home", distance_m)
        }
        (AlertKind::GeofenceReturn, _) => "Back inside the home area".into(),
        (AlertKind::GeofenceWarning, _) => "Left the home area".into(),
        (AlertKind::GeofenceEscape, _) => "Escape alert".into(),
        (kind @ (AlertKind::TemperatureHigh | AlertKind::TemperatureLow), AlertPayload::Reading { value: Some(v), .. }) => {
            let dir = if kind == AlertKind::TemperatureHigh { "High" } else { "Low" };
            format!("{} temperature: {:.1}°C", dir, v)
        }
        (kind @ (AlertKind::HumidityHigh | AlertKind::HumidityLow), AlertPayload::Reading { value: Some(v), .. }) => {
            let dir = if kind == AlertKind::HumidityHigh { "High" } else { "Low" };
            format!("{} humidity: {:.1}%", dir, v)
        }
        (AlertKind::TemperatureHigh, _) => "High temperature".into(),
        (AlertKind::TemperatureLow, _) => "Low temperature".into(),
        (AlertKind::HumidityHigh, _) => "High humidity".into(),
        (AlertKind::HumidityLow, _) => "Low humidity".into(),
        (AlertKind::EnvironmentNormal, AlertPayload::Reading { channel, .. }) => {
            format!("{} back to normal", channel.as_str())
        }
        (AlertKind::EnvironmentNormal, _) => "Environment back to normal".into(),
        (AlertKind::NoMotion, AlertPayload::Inactivity { elapsed_ms }) => {
            format!("No motion for {} min", elapsed_ms / 60_000)
        }
        (AlertKind::NoMotion, _) => "No motion detected".into(),
        (AlertKind::MotionResumed, AlertPayload::Inactivity { elapsed_ms }) => {
            format!("Motion resumed after {} min", elapsed_ms / 60_000)
        }
        (AlertKind::MotionResumed, _) => "Motion resumed".into(),
        (AlertKind::SensorStale, AlertPayload::Sensor { sensor }) => {
            format!("{} sensor stopped reporting", sensor.as_str())
        }
        (AlertKind::SensorStale, _) => "Sensor stopped reporting".into(),
    }
}

/// Motion part of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ImuSection {
    /// Committed activity state
    pub activity: &'static str,
    /// Steps since boot
    pub steps: u32,
    /// A fall is latched
    pub fall_detected: bool,
    /// Calories for the current summary period (kcal)
    pub calories: f32,
}

/// Distance part of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct TofSection {
    /// Latest distance (mm)
    pub distance: Option<f32>,
    /// Proximity zone
    pub zone: &'static str,
}

/// Temperature and humidity part of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentSection {
    /// Latest temperature (°C)
    pub temperature: Option<f32>,
    /// Latest relative humidity (%)
    pub humidity: Option<f32>,
    /// Temperature band state
    pub temperature_state: &'static str,
    /// Humidity band state
    pub humidity_state: &'static str,
}

/// Position part of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct GpsSection {
    /// Last fix latitude
    pub latitude: Option<f64>,
    /// Last fix longitude
    pub longitude: Option<f64>,
    /// Distance from home (m)
    pub distance_from_home: Option<f64>,
    /// Geofence zone
    pub zone: &'static str,
    /// The fix is older than three read intervals
    pub stale: bool,
}

/// Message on the data topic
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMessage<'a> {
    /// Reporting device
    pub device_id: &'a str,
    /// Device time of the snapshot (ms)
    pub timestamp: Timestamp,
    pub imu: ImuSection,
    pub tof: TofSection,
    pub environment: EnvironmentSection,
    pub gps: GpsSection,
    /// Time since qualifying motion (ms)
    pub no_motion_ms: u64,
}

impl<'a> SnapshotMessage<'a> {
    /// Flatten a snapshot into backend sections
    pub fn new(device_id: &'a str, s: &StateSnapshot, timestamp: Timestamp) -> Self {
        Self {
            device_id,
            timestamp,
            imu: ImuSection {
                activity: s.activity.as_str(),
                steps: s.steps,
                fall_detected: s.fall_detected,
                calories: s.calories_kcal,
            },
            tof: TofSection { distance: s.distance_mm, zone: s.proximity.as_str() },
            environment: EnvironmentSection {
                temperature: s.temperature_c,
                humidity: s.humidity_pct,
                temperature_state: s.temperature_state.as_str(),
                humidity_state: s.humidity_state.as_str(),
            },
            gps: GpsSection {
                latitude: s.position.map(|p| p.latitude),
                longitude: s.position.map(|p| p.longitude),
                distance_from_home: s.distance_from_home_m,
                zone: s.zone.as_str(),
                stale: s.gps_stale,
            },
            no_motion_ms: s.no_motion_ms,
        }
    }
}

/// Message on the location topic
#[derive(Debug, Clone, Serialize)]
pub struct LocationMessage<'a> {
    /// Reporting device
    pub device_id: &'a str,
    /// Device time of the snapshot (ms)
    pub timestamp: Timestamp,
    pub latitude: f64,
    pub longitude: f64,
    /// Distance from home (m)
    pub distance_from_home: Option<f64>,
    /// Geofence zone
    pub zone: &'static str,
}

impl<'a> LocationMessage<'a> {
    /// Only for a fresh fix
    pub fn from_snapshot(device_id: &'a str, s: &StateSnapshot, timestamp: Timestamp) -> Option<Self> {
        if s.gps_stale {
            return None;
        }
        let position = s.position?;
        Some(Self {
            device_id,
            timestamp,
            latitude: position.latitude,
            longitude: position.longitude,
            distance_from_home: s.distance_from_home_m,
            zone: s.zone.as_str(),
        })
    }
}

/// Message on the status topic
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage<'a> {
    /// Reporting device
    pub device_id: &'a str,
    /// Always `online`; the last-will carries `offline`
    pub status: &'static str,
    #[serde(flatten)]
    pub heartbeat: &'a Heartbeat,
}

impl<'a> StatusMessage<'a> {
    pub fn new(device_id: &'a str, heartbeat: &'a Heartbeat) -> Self {
        Self { device_id, status: "online", heartbeat }
    }
}

/// Message on the summary topic
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMessage<'a> {
    /// Reporting device
    pub device_id: &'a str,
    #[serde(flatten)]
    pub summary: &'a ActivitySummary,
}

impl<'a> SummaryMessage<'a> {
    pub fn new(device_id: &'a str, summary: &'a ActivitySummary) -> Self {
        Self { device_id, summary }
    }
}
