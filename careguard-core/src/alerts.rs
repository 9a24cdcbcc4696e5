//! Alert records and the transition → alert mapping
//!
//! ## Severity
//!
//! The four levels carry the numeric wire levels the firmware has always
//! used (`Info = 0` .. `Emergency = 3`) and order naturally, so policy floors
//! are plain comparisons.
//!
//! ## Mapping
//!
//! Every monitor transition turns into at most two [`Signal`]s: one that
//! clears the condition being left and one that raises the condition being
//! entered.
//!
//! | Transition | Kind | Severity |
//! |------------|------|----------|
//! | Activity → Falling | `Fall` | Emergency |
//! | Activity, other changes | `ActivityChange` | Info |
//! | Proximity → Near | `ProximityNear` | Caution |
//! | Proximity → BedExit | `BedExit` | Caution |
//! | Geofence → Warning | `GeofenceWarning` | Caution |
//! | Geofence → Escaped | `GeofenceEscape` | Emergency |
//! | Geofence → Home | `GeofenceReturn` | Info |
//! | Temperature/Humidity out of band | `TemperatureHigh` .. `HumidityLow` | Warning |
//! | Channel back in band | `EnvironmentNormal` | Info |
//! | Watchdog timeout | `NoMotion` | Warning |
//! | Watchdog re-armed | `MotionResumed` | Info |
//! | Any monitor → Unknown | `SensorStale` | Info |

use heapless::Vec;

use crate::{
    engine::SensorId,
    monitors::{
        activity::ActivityState,
        environment::{EnvChannel, EnvChannelState},
        geofence::{GeoPoint, ZoneState},
        proximity::ProximityState,
        watchdog::WatchdogEvent,
        MonitorEvent,
    },
    time::Timestamp,
};

/// Alert severity, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Severity {
    /// Informational
    Info = 0,
    /// Worth a look
    Caution = 1,
    /// Needs attention
    Warning = 2,
    /// Needs immediate attention
    Emergency = 3,
}

impl Severity {
    /// Numeric wire level
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Lower-case name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Caution => "caution",
            Self::Warning => "warning",
            Self::Emergency => "emergency",
        }
    }
}

/// Alert kind; one ledger entry each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertKind {
    /// Impact latched as a fall
    Fall,
    /// Committed activity changed
    ActivityChange,
    /// Someone close to the device
    ProximityNear,
    /// Person left the bed/chair
    BedExit,
    /// Outside the warning radius
    GeofenceWarning,
    /// Outside the escape radius
    GeofenceEscape,
    /// Back inside the warning radius
    GeofenceReturn,
    /// Temperature above band
    TemperatureHigh,
    /// Temperature below band
    TemperatureLow,
    /// Humidity above band
    HumidityHigh,
    /// Humidity below band
    HumidityLow,
    /// A channel returned to its band
    EnvironmentNormal,
    /// No qualifying motion for the timeout
    NoMotion,
    /// Motion seen again after a timeout
    MotionResumed,
    /// A sensor stopped delivering fresh data
    SensorStale,
}

impl AlertKind {
    /// Number of kinds
    pub const COUNT: usize = 15;

    /// Every kind, in ledger order
    pub const ALL: [AlertKind; Self::COUNT] = [
        Self::Fall,
        Self::ActivityChange,
        Self::ProximityNear,
        Self::BedExit,
        Self::GeofenceWarning,
        Self::GeofenceEscape,
        Self::GeofenceReturn,
        Self::TemperatureHigh,
        Self::TemperatureLow,
        Self::HumidityHigh,
        Self::HumidityLow,
        Self::EnvironmentNormal,
        Self::NoMotion,
        Self::MotionResumed,
        Self::SensorStale,
    ];

    /// Ledger slot
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case wire name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fall => "fall",
            Self::ActivityChange => "activity_change",
            Self::ProximityNear => "proximity_near",
            Self::BedExit => "bed_exit",
            Self::GeofenceWarning => "geofence_warning",
            Self::GeofenceEscape => "geofence_escape",
            Self::GeofenceReturn => "geofence_return",
            Self::TemperatureHigh => "temperature_high",
            Self::TemperatureLow => "temperature_low",
            Self::HumidityHigh => "humidity_high",
            Self::HumidityLow => "humidity_low",
            Self::EnvironmentNormal => "environment_normal",
            Self::NoMotion => "no_motion",
            Self::MotionResumed => "motion_resumed",
            Self::SensorStale => "sensor_stale",
        }
    }
}

/// Numbers attached to an alert
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertPayload {
    /// Nothing to add
    None,
    /// Impact deviation (g)
    Impact {
        /// Peak deviation from 1 g
        magnitude_g: f32,
    },
    /// ToF distance
    Proximity {
        /// Distance, `None` when no target
        distance_mm: Option<f32>,
    },
    /// GPS position and distance from home
    Location {
        /// Distance from home (m)
        distance_m: f64,
        /// Fix position
        position: GeoPoint,
    },
    /// Environmental reading
    Reading {
        /// Channel
        channel: EnvChannel,
        /// Value, `None` when stale
        value: Option<f32>,
    },
    /// Inactivity duration
    Inactivity {
        /// Silence (ms)
        elapsed_ms: u64,
    },
    /// Activity change
    Activity {
        /// Previous state
        from: ActivityState,
        /// New state
        to: ActivityState,
    },
    /// Sensor that went stale
    Sensor {
        /// Which one
        sensor: SensorId,
    },
}

/// Immutable alert record
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertRecord {
    kind: AlertKind,
    severity: Severity,
    raised_at_ms: Timestamp,
    payload: AlertPayload,
}

impl AlertRecord {
    /// Create a record
    pub const fn new(kind: AlertKind, severity: Severity, raised_at_ms: Timestamp, payload: AlertPayload) -> Self {
        Self { kind, severity, raised_at_ms, payload }
    }

    /// Kind
    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    /// Severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Tick at which it was raised
    pub fn raised_at_ms(&self) -> Timestamp {
        self.raised_at_ms
    }

    /// Attached numbers
    pub fn payload(&self) -> &AlertPayload {
        &self.payload
    }

    /// Coordinates, when the payload has a position
    pub fn position(&self) -> Option<GeoPoint> {
        match self.payload {
            AlertPayload::Location { position, .. } => Some(position),
            _ => None,
        }
    }
}

/// What a signal does to its condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Condition entered
    Raised,
    /// Condition left
    Cleared,
    /// Condition still holds and wants re-notification
    Ongoing,
}

/// Aggregator input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    /// Raised, cleared or ongoing
    pub phase: Phase,
    /// The record
    pub record: AlertRecord,
}

impl Signal {
    fn raised(kind: AlertKind, severity: Severity, at: Timestamp, payload: AlertPayload) -> Self {
        Self { phase: Phase::Raised, record: AlertRecord::new(kind, severity, at, payload) }
    }

    fn cleared(kind: AlertKind, at: Timestamp) -> Self {
        Self {
            phase: Phase::Cleared,
            record: AlertRecord::new(kind, Severity::Info, at, AlertPayload::None),
        }
    }

    /// Repeat obligation for an escaped geofence
    pub fn escape_ongoing(distance_m: f64, position: GeoPoint, at: Timestamp) -> Self {
        Self {
            phase: Phase::Ongoing,
            record: AlertRecord::new(
                AlertKind::GeofenceEscape,
                Severity::Emergency,
                at,
                AlertPayload::Location { distance_m, position },
            ),
        }
    }

    /// Repeat obligation for a latched fall
    pub fn fall_ongoing(magnitude_g: f32, at: Timestamp) -> Self {
        Self {
            phase: Phase::Ongoing,
            record: AlertRecord::new(AlertKind::Fall, Severity::Emergency, at, AlertPayload::Impact { magnitude_g }),
        }
    }
}

/// Signals produced by one transition
pub type Signals = Vec<Signal, 2>;

/// Map a monitor event onto clear/raise signals
pub fn signals_for(event: &MonitorEvent) -> Signals {
    let mut out = Signals::new();
    let mut emit = |signal: Signal| {
        // At most one clear and one raise per transition
        let _ = out.push(signal);
    };

    match *event {
        MonitorEvent::Activity { transition: t, magnitude_g } => {
            if t.from == ActivityState::Falling {
                emit(Signal::cleared(AlertKind::Fall, t.at));
            }
            match t.to {
                ActivityState::Falling => emit(Signal::raised(
                    AlertKind::Fall,
                    Severity::Emergency,
                    t.at,
                    AlertPayload::Impact { magnitude_g },
                )),
                ActivityState::Unknown => emit(stale(SensorId::Motion, t.at)),
                to => emit(Signal::raised(
                    AlertKind::ActivityChange,
                    Severity::Info,
                    t.at,
                    AlertPayload::Activity { from: t.from, to },
                )),
            }
        }

        MonitorEvent::Proximity { transition: t, distance_mm } => {
            match t.from {
                ProximityState::Near => emit(Signal::cleared(AlertKind::ProximityNear, t.at)),
                ProximityState::BedExit => emit(Signal::cleared(AlertKind::BedExit, t.at)),
                _ => {}
            }
            let payload = AlertPayload::Proximity { distance_mm };
            match t.to {
                ProximityState::Near => emit(Signal::raised(AlertKind::ProximityNear, Severity::Caution, t.at, payload)),
                ProximityState::BedExit => emit(Signal::raised(AlertKind::BedExit, Severity::Caution, t.at, payload)),
                ProximityState::Unknown => emit(stale(SensorId::Proximity, t.at)),
                ProximityState::Far => {}
            }
        }

        MonitorEvent::Geofence { transition: t, distance_m, position } => {
            match t.from {
                ZoneState::Warning => emit(Signal::cleared(AlertKind::GeofenceWarning, t.at)),
                ZoneState::Escaped => emit(Signal::cleared(AlertKind::GeofenceEscape, t.at)),
                _ => {}
            }
            let payload = AlertPayload::Location { distance_m, position };
            match t.to {
                ZoneState::Home => emit(Signal::raised(AlertKind::GeofenceReturn, Severity::Info, t.at, payload)),
                ZoneState::Warning => emit(Signal::raised(AlertKind::GeofenceWarning, Severity::Caution, t.at, payload)),
                ZoneState::Escaped => emit(Signal::raised(AlertKind::GeofenceEscape, Severity::Emergency, t.at, payload)),
                ZoneState::Unknown => emit(stale(SensorId::Location, t.at)),
            }
        }

        MonitorEvent::Environment { channel, transition: t, value } => {
            if let Some(kind) = excursion_kind(channel, t.from) {
                emit(Signal::cleared(kind, t.at));
            }
            let payload = AlertPayload::Reading { channel, value };
            match t.to {
                EnvChannelState::InRange => {
                    emit(Signal::raised(AlertKind::EnvironmentNormal, Severity::Info, t.at, payload))
                }
                EnvChannelState::Unknown => emit(stale(channel.into(), t.at)),
                excursion => {
                    if let Some(kind) = excursion_kind(channel, excursion) {
                        emit(Signal::raised(kind, Severity::Warning, t.at, payload));
                    }
                }
            }
        }

        MonitorEvent::Watchdog(WatchdogEvent::Timeout { elapsed_ms, at }) => {
            emit(Signal::raised(AlertKind::NoMotion, Severity::Warning, at, AlertPayload::Inactivity { elapsed_ms }));
        }

        MonitorEvent::Watchdog(WatchdogEvent::MotionResumed { silent_ms, at }) => {
            emit(Signal::cleared(AlertKind::NoMotion, at));
            emit(Signal::raised(
                AlertKind::MotionResumed,
                Severity::Info,
                at,
                AlertPayload::Inactivity { elapsed_ms: silent_ms },
            ));
        }
    }

    out
}

fn stale(sensor: SensorId, at: Timestamp) -> Signal {
    Signal::raised(AlertKind::SensorStale, Severity::Info, at, AlertPayload::Sensor { sensor })
}

fn excursion_kind(channel: EnvChannel, state: EnvChannelState) -> Option<AlertKind> {
    match (channel, state) {
        (EnvChannel::Temperature, EnvChannelState::TooHigh) => Some(AlertKind::TemperatureHigh),
        (EnvChannel::Temperature, EnvChannelState::TooLow) => Some(AlertKind::TemperatureLow),
        (EnvChannel::Humidity, EnvChannelState::TooHigh) => Some(AlertKind::HumidityHigh),
        (EnvChannel::Humidity, EnvChannelState::TooLow) => Some(AlertKind::HumidityLow),
        _ => None,
    }
}
