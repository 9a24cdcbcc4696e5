//! Per-sensor state machines
//!
//! Every monitor owns its state and changes it only through its own
//! transition rules. On each tick a monitor reads its buffer and emits at
//! most one [`MonitorEvent`] (the environmental monitor at most one per
//! channel). Events carry the committed transition plus the numbers the
//! alert payload needs.
//!
//! | Monitor | Input | States |
//! |---------|-------|--------|
//! | [`activity::ActivityClassifier`] | acceleration magnitude (g) | Resting, Walking, Running, Falling, Trembling, Unknown |
//! | [`proximity::ProximityMonitor`] | distance (mm) | Near, Far, BedExit, Unknown |
//! | [`geofence::GeofenceMonitor`] | GPS fix | Home, Warning, Escaped, Unknown |
//! | [`environment::EnvironmentalMonitor`] | temperature, humidity | InRange, TooHigh, TooLow, Unknown |
//! | [`watchdog::NoMotionWatchdog`] | committed activity | armed / fired |

pub mod activity;
pub mod environment;
pub mod geofence;
pub mod proximity;
pub mod watchdog;

use crate::time::Timestamp;

use self::{
    activity::ActivityState,
    environment::{EnvChannel, EnvChannelState},
    geofence::{GeoPoint, ZoneState},
    proximity::ProximityState,
    watchdog::WatchdogEvent,
};

/// Committed state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition<S> {
    /// State before the change
    pub from: S,
    /// State after the change
    pub to: S,
    /// Tick at which the change was committed
    pub at: Timestamp,
}

impl<S: Copy> Transition<S> {
    /// Create a transition
    pub const fn new(from: S, to: S, at: Timestamp) -> Self {
        Self { from, to, at }
    }
}

/// Output of one monitor evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorEvent {
    /// Activity state committed a change
    Activity {
        /// The change
        transition: Transition<ActivityState>,
        /// Deviation that drove it (peak impact for falls)
        magnitude_g: f32,
    },
    /// Proximity state committed a change
    Proximity {
        /// The change
        transition: Transition<ProximityState>,
        /// Latest distance, `None` when no target or stale
        distance_mm: Option<f32>,
    },
    /// Geofence zone changed
    Geofence {
        /// The change
        transition: Transition<ZoneState>,
        /// Distance from home
        distance_m: f64,
        /// Fix that produced it
        position: GeoPoint,
    },
    /// One environmental channel changed
    Environment {
        /// Temperature or humidity
        channel: EnvChannel,
        /// The change
        transition: Transition<EnvChannelState>,
        /// Latest value, `None` when stale
        value: Option<f32>,
    },
    /// No-motion watchdog fired or re-armed
    Watchdog(WatchdogEvent),
}

impl MonitorEvent {
    /// Tick at which the event was produced
    pub fn at(&self) -> Timestamp {
        match self {
            Self::Activity { transition, .. } => transition.at,
            Self::Proximity { transition, .. } => transition.at,
            Self::Geofence { transition, .. } => transition.at,
            Self::Environment { transition, .. } => transition.at,
            Self::Watchdog(event) => event.at(),
        }
    }
}
