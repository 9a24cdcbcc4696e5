//! Geofence monitor
//!
//! ## Overview
//!
//! Computes the great-circle distance between the latest GPS fix and the
//! configured home anchor and maps it onto three concentric zones:
//!
//! ```text
//!            ┌──────────────── Escaped ────────────────┐
//!            │      ┌──────── Warning ────────┐        │
//!            │      │     ┌── Home ──┐        │        │
//!            │      │     │    ⌂     │        │        │
//!            │      │     └──────────┘        │        │
//!            │      │  d ≥ warning_radius_m   │        │
//!            │      └─────────────────────────┘        │
//!            │            d ≥ escape_radius_m          │
//!            └─────────────────────────────────────────┘
//! ```
//!
//! Boundaries are inclusive: a fix exactly on the warning radius is in the
//! Warning zone.
//!
//! ## Distance
//!
//! Haversine on a sphere with the IUGG mean Earth radius
//! (6 371 008.8 m). At geofence scales (hundreds of metres to a few
//! kilometres) the spherical error is well under the GPS error.
//!
//! ## Lost fix
//!
//! Fixes without satellite lock never reach the buffer. When the buffer goes
//! stale the zone is frozen at its last value: no transition is produced
//! and the snapshot flags the position as stale.

use crate::{
    buffer::SampleBuffer,
    config::GeofenceConfig,
    constants::{
        physics::{LATITUDE_LIMIT_DEG, LONGITUDE_LIMIT_DEG},
        MEAN_EARTH_RADIUS_M,
    },
    errors::{ReadingError, ReadingResult},
    time::Timestamp,
};

use super::{MonitorEvent, Transition};

/// WGS-84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeoPoint {
    /// Latitude, −90..=90
    pub latitude: f64,
    /// Longitude, −180..=180
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and within latitude/longitude bounds
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && libm::fabs(self.latitude) <= LATITUDE_LIMIT_DEG
            && libm::fabs(self.longitude) <= LONGITUDE_LIMIT_DEG
    }
}

/// One GPS receiver report
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsFix {
    /// Reported position
    pub position: GeoPoint,
    /// Satellites used in the solution
    pub satellites: u8,
    /// Receiver reports a valid lock
    pub has_lock: bool,
}

impl GpsFix {
    /// Locked fix at a position
    pub const fn locked(latitude: f64, longitude: f64, satellites: u8) -> Self {
        Self { position: GeoPoint::new(latitude, longitude), satellites, has_lock: true }
    }

    /// Buffer admission check
    pub fn check(fix: &Self) -> ReadingResult<()> {
        if !fix.has_lock {
            return Err(ReadingError::NoFix);
        }
        if !fix.position.is_valid() {
            return Err(ReadingError::InvalidCoordinate {
                latitude: fix.position.latitude,
                longitude: fix.position.longitude,
            });
        }
        Ok(())
    }
}

/// Geofence zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ZoneState {
    /// Inside the warning radius
    Home,
    /// Between the warning and escape radii
    Warning,
    /// At or beyond the escape radius
    Escaped,
    /// No fix yet
    #[default]
    Unknown,
}

impl ZoneState {
    /// Upper-case wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Warning => "WARNING",
            Self::Escaped => "ESCAPED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Great-circle distance in metres
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let s_lat = libm::sin(d_lat / 2.0);
    let s_lon = libm::sin(d_lon / 2.0);
    let h = s_lat * s_lat + libm::cos(lat1) * libm::cos(lat2) * s_lon * s_lon;

    // Rounding can push h marginally above 1 for antipodal points
    2.0 * MEAN_EARTH_RADIUS_M * libm::asin(libm::sqrt(h.min(1.0)))
}

/// Point reached by travelling `distance_m` from `origin` on an initial
/// bearing (degrees clockwise from north)
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let delta = distance_m / MEAN_EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.latitude.to_radians();
    let lambda1 = origin.longitude.to_radians();

    let sin_phi2 = libm::sin(phi1) * libm::cos(delta)
        + libm::cos(phi1) * libm::sin(delta) * libm::cos(theta);
    let phi2 = libm::asin(sin_phi2);
    let lambda2 = lambda1
        + libm::atan2(
            libm::sin(theta) * libm::sin(delta) * libm::cos(phi1),
            libm::cos(delta) - libm::sin(phi1) * sin_phi2,
        );

    GeoPoint::new(phi2.to_degrees(), lambda2.to_degrees())
}

/// Zone state machine around the home anchor
#[derive(Debug, Clone)]
pub struct GeofenceMonitor {
    config: GeofenceConfig,
    committed: ZoneState,
    last_distance_m: Option<f64>,
    last_position: Option<GeoPoint>,
}

impl GeofenceMonitor {
    /// Create from validated configuration
    pub fn new(config: &GeofenceConfig) -> Self {
        Self {
            config: *config,
            committed: ZoneState::Unknown,
            last_distance_m: None,
            last_position: None,
        }
    }

    /// Zone for a distance from home
    pub fn zone_for(&self, distance_m: f64) -> ZoneState {
        if distance_m >= self.config.escape_radius_m {
            ZoneState::Escaped
        } else if distance_m >= self.config.warning_radius_m {
            ZoneState::Warning
        } else {
            ZoneState::Home
        }
    }

    /// Evaluate the GPS buffer on a tick
    pub fn evaluate(&mut self, buffer: &SampleBuffer<GpsFix>, now: Timestamp) -> Option<MonitorEvent> {
        let fix = buffer.fresh(now)?.value;

        let distance_m = haversine_m(self.config.home, fix.position);
        self.last_distance_m = Some(distance_m);
        self.last_position = Some(fix.position);

        let zone = self.zone_for(distance_m);
        if zone == self.committed {
            return None;
        }

        let transition = Transition::new(self.committed, zone, now);
        self.committed = zone;
        cg_info!("geofence {:?} -> {:?} at {} m", transition.from, transition.to, distance_m);
        Some(MonitorEvent::Geofence { transition, distance_m, position: fix.position })
    }

    /// Distance and position while Escaped on a fresh fix
    ///
    /// The escape condition keeps asking for attention on every tick; the
    /// aggregator throttles how often it actually goes out. A stale fix
    /// freezes the zone and silences the repeat until a fresh fix arrives.
    pub fn escape_ongoing(&self, buffer: &SampleBuffer<GpsFix>, now: Timestamp) -> Option<(f64, GeoPoint)> {
        if self.committed != ZoneState::Escaped {
            return None;
        }
        buffer.fresh(now)?;
        Some((self.last_distance_m?, self.last_position?))
    }

    /// Committed zone
    pub fn state(&self) -> ZoneState {
        self.committed
    }

    /// Distance computed from the most recent fresh fix
    pub fn last_distance_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    /// Configured home anchor
    pub fn home(&self) -> GeoPoint {
        self.config.home
    }
}
