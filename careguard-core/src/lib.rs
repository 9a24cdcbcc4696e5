//! Sensor-fusion alert engine for CareGuard monitoring devices
//!
//! Turns raw, noisy, periodically sampled sensor values into debounced,
//! rate-limited safety events: falls, bed exits, geofence breaches,
//! environmental excursions and no-motion timeouts.
//!
//! Designed for the same class of hardware the firmware runs on:
//! - Single cooperative control loop, no threads
//! - No heap allocation (bounded `heapless` containers only)
//! - No reliable wall clock (monotonic millisecond timestamps)
//!
//! ```no_run
//! use careguard_core::{Engine, EngineConfig, Reading, transport::RecordingTransport};
//!
//! let mut engine = Engine::new(EngineConfig::fire_unit()).expect("valid preset");
//! let mut transport = RecordingTransport::default();
//!
//! // Drivers push samples on their own cadence
//! engine.push(Reading::Acceleration(1.02), 1_000, true);
//! engine.push(Reading::Distance(1_200.0), 1_000, true);
//!
//! // The control loop ticks the engine
//! let report = engine.tick(1_000, &mut transport);
//! for alert in report.dispatched.iter() {
//!     // already forwarded to the transport
//!     let _ = alert.kind();
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod logging;

pub mod aggregator;
pub mod alerts;
pub mod buffer;
pub mod calories;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod monitors;
pub mod telemetry;
pub mod time;
pub mod transport;

// Public API
pub use aggregator::{AlertAggregator, DispatchLedger, DispatchStats};
pub use alerts::{AlertKind, AlertPayload, AlertRecord, Severity};
pub use config::EngineConfig;
pub use engine::{Engine, Reading, SensorDriver, SensorId, TickReport, TimedReading};
pub use errors::{ConfigError, ReadingError, TransportError};
pub use monitors::{
    activity::ActivityState,
    environment::EnvChannelState,
    geofence::{GeoPoint, GpsFix, ZoneState},
    proximity::ProximityState,
};
pub use telemetry::StateSnapshot;
pub use time::{TimeSource, Timestamp};
pub use transport::{Notifier, Transport};

/// Crate version, reported in heartbeats
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
