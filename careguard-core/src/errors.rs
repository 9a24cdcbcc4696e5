//! Error types for the alert engine
//!
//! ## Design
//!
//! The error system follows the constraints of the devices the engine runs on:
//!
//! 1. **Small Size**: every variant is a handful of scalars, no `String`, only
//!    `&'static str` for names, so errors can be returned from the tick path.
//!
//! 2. **Copy Semantics**: errors are `Copy` and cheap to pass around.
//!
//! 3. **Clear Severity**: only [`ConfigError`] is fatal. Everything else is
//!    handled locally and counted.
//!
//! ## Error Categories
//!
//! | Category | Type | Handling |
//! |----------|------|----------|
//! | Stale input | (no error, monitor reports `Unknown`) | local |
//! | Invalid reading | [`ReadingError`] | dropped, buffer keeps last valid value |
//! | Dispatch failure | [`TransportError`] | logged, counted, never retried |
//! | Configuration | [`ConfigError`] | fatal, engine refuses to start |
//!
//! ```rust
//! use careguard_core::{Engine, EngineConfig, ConfigError};
//!
//! let mut config = EngineConfig::pet_tracker();
//! config.geofence.warning_radius_m = 2_000.0; // beyond the escape radius
//!
//! match Engine::new(config) {
//!     Err(ConfigError::ThresholdOrder { lower_name, .. }) => {
//!         assert_eq!(lower_name, "geofence.warning_radius_m");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for sample ingestion
pub type ReadingResult<T> = Result<T, ReadingError>;

/// Configuration contradictions detected at startup
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Two thresholds that must be strictly ordered are not
    #[error("{lower_name} ({lower}) must be below {upper_name} ({upper})")]
    ThresholdOrder {
        /// Name of the threshold that must be smaller
        lower_name: &'static str,
        /// Its configured value
        lower: f32,
        /// Name of the threshold that must be larger
        upper_name: &'static str,
        /// Its configured value
        upper: f32,
    },

    /// An interval or duration that must be positive is zero
    #[error("{name} must be greater than zero")]
    ZeroInterval {
        /// Name of the interval
        name: &'static str,
    },

    /// A value is non-finite or outside what the component can handle
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Name of the setting
        name: &'static str,
        /// The offending value
        value: f32,
    },

    /// Home anchor is not a position on Earth
    #[error("Home position ({latitude}, {longitude}) is not a valid coordinate")]
    InvalidHome {
        /// Configured latitude
        latitude: f64,
        /// Configured longitude
        longitude: f64,
    },

    /// Device identifier does not fit the inline buffer
    #[error("Device id longer than {max} bytes")]
    DeviceIdTooLong {
        /// Maximum accepted length
        max: usize,
    },

    /// Too many per-kind re-notify overrides
    #[error("At most {max} re-notify overrides are supported")]
    TooManyOverrides {
        /// Maximum number of overrides
        max: usize,
    },
}

/// Reasons a raw sample is refused by its buffer
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ReadingError {
    /// NaN or infinity
    #[error("Invalid value: not a valid number")]
    NotFinite,

    /// Value cannot physically come from this sensor
    #[error("Value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// The reported value
        value: f32,
        /// Smallest plausible value
        min: f32,
        /// Largest plausible value
        max: f32,
    },

    /// GPS fix reported without satellite lock
    #[error("GPS fix without satellite lock")]
    NoFix,

    /// Coordinate outside latitude/longitude bounds
    #[error("Coordinate ({latitude}, {longitude}) out of bounds")]
    InvalidCoordinate {
        /// Reported latitude
        latitude: f64,
        /// Reported longitude
        longitude: f64,
    },

    /// Driver flagged the sample as invalid
    #[error("Sample flagged invalid by driver")]
    Flagged,

    /// Sample is older than the one already buffered
    #[error("Sample at {timestamp} older than buffered sample at {latest}")]
    OutOfOrder {
        /// Timestamp of the refused sample
        timestamp: u64,
        /// Timestamp of the buffered sample
        latest: u64,
    },

    /// Sensor is not fitted on this device variant
    #[error("Sensor disabled in this device profile")]
    SensorDisabled,
}

/// Delivery failures reported by transport or notifier collaborators
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Link is down
    #[error("Not connected")]
    NotConnected,

    /// Outgoing buffer is full
    #[error("Buffer full")]
    BufferFull,

    /// Peer did not answer in time
    #[error("Timeout")]
    Timeout,

    /// Peer refused the message
    #[error("Rejected: {reason}")]
    Rejected {
        /// Short reason from the collaborator
        reason: &'static str,
    },

    /// Message could not be encoded
    #[error("Encoding failed")]
    Encoding,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ThresholdOrder { lower_name, lower, upper_name, upper } =>
                defmt::write!(fmt, "{} ({}) must be below {} ({})", lower_name, lower, upper_name, upper),
            Self::ZeroInterval { name } =>
                defmt::write!(fmt, "{} must be > 0", name),
            Self::InvalidValue { name, value } =>
                defmt::write!(fmt, "Invalid {}: {}", name, value),
            Self::InvalidHome { latitude, longitude } =>
                defmt::write!(fmt, "Invalid home ({}, {})", latitude, longitude),
            Self::DeviceIdTooLong { max } =>
                defmt::write!(fmt, "Device id > {} bytes", max),
            Self::TooManyOverrides { max } =>
                defmt::write!(fmt, "More than {} overrides", max),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadingError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotFinite => defmt::write!(fmt, "Not finite"),
            Self::OutOfRange { value, min, max } =>
                defmt::write!(fmt, "Value {} outside [{}, {}]", value, min, max),
            Self::NoFix => defmt::write!(fmt, "No GPS fix"),
            Self::InvalidCoordinate { latitude, longitude } =>
                defmt::write!(fmt, "Bad coordinate ({}, {})", latitude, longitude),
            Self::Flagged => defmt::write!(fmt, "Flagged invalid"),
            Self::OutOfOrder { timestamp, latest } =>
                defmt::write!(fmt, "Sample {} older than {}", timestamp, latest),
            Self::SensorDisabled => defmt::write!(fmt, "Sensor disabled"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotConnected => defmt::write!(fmt, "Not connected"),
            Self::BufferFull => defmt::write!(fmt, "Buffer full"),
            Self::Timeout => defmt::write!(fmt, "Timeout"),
            Self::Rejected { reason } => defmt::write!(fmt, "Rejected: {}", reason),
            Self::Encoding => defmt::write!(fmt, "Encoding failed"),
        }
    }
}
