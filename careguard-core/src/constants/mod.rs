//! Constants for CareGuard Core
//!
//! Every numeric default used by the engine lives here, next to a note on
//! where it came from. Device presets in [`crate::config`] are assembled from
//! the profile modules.
//!
//! ## Organization
//!
//! - **Physics**: gravity baseline, Earth radius, plausible sensor ranges
//! - **Time**: unit conversions and the staleness rule
//! - **Eldercare**: room monitor (IMU + ToF + ENV)
//! - **Fire unit**: multi-sensor unit (IMU + ToF + ENV + GPS)
//! - **Pet tracker**: GPS/activity collar tuned for a small dog
//!
//! ## Usage Guidelines
//!
//! 1. Use these constants instead of magic numbers
//! 2. Include units in the name
//! 3. Keep profile values identical to what the matching firmware ships

/// Physical constants and plausibility limits.
pub mod physics;

/// Time unit conversions and staleness rule.
pub mod time;

/// Eldercare room monitor profile.
pub mod eldercare;

/// Multi-sensor fire unit profile.
pub mod fire_unit;

/// Pet GPS/activity tracker profile.
pub mod pet_tracker;

// ===== ENGINE LIMITS =====

/// Capacity of the activity classifier's rolling window (samples).
///
/// At the fastest IMU cadence (50 ms) this covers 1.6 s, enough for one
/// full gait cycle of a walking person or a trotting small dog.
pub const ACTIVITY_WINDOW_CAPACITY: usize = 32;

/// Maximum monitor events produced in a single tick.
///
/// motion + proximity + geofence + two environment channels + watchdog,
/// plus one deferred fall acknowledgment.
pub const MAX_EVENTS_PER_TICK: usize = 8;

/// Maximum alert signals handled by the aggregator in a single tick.
///
/// Each event maps to at most two signals (clear + raise), plus one
/// ongoing signal per repeating condition.
pub const MAX_SIGNALS_PER_TICK: usize = 2 * MAX_EVENTS_PER_TICK + 2;

/// Maximum per-kind re-notify overrides in an alert policy.
pub const MAX_RENOTIFY_OVERRIDES: usize = 8;

/// Maximum device id length (bytes).
pub const MAX_DEVICE_ID_LEN: usize = 32;

/// Maximum firmware version string length (bytes).
pub const MAX_FIRMWARE_VERSION_LEN: usize = 16;

/// Maximum readings drained from a driver in one `poll_driver` call.
pub const MAX_DRIVER_DRAIN: usize = 16;

// Re-export commonly used constants for convenience
pub use physics::{STANDARD_GRAVITY_G, MEAN_EARTH_RADIUS_M};
pub use time::{MS_PER_SECOND, MS_PER_MINUTE, MS_PER_HOUR, MS_PER_DAY, STALE_INTERVAL_FACTOR};
