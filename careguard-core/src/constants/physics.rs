//! Physical Constants and Plausibility Limits
//!
//! Readings outside these limits cannot come from a working sensor and are
//! dropped before they reach a monitor.

// ===== MOTION =====

/// Resting acceleration magnitude (g).
///
/// A device lying still measures exactly gravity. Activity is classified on
/// the deviation from this baseline.
pub const STANDARD_GRAVITY_G: f32 = 1.0;

/// Largest magnitude the IMU can report (g).
///
/// MPU6886 (M5Stack Fire, M5StickC Plus2) full-scale range is ±16 g.
pub const ACCEL_SENSOR_MAX_G: f32 = 16.0;

// ===== PROXIMITY =====

/// Smallest distance the ToF sensor reports (mm).
pub const DISTANCE_SENSOR_MIN_MM: f32 = 0.0;

// ===== ENVIRONMENT =====

/// SHT4x operating range, lower bound (°C).
///
/// Source: Sensirion SHT40 datasheet
pub const TEMP_SENSOR_MIN_C: f32 = -40.0;

/// SHT4x operating range, upper bound (°C).
pub const TEMP_SENSOR_MAX_C: f32 = 125.0;

/// Relative humidity lower bound (%).
pub const HUMIDITY_SENSOR_MIN_PCT: f32 = 0.0;

/// Relative humidity upper bound (%).
pub const HUMIDITY_SENSOR_MAX_PCT: f32 = 100.0;

// ===== GEODESY =====

/// Mean Earth radius (m), IUGG value.
///
/// Used by the haversine distance. The spherical model is off by at most
/// ~0.5% against WGS-84, far below GPS noise at geofence radii.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Valid latitude range (degrees).
pub const LATITUDE_LIMIT_DEG: f64 = 90.0;

/// Valid longitude range (degrees).
pub const LONGITUDE_LIMIT_DEG: f64 = 180.0;
