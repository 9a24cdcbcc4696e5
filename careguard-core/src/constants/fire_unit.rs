//! Multi-Sensor Fire Unit Profile
//!
//! M5Stack Fire carrying every sensor: IMU, ToF4M, ENV.4 and a GPS module.

/// Device identifier.
pub const DEVICE_ID: &str = "M5_FIRE_ALL_SENSORS";

/// Firmware version reported in heartbeats.
pub const FIRMWARE_VERSION: &str = "3.0.0";

// ===== ALERT THRESHOLDS =====

/// Fall impact threshold (g).
pub const FALL_THRESHOLD_G: f32 = 2.5;

/// Closer than this is a proximity warning (mm).
pub const DISTANCE_NEAR_MM: f32 = 500.0;

/// Farther than this (sustained) is a bed exit (mm).
pub const DISTANCE_FAR_MM: f32 = 2000.0;

/// ToF4M maximum measurement distance (mm). Beyond means no target.
pub const DISTANCE_MAX_MM: f32 = 4000.0;

/// High temperature warning (°C).
pub const TEMP_HIGH_C: f32 = 35.0;

/// Low temperature warning (°C).
pub const TEMP_LOW_C: f32 = 15.0;

/// High humidity warning (%).
pub const HUMIDITY_HIGH_PCT: f32 = 80.0;

/// Low humidity warning (%).
pub const HUMIDITY_LOW_PCT: f32 = 30.0;

/// Far reading must persist this long before it counts as a bed exit.
pub const BED_EXIT_DWELL_MS: u64 = 3_000;

// ===== TIMING =====

/// IMU read interval.
pub const IMU_READ_INTERVAL_MS: u64 = 100;

/// ToF read interval.
pub const TOF_READ_INTERVAL_MS: u64 = 200;

/// Environmental sensor read interval.
pub const ENV_READ_INTERVAL_MS: u64 = 2_000;

/// GPS read interval.
pub const GPS_READ_INTERVAL_MS: u64 = 1_000;

/// Snapshot publish interval.
pub const MQTT_PUBLISH_INTERVAL_MS: u64 = 5_000;

/// No-motion alert timeout (10 minutes).
pub const NO_MOTION_TIMEOUT_MS: u64 = 600_000;
