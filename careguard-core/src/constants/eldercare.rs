//! Eldercare Room Monitor Profile
//!
//! M5Stack care unit placed by the bed: IMU, ToF distance and ENV sensor,
//! no GPS. Values match the care firmware configuration template.

/// Device identifier.
pub const DEVICE_ID: &str = "M5_CARE_001";

/// Firmware version reported in heartbeats.
pub const FIRMWARE_VERSION: &str = "1.0.0";

// ===== ALERT THRESHOLDS =====

/// No qualifying motion for this long raises an alert (5 minutes).
pub const MOTION_TIMEOUT_MS: u64 = 300_000;

/// Temperature too high (°C).
pub const TEMP_HIGH_C: f32 = 28.0;

/// Temperature too low (°C).
pub const TEMP_LOW_C: f32 = 18.0;

/// Humidity too high (%).
pub const HUMIDITY_HIGH_PCT: f32 = 70.0;

/// Humidity too low (%).
pub const HUMIDITY_LOW_PCT: f32 = 30.0;

// ===== TIMING =====

/// Environmental sensors are read every 10 seconds.
pub const SENSOR_READ_INTERVAL_MS: u64 = 10_000;

/// State snapshot every minute.
pub const DATA_SEND_INTERVAL_MS: u64 = 60_000;

/// Heartbeat every 5 minutes.
pub const HEARTBEAT_INTERVAL_MS: u64 = 300_000;
