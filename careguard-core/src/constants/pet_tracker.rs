//! Pet Tracker Profile
//!
//! GPS and activity collar on an M5StickC Plus2, tuned for a 2.1 kg
//! chihuahua. Activity thresholds are lower than the human profiles because
//! a small dog's stride produces smaller impacts.

/// Device identifier.
pub const DEVICE_ID: &str = "PochiGuard_Noah";

/// Firmware version reported in heartbeats.
pub const FIRMWARE_VERSION: &str = "1.0.0";

// ===== HOME POSITION =====

/// Home latitude (degrees).
pub const HOME_LATITUDE: f64 = 33.581452;

/// Home longitude (degrees).
pub const HOME_LONGITUDE: f64 = 130.3423642;

/// Escape radius (m).
pub const ESCAPE_RADIUS_M: f64 = 1000.0;

/// Warning radius (m).
pub const WARNING_RADIUS_M: f64 = 500.0;

// ===== ACTIVITY THRESHOLDS (deviation from 1 g) =====

/// Step detection threshold.
pub const STEP_THRESHOLD_G: f32 = 1.15;

/// Running threshold.
pub const RUN_THRESHOLD_G: f32 = 1.8;

/// Fall detection threshold.
pub const FALL_THRESHOLD_G: f32 = 2.5;

/// Trembling threshold (mean sample-to-sample change).
pub const TREMBLING_THRESHOLD_G: f32 = 0.05;

/// Resting threshold.
pub const REST_THRESHOLD_G: f32 = 0.3;

// ===== CALORIES =====

/// Dog weight (kg).
pub const WEIGHT_KG: f32 = 2.1;

/// Small-dog calorie factor.
pub const CALORIE_FACTOR: f32 = 0.03;

/// Basal metabolic rate (kcal/day).
pub const BASAL_METABOLIC_RATE_KCAL: f32 = 70.0;

// ===== TIMING =====

/// IMU read interval (step detection needs 20 Hz).
pub const IMU_READ_INTERVAL_MS: u64 = 50;

/// GPS read interval.
pub const GPS_READ_INTERVAL_MS: u64 = 1_000;

/// Snapshot publish interval.
pub const MQTT_PUBLISH_INTERVAL_MS: u64 = 10_000;

/// Re-notify interval while escaped (5 minutes).
pub const LINE_NOTIFY_INTERVAL_MS: u64 = 300_000;

/// Activity summary interval (1 hour).
pub const ACTIVITY_SUMMARY_INTERVAL_MS: u64 = 3_600_000;
