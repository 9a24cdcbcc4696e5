//! Engine configuration
//!
//! All thresholds, cadences and policy constants are loaded once at startup
//! into an [`EngineConfig`], checked by [`EngineConfig::validate`], and then
//! handed by reference to every component constructor. Nothing reads
//! configuration from global state and nothing mutates it after the engine
//! starts.
//!
//! Three presets reproduce the shipped device variants:
//!
//! ```rust
//! use careguard_core::EngineConfig;
//!
//! let care = EngineConfig::eldercare();
//! assert!(!care.device.sensors.location);
//!
//! let pet = EngineConfig::pet_tracker()
//!     .with_home(35.0, 139.0)
//!     .with_device_id("collar-7")
//!     .unwrap();
//! assert!(pet.validate().is_ok());
//! ```

use heapless::{String, Vec};

use crate::{
    alerts::{AlertKind, Severity},
    constants::{
        self, eldercare, fire_unit, pet_tracker, MAX_DEVICE_ID_LEN, MAX_FIRMWARE_VERSION_LEN,
        MAX_RENOTIFY_OVERRIDES,
    },
    errors::{ConfigError, ConfigResult},
    monitors::geofence::GeoPoint,
};

/// Inline device identifier
pub type DeviceId = String<MAX_DEVICE_ID_LEN>;

/// Which sensors the device variant carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorSet {
    /// IMU (activity, falls, no-motion)
    pub motion: bool,
    /// ToF distance sensor (proximity, bed exit)
    pub proximity: bool,
    /// GPS (geofence)
    pub location: bool,
    /// Temperature and humidity
    pub environment: bool,
}

impl SensorSet {
    /// Every sensor fitted
    pub const fn all() -> Self {
        Self { motion: true, proximity: true, location: true, environment: true }
    }
}

impl Default for SensorSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Device identity and fitted hardware
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Identifier used on every published message
    pub device_id: DeviceId,
    /// Reported in heartbeats
    pub firmware_version: String<MAX_FIRMWARE_VERSION_LEN>,
    /// Fitted sensors
    pub sensors: SensorSet,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: inline_str(fire_unit::DEVICE_ID),
            firmware_version: inline_str(fire_unit::FIRMWARE_VERSION),
            sensors: SensorSet::all(),
        }
    }
}

/// Activity classifier thresholds
///
/// Thresholds are deviations from the 1 g resting baseline and must be
/// strictly ordered `rest < step < run < fall`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActivityConfig {
    /// Expected IMU sample interval
    pub read_interval_ms: u64,
    /// Rolling window length in samples
    pub window_len: usize,
    /// Below this the subject is at rest (or trembling)
    pub rest_threshold_g: f32,
    /// Stride detection threshold
    pub step_threshold_g: f32,
    /// Running threshold
    pub run_threshold_g: f32,
    /// Fall impact threshold
    pub fall_threshold_g: f32,
    /// Mean sample-to-sample change that counts as trembling
    pub tremble_threshold_g: f32,
    /// Consecutive evaluations a new state must hold before it is committed
    pub confirm_evaluations: u8,
    /// Fresh samples after an impact before a fall is latched
    pub fall_confirm_samples: u8,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: fire_unit::IMU_READ_INTERVAL_MS,
            window_len: 10,
            rest_threshold_g: pet_tracker::REST_THRESHOLD_G,
            step_threshold_g: pet_tracker::STEP_THRESHOLD_G,
            run_threshold_g: pet_tracker::RUN_THRESHOLD_G,
            fall_threshold_g: fire_unit::FALL_THRESHOLD_G,
            tremble_threshold_g: pet_tracker::TREMBLING_THRESHOLD_G,
            confirm_evaluations: 2,
            fall_confirm_samples: 1,
        }
    }
}

/// Proximity / bed-exit thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProximityConfig {
    /// Expected ToF sample interval
    pub read_interval_ms: u64,
    /// Closer than this is Near
    pub near_mm: f32,
    /// Farther than this (sustained) is BedExit
    pub far_mm: f32,
    /// Sensor range; beyond it there is no target
    pub max_mm: f32,
    /// Dead band applied when leaving Near or BedExit
    pub hysteresis_mm: f32,
    /// How long a far reading must persist to count as a bed exit
    pub bed_exit_dwell_ms: u64,
    /// Consecutive evaluations for Near/Far changes
    pub confirm_evaluations: u8,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: fire_unit::TOF_READ_INTERVAL_MS,
            near_mm: fire_unit::DISTANCE_NEAR_MM,
            far_mm: fire_unit::DISTANCE_FAR_MM,
            max_mm: fire_unit::DISTANCE_MAX_MM,
            hysteresis_mm: 50.0,
            bed_exit_dwell_ms: fire_unit::BED_EXIT_DWELL_MS,
            confirm_evaluations: 2,
        }
    }
}

/// Geofence anchor and radii
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeofenceConfig {
    /// Expected GPS fix interval
    pub read_interval_ms: u64,
    /// Home anchor
    pub home: GeoPoint,
    /// Inner radius (m); at or beyond it the zone is Warning
    pub warning_radius_m: f64,
    /// Outer radius (m); at or beyond it the zone is Escaped
    pub escape_radius_m: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: pet_tracker::GPS_READ_INTERVAL_MS,
            home: GeoPoint::new(pet_tracker::HOME_LATITUDE, pet_tracker::HOME_LONGITUDE),
            warning_radius_m: pet_tracker::WARNING_RADIUS_M,
            escape_radius_m: pet_tracker::ESCAPE_RADIUS_M,
        }
    }
}

/// Inclusive comfort band for one environmental channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Band {
    /// Lowest in-range value
    pub low: f32,
    /// Highest in-range value
    pub high: f32,
}

impl Band {
    /// Create a band
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

/// Temperature and humidity bands
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvironmentConfig {
    /// Expected ENV sample interval
    pub read_interval_ms: u64,
    /// Temperature band (°C)
    pub temperature: Band,
    /// Relative humidity band (%)
    pub humidity: Band,
    /// Consecutive samples before a channel changes state
    pub confirm_samples: u8,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: fire_unit::ENV_READ_INTERVAL_MS,
            temperature: Band::new(fire_unit::TEMP_LOW_C, fire_unit::TEMP_HIGH_C),
            humidity: Band::new(fire_unit::HUMIDITY_LOW_PCT, fire_unit::HUMIDITY_HIGH_PCT),
            confirm_samples: 2,
        }
    }
}

/// No-motion watchdog
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatchdogConfig {
    /// Silence longer than this raises a NoMotion alert
    pub timeout_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { timeout_ms: fire_unit::NO_MOTION_TIMEOUT_MS }
    }
}

/// Minimum re-notify interval for each severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenotifyIntervals {
    /// Info records
    pub info_ms: u64,
    /// Caution records
    pub caution_ms: u64,
    /// Warning records
    pub warning_ms: u64,
    /// Emergency records (repeats only; a fresh rise always goes out)
    pub emergency_ms: u64,
}

impl RenotifyIntervals {
    /// Interval for a severity
    pub const fn for_severity(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Info => self.info_ms,
            Severity::Caution => self.caution_ms,
            Severity::Warning => self.warning_ms,
            Severity::Emergency => self.emergency_ms,
        }
    }
}

impl Default for RenotifyIntervals {
    fn default() -> Self {
        Self {
            info_ms: 5 * constants::MS_PER_MINUTE,
            caution_ms: 5 * constants::MS_PER_MINUTE,
            warning_ms: constants::MS_PER_MINUTE,
            emergency_ms: constants::MS_PER_MINUTE,
        }
    }
}

/// Per-kind re-notify override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KindInterval {
    /// Alert kind
    pub kind: AlertKind,
    /// Minimum interval between dispatches of this kind
    pub interval_ms: u64,
}

/// Dispatch and notification policy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlertPolicy {
    /// Records below this severity are never published
    pub dispatch_floor: Severity,
    /// Records below this severity are never pushed to the notifier
    pub notify_floor: Severity,
    /// Per-severity re-notify intervals
    pub renotify: RenotifyIntervals,
    /// Per-kind overrides, checked before the severity table
    pub overrides: Vec<KindInterval, MAX_RENOTIFY_OVERRIDES>,
    /// Minimum interval between push notifications of one kind
    pub notify_interval_ms: u64,
    /// Re-dispatch ongoing emergencies (escape, latched fall) once per interval
    pub repeat_active_emergencies: bool,
}

impl AlertPolicy {
    /// Re-notify interval for a kind at a severity
    pub fn interval_for(&self, kind: AlertKind, severity: Severity) -> u64 {
        self.overrides
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| o.interval_ms)
            .unwrap_or_else(|| self.renotify.for_severity(severity))
    }

    /// Add or replace a per-kind override
    pub fn with_override(mut self, kind: AlertKind, interval_ms: u64) -> ConfigResult<Self> {
        if let Some(existing) = self.overrides.iter_mut().find(|o| o.kind == kind) {
            existing.interval_ms = interval_ms;
            return Ok(self);
        }
        self.overrides
            .push(KindInterval { kind, interval_ms })
            .map_err(|_| ConfigError::TooManyOverrides { max: MAX_RENOTIFY_OVERRIDES })?;
        Ok(self)
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            dispatch_floor: Severity::Warning,
            notify_floor: Severity::Warning,
            renotify: RenotifyIntervals::default(),
            overrides: Vec::new(),
            notify_interval_ms: pet_tracker::LINE_NOTIFY_INTERVAL_MS,
            repeat_active_emergencies: true,
        }
    }
}

/// Periodic transmission cadences
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TelemetryConfig {
    /// State snapshot cadence
    pub snapshot_interval_ms: u64,
    /// Heartbeat/status cadence
    pub heartbeat_interval_ms: u64,
    /// Activity summary cadence; `None` disables summaries
    pub summary_interval_ms: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: fire_unit::MQTT_PUBLISH_INTERVAL_MS,
            heartbeat_interval_ms: eldercare::HEARTBEAT_INTERVAL_MS,
            summary_interval_ms: None,
        }
    }
}

/// Inputs to the calorie estimate
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalorieConfig {
    /// Body weight (kg)
    pub weight_kg: f32,
    /// Species calorie factor
    pub factor: f32,
    /// Basal metabolic rate (kcal/day)
    pub basal_kcal_per_day: f32,
}

impl Default for CalorieConfig {
    fn default() -> Self {
        Self {
            weight_kg: pet_tracker::WEIGHT_KG,
            factor: pet_tracker::CALORIE_FACTOR,
            basal_kcal_per_day: pet_tracker::BASAL_METABOLIC_RATE_KCAL,
        }
    }
}

/// Complete, immutable engine configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Identity and fitted sensors
    pub device: DeviceConfig,
    /// Activity classifier
    pub activity: ActivityConfig,
    /// Proximity monitor
    pub proximity: ProximityConfig,
    /// Geofence monitor
    pub geofence: GeofenceConfig,
    /// Environmental monitor
    pub environment: EnvironmentConfig,
    /// No-motion watchdog
    pub watchdog: WatchdogConfig,
    /// Alert aggregator policy
    pub alerts: AlertPolicy,
    /// Telemetry cadences
    pub telemetry: TelemetryConfig,
    /// Calorie estimate parameters
    pub calories: CalorieConfig,
}

impl EngineConfig {
    /// Care room monitor: IMU, ToF, ENV; no GPS
    pub fn eldercare() -> Self {
        Self {
            device: DeviceConfig {
                device_id: inline_str(eldercare::DEVICE_ID),
                firmware_version: inline_str(eldercare::FIRMWARE_VERSION),
                sensors: SensorSet { location: false, ..SensorSet::all() },
            },
            environment: EnvironmentConfig {
                read_interval_ms: eldercare::SENSOR_READ_INTERVAL_MS,
                temperature: Band::new(eldercare::TEMP_LOW_C, eldercare::TEMP_HIGH_C),
                humidity: Band::new(eldercare::HUMIDITY_LOW_PCT, eldercare::HUMIDITY_HIGH_PCT),
                ..EnvironmentConfig::default()
            },
            watchdog: WatchdogConfig { timeout_ms: eldercare::MOTION_TIMEOUT_MS },
            telemetry: TelemetryConfig {
                snapshot_interval_ms: eldercare::DATA_SEND_INTERVAL_MS,
                heartbeat_interval_ms: eldercare::HEARTBEAT_INTERVAL_MS,
                summary_interval_ms: None,
            },
            ..Self::default()
        }
    }

    /// Multi-sensor fire unit: every sensor fitted
    pub fn fire_unit() -> Self {
        Self::default()
    }

    /// Pet collar: IMU and GPS, push notifications while escaped
    pub fn pet_tracker() -> Self {
        let alerts = AlertPolicy {
            notify_interval_ms: pet_tracker::LINE_NOTIFY_INTERVAL_MS,
            ..AlertPolicy::default()
        };
        // A fresh default policy has room for every override
        let alerts = alerts
            .clone()
            .with_override(AlertKind::GeofenceEscape, pet_tracker::LINE_NOTIFY_INTERVAL_MS)
            .unwrap_or(alerts);

        Self {
            device: DeviceConfig {
                device_id: inline_str(pet_tracker::DEVICE_ID),
                firmware_version: inline_str(pet_tracker::FIRMWARE_VERSION),
                sensors: SensorSet { proximity: false, environment: false, ..SensorSet::all() },
            },
            activity: ActivityConfig {
                read_interval_ms: pet_tracker::IMU_READ_INTERVAL_MS,
                window_len: 16,
                rest_threshold_g: pet_tracker::REST_THRESHOLD_G,
                step_threshold_g: pet_tracker::STEP_THRESHOLD_G,
                run_threshold_g: pet_tracker::RUN_THRESHOLD_G,
                fall_threshold_g: pet_tracker::FALL_THRESHOLD_G,
                tremble_threshold_g: pet_tracker::TREMBLING_THRESHOLD_G,
                ..ActivityConfig::default()
            },
            geofence: GeofenceConfig {
                read_interval_ms: pet_tracker::GPS_READ_INTERVAL_MS,
                home: GeoPoint::new(pet_tracker::HOME_LATITUDE, pet_tracker::HOME_LONGITUDE),
                warning_radius_m: pet_tracker::WARNING_RADIUS_M,
                escape_radius_m: pet_tracker::ESCAPE_RADIUS_M,
            },
            alerts,
            telemetry: TelemetryConfig {
                snapshot_interval_ms: pet_tracker::MQTT_PUBLISH_INTERVAL_MS,
                heartbeat_interval_ms: eldercare::HEARTBEAT_INTERVAL_MS,
                summary_interval_ms: Some(pet_tracker::ACTIVITY_SUMMARY_INTERVAL_MS),
            },
            calories: CalorieConfig {
                weight_kg: pet_tracker::WEIGHT_KG,
                factor: pet_tracker::CALORIE_FACTOR,
                basal_kcal_per_day: pet_tracker::BASAL_METABOLIC_RATE_KCAL,
            },
            ..Self::default()
        }
    }

    /// Replace the device id
    pub fn with_device_id(mut self, id: &str) -> ConfigResult<Self> {
        let mut device_id = DeviceId::new();
        device_id
            .push_str(id)
            .map_err(|_| ConfigError::DeviceIdTooLong { max: MAX_DEVICE_ID_LEN })?;
        self.device.device_id = device_id;
        Ok(self)
    }

    /// Move the geofence anchor
    pub fn with_home(mut self, latitude: f64, longitude: f64) -> Self {
        self.geofence.home = GeoPoint::new(latitude, longitude);
        self
    }

    /// Replace the alert policy
    pub fn with_alert_policy(mut self, policy: AlertPolicy) -> Self {
        self.alerts = policy;
        self
    }

    /// Check every ordering and positivity invariant
    ///
    /// A violation is a logic contradiction in the configuration and the
    /// engine must not start with it.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_activity()?;
        self.validate_proximity()?;
        self.validate_geofence()?;
        self.validate_environment()?;

        positive("watchdog.timeout_ms", self.watchdog.timeout_ms)?;
        positive("telemetry.snapshot_interval_ms", self.telemetry.snapshot_interval_ms)?;
        positive("telemetry.heartbeat_interval_ms", self.telemetry.heartbeat_interval_ms)?;
        if let Some(summary) = self.telemetry.summary_interval_ms {
            positive("telemetry.summary_interval_ms", summary)?;
        }

        finite_positive("calories.weight_kg", self.calories.weight_kg)?;
        finite_non_negative("calories.factor", self.calories.factor)?;
        finite_non_negative("calories.basal_kcal_per_day", self.calories.basal_kcal_per_day)?;

        Ok(())
    }

    fn validate_activity(&self) -> ConfigResult<()> {
        let a = &self.activity;
        positive("activity.read_interval_ms", a.read_interval_ms)?;

        if a.window_len < 2 || a.window_len > constants::ACTIVITY_WINDOW_CAPACITY {
            return Err(ConfigError::InvalidValue {
                name: "activity.window_len",
                value: a.window_len as f32,
            });
        }
        if a.confirm_evaluations == 0 {
            return Err(ConfigError::InvalidValue { name: "activity.confirm_evaluations", value: 0.0 });
        }

        finite_positive("activity.rest_threshold_g", a.rest_threshold_g)?;
        finite_positive("activity.tremble_threshold_g", a.tremble_threshold_g)?;
        ordered("activity.rest_threshold_g", a.rest_threshold_g, "activity.step_threshold_g", a.step_threshold_g)?;
        ordered("activity.step_threshold_g", a.step_threshold_g, "activity.run_threshold_g", a.run_threshold_g)?;
        ordered("activity.run_threshold_g", a.run_threshold_g, "activity.fall_threshold_g", a.fall_threshold_g)
    }

    fn validate_proximity(&self) -> ConfigResult<()> {
        let p = &self.proximity;
        positive("proximity.read_interval_ms", p.read_interval_ms)?;
        if p.confirm_evaluations == 0 {
            return Err(ConfigError::InvalidValue { name: "proximity.confirm_evaluations", value: 0.0 });
        }
        finite_non_negative("proximity.hysteresis_mm", p.hysteresis_mm)?;
        finite_positive("proximity.near_mm", p.near_mm)?;
        ordered("proximity.near_mm", p.near_mm, "proximity.far_mm", p.far_mm)?;
        ordered("proximity.far_mm", p.far_mm, "proximity.max_mm", p.max_mm)?;

        // Both dead bands must fit between the thresholds
        let near_exit = p.near_mm + p.hysteresis_mm;
        let far_return = p.far_mm - p.hysteresis_mm;
        ordered("proximity.near_mm + hysteresis_mm", near_exit, "proximity.far_mm - hysteresis_mm", far_return)
    }

    fn validate_geofence(&self) -> ConfigResult<()> {
        let g = &self.geofence;
        positive("geofence.read_interval_ms", g.read_interval_ms)?;
        if !g.home.is_valid() {
            return Err(ConfigError::InvalidHome {
                latitude: g.home.latitude,
                longitude: g.home.longitude,
            });
        }
        if !g.warning_radius_m.is_finite() || g.warning_radius_m <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "geofence.warning_radius_m",
                value: g.warning_radius_m as f32,
            });
        }
        if !g.escape_radius_m.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "geofence.escape_radius_m",
                value: g.escape_radius_m as f32,
            });
        }
        // Compared in f64; the error only reports the values
        if g.warning_radius_m >= g.escape_radius_m {
            return Err(ConfigError::ThresholdOrder {
                lower_name: "geofence.warning_radius_m",
                lower: g.warning_radius_m as f32,
                upper_name: "geofence.escape_radius_m",
                upper: g.escape_radius_m as f32,
            });
        }
        Ok(())
    }

    fn validate_environment(&self) -> ConfigResult<()> {
        let e = &self.environment;
        positive("environment.read_interval_ms", e.read_interval_ms)?;
        if e.confirm_samples == 0 {
            return Err(ConfigError::InvalidValue { name: "environment.confirm_samples", value: 0.0 });
        }
        ordered("environment.temperature.low", e.temperature.low, "environment.temperature.high", e.temperature.high)?;
        ordered("environment.humidity.low", e.humidity.low, "environment.humidity.high", e.humidity.high)
    }
}

fn inline_str<const N: usize>(s: &str) -> String<N> {
    debug_assert!(s.len() <= N, "preset string {s:?} longer than {N} bytes");
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

fn positive(name: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::ZeroInterval { name });
    }
    Ok(())
}

fn finite_positive(name: &'static str, value: f32) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue { name, value });
    }
    Ok(())
}

fn finite_non_negative(name: &'static str, value: f32) -> ConfigResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidValue { name, value });
    }
    Ok(())
}

fn ordered(lower_name: &'static str, lower: f32, upper_name: &'static str, upper: f32) -> ConfigResult<()> {
    if !lower.is_finite() {
        return Err(ConfigError::InvalidValue { name: lower_name, value: lower });
    }
    if !upper.is_finite() {
        return Err(ConfigError::InvalidValue { name: upper_name, value: upper });
    }
    if lower >= upper {
        return Err(ConfigError::ThresholdOrder { lower_name, lower, upper_name, upper });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(EngineConfig::eldercare().validate(), Ok(()));
        assert_eq!(EngineConfig::fire_unit().validate(), Ok(()));
        assert_eq!(EngineConfig::pet_tracker().validate(), Ok(()));
    }

    #[test]
    fn presets_carry_firmware_values() {
        let pet = EngineConfig::pet_tracker();
        assert_eq!(pet.device.device_id.as_str(), "PochiGuard_Noah");
        assert_eq!(pet.geofence.warning_radius_m, 500.0);
        assert_eq!(pet.geofence.escape_radius_m, 1000.0);
        assert_eq!(pet.alerts.interval_for(AlertKind::GeofenceEscape, Severity::Emergency), 300_000);
        assert_eq!(pet.telemetry.summary_interval_ms, Some(3_600_000));
        assert!(!pet.device.sensors.proximity);

        let care = EngineConfig::eldercare();
        assert_eq!(care.watchdog.timeout_ms, 300_000);
        assert_eq!(care.environment.temperature, Band::new(18.0, 28.0));

        let fire = EngineConfig::fire_unit();
        assert_eq!(fire.proximity.max_mm, 4000.0);
        assert_eq!(fire.watchdog.timeout_ms, 600_000);
    }

    #[test]
    fn warning_radius_must_be_inside_escape_radius() {
        let mut config = EngineConfig::pet_tracker();
        config.geofence.warning_radius_m = 1000.0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { lower_name: "geofence.warning_radius_m", .. })
        ));
    }

    #[test]
    fn radii_compared_at_full_precision() {
        // Both round to 1000.0 as f32
        let mut config = EngineConfig::pet_tracker();
        config.geofence.warning_radius_m = 1_000.0;
        config.geofence.escape_radius_m = 1_000.00001;
        assert_eq!(config.validate(), Ok(()));

        config.geofence.escape_radius_m = 999.99999;
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdOrder { .. })));
    }

    #[test]
    fn preset_strings_fit_inline() {
        let care = EngineConfig::eldercare();
        assert_eq!(care.device.device_id.as_str(), eldercare::DEVICE_ID);
        assert_eq!(care.device.firmware_version.as_str(), eldercare::FIRMWARE_VERSION);
        let pet = EngineConfig::pet_tracker();
        assert_eq!(pet.device.device_id.as_str(), pet_tracker::DEVICE_ID);
        assert_eq!(inline_str::<8>("3.0.0").as_str(), "3.0.0");
    }

    #[test]
    fn near_must_be_below_far() {
        let mut config = EngineConfig::fire_unit();
        config.proximity.near_mm = 2500.0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { lower_name: "proximity.near_mm", .. })
        ));
    }

    #[test]
    fn activity_thresholds_must_be_ordered() {
        let mut config = EngineConfig::fire_unit();
        config.activity.run_threshold_g = 3.0; // above fall

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { upper_name: "activity.fall_threshold_g", .. })
        ));
    }

    #[test]
    fn zero_intervals_rejected() {
        let mut config = EngineConfig::eldercare();
        config.telemetry.snapshot_interval_ms = 0;

        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval { name: "telemetry.snapshot_interval_ms" })
        );
    }

    #[test]
    fn invalid_home_rejected() {
        let config = EngineConfig::pet_tracker().with_home(95.0, 10.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHome { .. })));
    }

    #[test]
    fn nan_threshold_rejected() {
        let mut config = EngineConfig::fire_unit();
        config.environment.humidity.high = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn device_id_length_checked() {
        let long = "this-device-id-is-definitely-longer-than-32-bytes";
        assert_eq!(
            EngineConfig::fire_unit().with_device_id(long),
            Err(ConfigError::DeviceIdTooLong { max: MAX_DEVICE_ID_LEN })
        );
    }

    #[test]
    fn overrides_replace_existing_entry() {
        let policy = AlertPolicy::default()
            .with_override(AlertKind::Fall, 10_000)
            .unwrap()
            .with_override(AlertKind::Fall, 20_000)
            .unwrap();

        assert_eq!(policy.overrides.len(), 1);
        assert_eq!(policy.interval_for(AlertKind::Fall, Severity::Emergency), 20_000);
        assert_eq!(policy.interval_for(AlertKind::NoMotion, Severity::Warning), 60_000);
    }
}
