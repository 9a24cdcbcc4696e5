//! The alert engine
//!
//! ## Overview
//!
//! [`Engine`] owns one [`SampleBuffer`] per sensor, the five monitors, the
//! aggregator and the telemetry scheduler. It is driven from a single
//! cooperative control loop:
//!
//! ```text
//!  drivers ──push()──▶ SampleBuffers
//!                          │
//!  control loop ──tick(now)┤
//!                          ▼
//!        motion → proximity → geofence → environment → watchdog
//!                          │ MonitorEvents
//!                          ▼
//!                   AlertAggregator ──▶ Transport / Notifier
//!                          │
//!                  TelemetryScheduler ──▶ Transport
//! ```
//!
//! ## Timing
//!
//! The engine never reads a clock. Sample timestamps come from the drivers
//! and `now` comes from the control loop, both in milliseconds on the same
//! monotonic counter.
//!
//! ## Device profiles
//!
//! Monitors whose sensor is not fitted ([`crate::config::SensorSet`]) are
//! never evaluated; pushes for those sensors are refused with
//! [`ReadingError::SensorDisabled`]. The no-motion watchdog needs the IMU.

use heapless::Vec;

use crate::{
    aggregator::{AlertAggregator, DispatchLedger, DispatchStats},
    alerts::{signals_for, AlertRecord, Signal},
    buffer::SampleBuffer,
    calories::{stride_calories, CalorieFn, CalorieInputs},
    config::EngineConfig,
    constants::{
        physics::{
            ACCEL_SENSOR_MAX_G, DISTANCE_SENSOR_MIN_MM, HUMIDITY_SENSOR_MAX_PCT, HUMIDITY_SENSOR_MIN_PCT,
            TEMP_SENSOR_MAX_C, TEMP_SENSOR_MIN_C,
        },
        MAX_DRIVER_DRAIN, MAX_EVENTS_PER_TICK, MAX_SIGNALS_PER_TICK,
    },
    errors::{ConfigResult, ReadingError, ReadingResult},
    monitors::{
        activity::{ActivityClassifier, ActivityState},
        environment::{EnvChannel, EnvChannelState, EnvironmentalMonitor},
        geofence::{GeofenceMonitor, GpsFix, ZoneState},
        proximity::{ProximityMonitor, ProximityState},
        watchdog::NoMotionWatchdog,
        MonitorEvent,
    },
    telemetry::{ActivitySummary, Heartbeat, SensorHealth, SensorStatus, StateSnapshot, TelemetryScheduler},
    time::{elapsed_ms, Timestamp},
    transport::{NoNotifier, Notifier, Transport},
};

/// Physical sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorId {
    /// IMU
    Motion,
    /// ToF distance sensor
    Proximity,
    /// GPS receiver
    Location,
    /// Temperature sensor
    Temperature,
    /// Humidity sensor
    Humidity,
}

impl SensorId {
    /// Lower-case wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Motion => "imu",
            Self::Proximity => "tof",
            Self::Location => "gps",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }
}

impl From<EnvChannel> for SensorId {
    fn from(channel: EnvChannel) -> Self {
        match channel {
            EnvChannel::Temperature => Self::Temperature,
            EnvChannel::Humidity => Self::Humidity,
        }
    }
}

/// Raw value from one driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Acceleration magnitude (g)
    Acceleration(f32),
    /// ToF distance (mm)
    Distance(f32),
    /// GPS fix
    Position(GpsFix),
    /// Air temperature (°C)
    Temperature(f32),
    /// Relative humidity (%)
    Humidity(f32),
}

impl Reading {
    /// Sensor that produced the value
    pub const fn sensor(&self) -> SensorId {
        match self {
            Self::Acceleration(_) => SensorId::Motion,
            Self::Distance(_) => SensorId::Proximity,
            Self::Position(_) => SensorId::Location,
            Self::Temperature(_) => SensorId::Temperature,
            Self::Humidity(_) => SensorId::Humidity,
        }
    }
}

/// Reading with its capture time and driver validity flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedReading {
    /// Value
    pub reading: Reading,
    /// Capture time (ms)
    pub timestamp: Timestamp,
    /// Driver-reported validity
    pub valid: bool,
}

impl TimedReading {
    /// Valid reading at a timestamp
    pub const fn new(reading: Reading, timestamp: Timestamp) -> Self {
        Self { reading, timestamp, valid: true }
    }
}

/// Non-blocking sensor driver
///
/// `poll` returns `WouldBlock` when no completed sample is ready.
pub trait SensorDriver {
    /// Driver failure
    type Error;

    /// Take the next completed sample, if any
    fn poll(&mut self) -> nb::Result<TimedReading, Self::Error>;
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick time
    pub at: Timestamp,
    /// Monitor transitions, in evaluation order
    pub events: Vec<MonitorEvent, MAX_EVENTS_PER_TICK>,
    /// Records published, highest severity first
    pub dispatched: Vec<AlertRecord, MAX_SIGNALS_PER_TICK>,
    /// Records pushed to the notifier
    pub notified: u32,
    /// Records held back by re-notify intervals
    pub throttled: u32,
    /// Records below the dispatch floor
    pub suppressed: u32,
    /// Publish failures
    pub failed: u32,
    /// Snapshot published
    pub snapshot_sent: bool,
    /// Heartbeat published
    pub heartbeat_sent: bool,
    /// Activity summary published
    pub summary_sent: bool,
}

/// Sensor-fusion alert engine
pub struct Engine {
    config: EngineConfig,

    motion: SampleBuffer<f32>,
    proximity: SampleBuffer<f32>,
    location: SampleBuffer<GpsFix>,
    temperature: SampleBuffer<f32>,
    humidity: SampleBuffer<f32>,

    activity: ActivityClassifier,
    proximity_monitor: ProximityMonitor,
    geofence: GeofenceMonitor,
    environment: EnvironmentalMonitor,
    watchdog: NoMotionWatchdog,

    aggregator: AlertAggregator,
    telemetry: TelemetryScheduler,
    calorie_fn: CalorieFn,

    deferred: Vec<MonitorEvent, 2>,
    started_at: Option<Timestamp>,
}

impl Engine {
    /// Validate the configuration and build every component from it
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;

        let engine = Self {
            motion: SampleBuffer::new(config.activity.read_interval_ms, check_acceleration),
            proximity: SampleBuffer::new(config.proximity.read_interval_ms, check_distance),
            location: SampleBuffer::new(config.geofence.read_interval_ms, GpsFix::check),
            temperature: SampleBuffer::new(config.environment.read_interval_ms, check_temperature),
            humidity: SampleBuffer::new(config.environment.read_interval_ms, check_humidity),

            activity: ActivityClassifier::new(&config.activity),
            proximity_monitor: ProximityMonitor::new(&config.proximity),
            geofence: GeofenceMonitor::new(&config.geofence),
            environment: EnvironmentalMonitor::new(&config.environment),
            watchdog: NoMotionWatchdog::new(&config.watchdog),

            aggregator: AlertAggregator::new(&config.alerts),
            telemetry: TelemetryScheduler::new(&config.telemetry),
            calorie_fn: stride_calories,

            deferred: Vec::new(),
            started_at: None,
            config,
        };

        cg_info!(
            "engine ready for {} (fw {})",
            engine.config.device.device_id.as_str(),
            engine.config.device.firmware_version.as_str()
        );
        Ok(engine)
    }

    /// Replace the calorie model
    pub fn with_calorie_model(mut self, calorie_fn: CalorieFn) -> Self {
        self.calorie_fn = calorie_fn;
        self
    }

    /// Hand a sample to its buffer, reporting why it was refused
    pub fn try_push(&mut self, reading: Reading, timestamp: Timestamp, valid: bool) -> ReadingResult<()> {
        if !self.sensor_enabled(reading.sensor()) {
            return Err(ReadingError::SensorDisabled);
        }

        match reading {
            Reading::Acceleration(g) => {
                self.motion.push(g, timestamp, valid)?;
                self.activity.ingest(g);
            }
            Reading::Distance(mm) => self.proximity.push(mm, timestamp, valid)?,
            Reading::Position(fix) => self.location.push(fix, timestamp, valid)?,
            Reading::Temperature(c) => self.temperature.push(c, timestamp, valid)?,
            Reading::Humidity(pct) => self.humidity.push(pct, timestamp, valid)?,
        }
        Ok(())
    }

    /// Hand a sample to its buffer
    ///
    /// Refused samples are logged and counted by their buffer; the previous
    /// valid sample stays in place.
    pub fn push(&mut self, reading: Reading, timestamp: Timestamp, valid: bool) {
        if let Err(_e) = self.try_push(reading, timestamp, valid) {
            cg_debug!("{} sample at {} refused: {}", reading.sensor().as_str(), timestamp, _e);
        }
    }

    /// Drain whatever a driver has ready
    ///
    /// Stops at `WouldBlock`, at the first driver error, or after
    /// [`MAX_DRIVER_DRAIN`] samples so one chatty driver cannot stall the
    /// loop. Returns the number of samples taken.
    pub fn poll_driver<D: SensorDriver + ?Sized>(&mut self, driver: &mut D) -> Result<usize, D::Error> {
        let mut taken = 0;
        while taken < MAX_DRIVER_DRAIN {
            match driver.poll() {
                Ok(sample) => {
                    self.push(sample.reading, sample.timestamp, sample.valid);
                    taken += 1;
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(taken)
    }

    /// Run one control-loop tick without a push channel
    pub fn tick<T: Transport + ?Sized>(&mut self, now: Timestamp, transport: &mut T) -> TickReport {
        self.tick_with_notifier(now, transport, &mut NoNotifier)
    }

    /// Run one control-loop tick
    pub fn tick_with_notifier<T, N>(&mut self, now: Timestamp, transport: &mut T, notifier: &mut N) -> TickReport
    where
        T: Transport + ?Sized,
        N: Notifier + ?Sized,
    {
        self.started_at.get_or_insert(now);

        let events = self.evaluate_monitors(now);

        let mut signals: Vec<Signal, MAX_SIGNALS_PER_TICK> = Vec::new();
        for event in events.iter() {
            for signal in signals_for(event) {
                push_bounded(&mut signals, signal);
            }
        }
        if let Some(peak) = self.activity.fall_ongoing() {
            push_bounded(&mut signals, Signal::fall_ongoing(peak, now));
        }
        if let Some((distance_m, position)) = self.geofence.escape_ongoing(&self.location, now) {
            push_bounded(&mut signals, Signal::escape_ongoing(distance_m, position, now));
        }

        let outcome = self.aggregator.process(
            &signals,
            now,
            self.config.device.device_id.as_str(),
            transport,
            notifier,
        );

        let mut report = TickReport {
            at: now,
            events,
            dispatched: outcome.dispatched,
            notified: outcome.notified.len() as u32,
            throttled: outcome.throttled,
            suppressed: outcome.suppressed,
            failed: outcome.failed,
            ..TickReport::default()
        };

        self.run_telemetry(now, transport, &mut report);
        report
    }

    fn evaluate_monitors(&mut self, now: Timestamp) -> Vec<MonitorEvent, MAX_EVENTS_PER_TICK> {
        let sensors = self.config.device.sensors;
        let mut events: Vec<MonitorEvent, MAX_EVENTS_PER_TICK> = Vec::new();

        // Fall acknowledgements land at the front of the motion slot
        for event in core::mem::take(&mut self.deferred) {
            push_bounded(&mut events, event);
        }

        if sensors.motion {
            let stale = self.motion.is_stale(now);
            if let Some(event) = self.activity.evaluate(stale, now) {
                push_bounded(&mut events, event);
            }
        }
        if sensors.proximity {
            if let Some(event) = self.proximity_monitor.evaluate(&self.proximity, now) {
                push_bounded(&mut events, event);
            }
        }
        if sensors.location {
            if let Some(event) = self.geofence.evaluate(&self.location, now) {
                push_bounded(&mut events, event);
            }
        }
        if sensors.environment {
            for event in self.environment.evaluate(&self.temperature, &self.humidity, now) {
                push_bounded(&mut events, event);
            }
        }
        if sensors.motion {
            if let Some(event) = self.watchdog.evaluate(self.activity.state(), now) {
                push_bounded(&mut events, MonitorEvent::Watchdog(event));
            }
        }

        events
    }

    fn run_telemetry<T: Transport + ?Sized>(&mut self, now: Timestamp, transport: &mut T, report: &mut TickReport) {
        let due = self.telemetry.poll(now);
        let device_id = self.config.device.device_id.as_str();

        if due.snapshot {
            let snapshot = self.snapshot(now);
            match transport.publish_snapshot(device_id, &snapshot, now) {
                Ok(()) => report.snapshot_sent = true,
                Err(_e) => {
                    self.telemetry.record_failure();
                    cg_warn!("snapshot publish failed: {:?}", _e);
                }
            }
        }

        if due.heartbeat {
            let heartbeat = self.heartbeat(now);
            match transport.publish_heartbeat(device_id, &heartbeat) {
                Ok(()) => report.heartbeat_sent = true,
                Err(_e) => {
                    self.telemetry.record_failure();
                    cg_warn!("heartbeat publish failed: {:?}", _e);
                }
            }
        }

        if let Some(period_start) = due.summary {
            let summary = self.close_summary_period(period_start, now);
            let device_id = self.config.device.device_id.as_str();
            match transport.publish_summary(device_id, &summary) {
                Ok(()) => report.summary_sent = true,
                Err(_e) => {
                    self.telemetry.record_failure();
                    cg_warn!("summary publish failed: {:?}", _e);
                }
            }
        }
    }

    fn close_summary_period(&mut self, period_start: Timestamp, now: Timestamp) -> ActivitySummary {
        let (steps, active_ms) = self.activity.period();
        let inputs = CalorieInputs::new(steps, elapsed_ms(period_start, now), &self.config.calories);
        self.activity.reset_period();

        ActivitySummary {
            period_start,
            period_end: now,
            steps,
            active_ms,
            calories_kcal: (self.calorie_fn)(&inputs),
            total_steps: self.activity.steps(),
        }
    }

    /// Clear a latched fall
    ///
    /// The resulting transition is reported on the next tick. Returns false
    /// when no fall has been reported yet; a fall still being confirmed is
    /// kept and reported as usual.
    pub fn acknowledge_fall(&mut self, now: Timestamp) -> bool {
        match self.activity.acknowledge_fall(now) {
            Some(event) => {
                push_bounded(&mut self.deferred, event);
                true
            }
            None => false,
        }
    }

    /// Current state of every monitor from buffered values
    pub fn snapshot(&self, now: Timestamp) -> StateSnapshot {
        let uptime = self.started_at.map(|t| elapsed_ms(t, now)).unwrap_or(0);
        let calories = CalorieInputs::new(self.activity.steps(), uptime, &self.config.calories);
        let max_mm = self.config.proximity.max_mm;

        StateSnapshot {
            timestamp: now,
            activity: self.activity.state(),
            steps: self.activity.steps(),
            fall_detected: self.activity.fall_latched(),
            calories_kcal: (self.calorie_fn)(&calories),
            distance_mm: self.proximity.fresh(now).map(|s| s.value).filter(|d| *d <= max_mm),
            proximity: self.proximity_monitor.state(),
            temperature_c: self.temperature.fresh(now).map(|s| s.value),
            humidity_pct: self.humidity.fresh(now).map(|s| s.value),
            temperature_state: self.environment.temperature(),
            humidity_state: self.environment.humidity(),
            position: self.location.latest().map(|s| s.value.position),
            distance_from_home_m: self.geofence.last_distance_m(),
            zone: self.geofence.state(),
            gps_stale: self.location.is_stale(now),
            no_motion_ms: self.watchdog.silence_ms(now),
        }
    }

    /// Status report
    pub fn heartbeat(&self, now: Timestamp) -> Heartbeat {
        let sensors = self.config.device.sensors;
        let status = |enabled: bool, stale: bool| match (enabled, stale) {
            (false, _) => SensorStatus::Disabled,
            (true, true) => SensorStatus::Stale,
            (true, false) => SensorStatus::Ok,
        };

        Heartbeat {
            timestamp: now,
            uptime_ms: self.started_at.map(|t| elapsed_ms(t, now)).unwrap_or(0),
            firmware_version: self.config.device.firmware_version.clone(),
            sensors: SensorHealth {
                motion: status(sensors.motion, self.motion.is_stale(now)),
                proximity: status(sensors.proximity, self.proximity.is_stale(now)),
                location: status(sensors.location, self.location.is_stale(now)),
                temperature: status(sensors.environment, self.temperature.is_stale(now)),
                humidity: status(sensors.environment, self.humidity.is_stale(now)),
            },
            stats: self.aggregator.stats(),
            rejected_samples: self.rejected_samples(),
            telemetry_failures: self.telemetry.failures(),
        }
    }

    fn sensor_enabled(&self, sensor: SensorId) -> bool {
        let sensors = &self.config.device.sensors;
        match sensor {
            SensorId::Motion => sensors.motion,
            SensorId::Proximity => sensors.proximity,
            SensorId::Location => sensors.location,
            SensorId::Temperature | SensorId::Humidity => sensors.environment,
        }
    }

    /// Samples refused by any buffer
    pub fn rejected_samples(&self) -> u32 {
        self.motion
            .rejected()
            .saturating_add(self.proximity.rejected())
            .saturating_add(self.location.rejected())
            .saturating_add(self.temperature.rejected())
            .saturating_add(self.humidity.rejected())
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Committed activity
    pub fn activity(&self) -> ActivityState {
        self.activity.state()
    }

    /// Committed proximity zone
    pub fn proximity(&self) -> ProximityState {
        self.proximity_monitor.state()
    }

    /// Committed geofence zone
    pub fn zone(&self) -> ZoneState {
        self.geofence.state()
    }

    /// Temperature and humidity channel states
    pub fn environment(&self) -> (EnvChannelState, EnvChannelState) {
        (self.environment.temperature(), self.environment.humidity())
    }

    /// Steps since boot
    pub fn steps(&self) -> u32 {
        self.activity.steps()
    }

    /// Delivery counters
    pub fn stats(&self) -> DispatchStats {
        self.aggregator.stats()
    }

    /// Dispatch history
    pub fn ledger(&self) -> &DispatchLedger {
        self.aggregator.ledger()
    }
}

fn push_bounded<T, const N: usize>(items: &mut Vec<T, N>, item: T) {
    if items.push(item).is_err() {
        cg_warn!("per-tick capacity {} exceeded, item dropped", N);
    }
}

fn finite(value: f32) -> ReadingResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ReadingError::NotFinite)
    }
}

fn within(value: f32, min: f32, max: f32) -> ReadingResult<()> {
    finite(value)?;
    if value < min || value > max {
        return Err(ReadingError::OutOfRange { value, min, max });
    }
    Ok(())
}

fn check_acceleration(g: &f32) -> ReadingResult<()> {
    within(*g, 0.0, ACCEL_SENSOR_MAX_G)
}

/// Beyond the sensor range is a valid "no target" reading
fn check_distance(mm: &f32) -> ReadingResult<()> {
    within(*mm, DISTANCE_SENSOR_MIN_MM, f32::MAX)
}

fn check_temperature(c: &f32) -> ReadingResult<()> {
    within(*c, TEMP_SENSOR_MIN_C, TEMP_SENSOR_MAX_C)
}

fn check_humidity(pct: &f32) -> ReadingResult<()> {
    within(*pct, HUMIDITY_SENSOR_MIN_PCT, HUMIDITY_SENSOR_MAX_PCT)
}
