//! Shared harness for the engine integration tests
//!
//! [`Rig`] bundles an engine, a recording transport and a manually advanced
//! clock so scenarios read as "push, advance, tick".

#![allow(dead_code)]

use careguard_core::{
    alerts::AlertKind,
    monitors::geofence::{destination, GeoPoint, GpsFix},
    time::{FixedTime, TimeSource},
    transport::{RecordingNotifier, RecordingTransport},
    Engine, EngineConfig, Reading, TickReport, Timestamp,
};

/// Engine under test plus its collaborators
pub struct Rig {
    pub engine: Engine,
    pub transport: RecordingTransport,
    pub notifier: RecordingNotifier,
    pub clock: FixedTime,
}

impl Rig {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config).expect("valid test configuration"),
            transport: RecordingTransport::default(),
            notifier: RecordingNotifier::default(),
            clock: FixedTime::new(0),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn advance(&mut self, ms: u64) -> &mut Self {
        self.clock.advance(ms);
        self
    }

    /// Push a valid sample stamped with the current time
    pub fn push(&mut self, reading: Reading) -> &mut Self {
        let now = self.now();
        self.engine.push(reading, now, true);
        self
    }

    pub fn tick(&mut self) -> TickReport {
        let now = self.now();
        self.engine.tick_with_notifier(now, &mut self.transport, &mut self.notifier)
    }

    /// Push the same reading and tick every `step_ms` for `duration_ms`
    ///
    /// Returns the reports of every tick.
    pub fn hold(&mut self, reading: Reading, duration_ms: u64, step_ms: u64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        let end = self.now() + duration_ms;
        while self.now() < end {
            self.advance(step_ms);
            self.push(reading);
            reports.push(self.tick());
        }
        reports
    }

    /// Published alerts of one kind
    pub fn published(&self, kind: AlertKind) -> usize {
        self.transport.alerts().iter().filter(|a| a.kind() == kind).count()
    }
}

/// Dispatched records of one kind across several tick reports
pub fn dispatched(reports: &[TickReport], kind: AlertKind) -> usize {
    reports
        .iter()
        .flat_map(|r| r.dispatched.iter())
        .filter(|a| a.kind() == kind)
        .count()
}

/// Locked GPS fix `distance_m` north of `home`
pub fn fix_north_of(home: GeoPoint, distance_m: f64) -> Reading {
    let p = destination(home, 0.0, distance_m);
    Reading::Position(GpsFix::locked(p.latitude, p.longitude, 8))
}

/// Pet collar at its configured home
pub fn pet_rig() -> Rig {
    Rig::new(EngineConfig::pet_tracker())
}

/// Care room monitor
pub fn care_rig() -> Rig {
    Rig::new(EngineConfig::eldercare())
}
