//! Property tests for the monitors and the aggregator

use careguard_core::{
    aggregator::AlertAggregator,
    alerts::{AlertKind, AlertPayload, AlertRecord, Phase, Signal, Severity},
    config::{ActivityConfig, AlertPolicy, EnvironmentConfig, GeofenceConfig},
    monitors::{
        activity::{ActivityClassifier, ActivityState},
        environment::EnvironmentalMonitor,
        geofence::{destination, haversine_m, GeoPoint, GeofenceMonitor, ZoneState},
    },
    buffer::SampleBuffer,
    transport::{NoNotifier, RecordingTransport},
};
use proptest::prelude::*;

fn pet_home() -> GeoPoint {
    GeoPoint::new(33.581452, 130.3423642)
}

proptest! {
    #[test]
    fn below_fall_threshold_never_falls(samples in prop::collection::vec(0.0f32..3.45, 1..200)) {
        let config = ActivityConfig::default();
        let mut classifier = ActivityClassifier::new(&config);

        for (i, g) in samples.iter().enumerate() {
            // Deviation from 1 g stays under 2.5 g
            classifier.ingest(*g);
            classifier.evaluate(false, i as u64 * 100);
            prop_assert_ne!(classifier.state(), ActivityState::Falling);
        }
        prop_assert!(!classifier.fall_latched());
    }

    #[test]
    fn one_spike_latches_until_acknowledged(
        spike in 3.6f32..16.0,
        tail in prop::collection::vec(0.8f32..1.2, 2..50),
    ) {
        let mut classifier = ActivityClassifier::new(&ActivityConfig::default());
        classifier.ingest(1.0);
        classifier.ingest(spike);

        let mut t = 0;
        for g in tail {
            classifier.ingest(g);
            t += 100;
            classifier.evaluate(false, t);
            prop_assert_eq!(classifier.state(), ActivityState::Falling);
        }

        prop_assert!(classifier.acknowledge_fall(t).is_some());
        prop_assert_eq!(classifier.state(), ActivityState::Resting);
    }

    #[test]
    fn distance_grows_along_a_bearing(bearing in 0.0f64..360.0, a in 0.0f64..20_000.0, b in 0.0f64..20_000.0) {
        let home = pet_home();
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        let d_near = haversine_m(home, destination(home, bearing, near));
        let d_far = haversine_m(home, destination(home, bearing, far));

        prop_assert!(d_near <= d_far + 1e-6);
        prop_assert!((d_far - far).abs() < 0.5);
    }

    #[test]
    fn warning_radius_is_inclusive(warning in 10.0f64..5_000.0) {
        let config = GeofenceConfig {
            warning_radius_m: warning,
            escape_radius_m: warning * 2.0,
            ..GeofenceConfig::default()
        };
        let monitor = GeofenceMonitor::new(&config);
        prop_assert_eq!(monitor.zone_for(warning), ZoneState::Warning);
        prop_assert_eq!(monitor.zone_for(warning * 2.0), ZoneState::Escaped);
        prop_assert_eq!(monitor.zone_for(warning - 0.01), ZoneState::Home);
    }

    #[test]
    fn warnings_inside_the_window_dispatch_once(gap_ms in 1u64..60_000) {
        let mut aggregator = AlertAggregator::new(&AlertPolicy::default());
        let mut transport = RecordingTransport::default();
        let warn = |at| Signal {
            phase: Phase::Raised,
            record: AlertRecord::new(
                AlertKind::TemperatureHigh,
                Severity::Warning,
                at,
                AlertPayload::None,
            ),
        };
        let clear = |at| Signal {
            phase: Phase::Cleared,
            record: AlertRecord::new(AlertKind::TemperatureHigh, Severity::Info, at, AlertPayload::None),
        };

        aggregator.process(&[warn(0)], 0, "dev", &mut transport, &mut NoNotifier);
        aggregator.process(&[clear(gap_ms / 2)], gap_ms / 2, "dev", &mut transport, &mut NoNotifier);
        aggregator.process(&[warn(gap_ms)], gap_ms, "dev", &mut transport, &mut NoNotifier);

        prop_assert_eq!(transport.alert_count(), 1);
    }
}

#[test]
fn home_is_zero_metres_from_itself() {
    assert_eq!(haversine_m(pet_home(), pet_home()), 0.0);
}

#[test]
fn fresh_emergency_after_normal_always_dispatches() {
    let mut aggregator = AlertAggregator::new(&AlertPolicy::default());
    let mut transport = RecordingTransport::default();
    let escape = |at| Signal {
        phase: Phase::Raised,
        record: AlertRecord::new(AlertKind::GeofenceEscape, Severity::Emergency, at, AlertPayload::None),
    };
    let cleared = |at| Signal {
        phase: Phase::Cleared,
        record: AlertRecord::new(AlertKind::GeofenceEscape, Severity::Info, at, AlertPayload::None),
    };
    let ongoing = |at| Signal { phase: Phase::Ongoing, ..escape(at) };

    aggregator.process(&[escape(0)], 0, "dev", &mut transport, &mut NoNotifier);
    aggregator.process(&[ongoing(20_000)], 20_000, "dev", &mut transport, &mut NoNotifier);
    assert_eq!(transport.alert_count(), 1, "repeat held back by the window");

    aggregator.process(&[cleared(25_000)], 25_000, "dev", &mut transport, &mut NoNotifier);
    aggregator.process(&[escape(30_000)], 30_000, "dev", &mut transport, &mut NoNotifier);
    assert_eq!(transport.alert_count(), 2, "new episode bypasses the window");

    aggregator.process(&[ongoing(90_000)], 90_000, "dev", &mut transport, &mut NoNotifier);
    assert_eq!(transport.alert_count(), 3);
}

#[test]
fn environment_needs_two_consecutive_samples() {
    let config = EnvironmentConfig::default();
    let mut monitor = EnvironmentalMonitor::new(&config);
    let mut temperature = SampleBuffer::new(config.read_interval_ms, |_: &f32| Ok(()));
    let humidity = SampleBuffer::new(config.read_interval_ms, |_: &f32| Ok(()));

    let mut transitions = 0;
    let mut feed = |value: f32, at: u64, monitor: &mut EnvironmentalMonitor| {
        temperature.push(value, at, true).unwrap();
        monitor.evaluate(&temperature, &humidity, at).len()
    };

    feed(20.0, 0, &mut monitor);
    feed(20.0, 2_000, &mut monitor);
    assert_eq!(monitor.temperature(), careguard_core::EnvChannelState::InRange);

    transitions += feed(40.0, 4_000, &mut monitor);
    transitions += feed(20.0, 6_000, &mut monitor);
    assert_eq!(transitions, 0);

    transitions += feed(40.0, 8_000, &mut monitor);
    transitions += feed(40.0, 10_000, &mut monitor);
    assert_eq!(transitions, 1);
}
