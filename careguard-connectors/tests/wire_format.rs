//! Engine to JSON to connector, checked on the topics a backend sees

use careguard_connectors::{Connector, JsonTransport, MemoryConnector, Topics};
use careguard_core::{
    monitors::geofence::{destination, GeoPoint, GpsFix},
    Engine, EngineConfig, Reading, Timestamp,
};

const GPS_STEP_MS: u64 = 1_000;

struct Collar {
    engine: Engine,
    transport: JsonTransport<MemoryConnector>,
    home: GeoPoint,
    now: Timestamp,
}

impl Collar {
    fn new(topics: Topics) -> Self {
        let engine = Engine::new(EngineConfig::pet_tracker()).unwrap();
        let home = engine.config().geofence.home;
        Self { engine, transport: JsonTransport::new(MemoryConnector::new(), topics), home, now: 0 }
    }

    /// One fix `distance_m` north of home per second for `duration_ms`
    fn walk(&mut self, distance_m: f64, duration_ms: u64) {
        let end = self.now + duration_ms;
        while self.now < end {
            self.now += GPS_STEP_MS;
            let p = destination(self.home, 0.0, distance_m);
            self.engine.push(Reading::Position(GpsFix::locked(p.latitude, p.longitude, 9)), self.now, true);
            self.engine.tick(self.now, &mut self.transport);
        }
    }

    fn connector(&self) -> &MemoryConnector {
        self.transport.connector()
    }
}

#[test]
fn escape_reaches_the_alert_topic() {
    let mut collar = Collar::new(Topics::default());
    collar.walk(0.0, 2_000);
    assert_eq!(collar.connector().on_topic("care/alert").count(), 0);

    collar.walk(1_300.0, 3_000);
    assert_eq!(collar.connector().on_topic("care/alert").count(), 1);

    let alert = collar.connector().last_json("care/alert").unwrap();
    assert_eq!(alert["device_id"], "PochiGuard_Noah");
    assert_eq!(alert["type"], "geofence_escape");
    assert_eq!(alert["level"], 3);
    assert!(alert["latitude"].as_f64().unwrap() > collar.home.latitude);
    assert!(alert["message"].as_str().unwrap().starts_with("Escape alert"));
}

#[test]
fn first_tick_reports_snapshot_location_and_status() {
    let mut collar = Collar::new(Topics::default());
    collar.walk(0.0, GPS_STEP_MS);

    let snapshot = collar.connector().last_json("care/sensor/data").unwrap();
    assert_eq!(snapshot["gps"]["zone"], "HOME");
    assert_eq!(snapshot["gps"]["stale"], false);

    let location = collar.connector().last_json("care/location").unwrap();
    assert_eq!(location["zone"], "HOME");
    assert!(location["distance_from_home"].as_f64().unwrap() < 1.0);

    let status = collar.connector().last_json("care/status").unwrap();
    assert_eq!(status["status"], "online");
    assert_eq!(status["device_id"], "PochiGuard_Noah");
}

#[test]
fn per_device_topics() {
    let mut collar = Collar::new(Topics::per_device("care", "noah"));
    collar.walk(1_300.0, 3_000);

    assert_eq!(collar.connector().on_topic("care/noah/alert").count(), 1);
    assert_eq!(collar.connector().on_topic("care/alert").count(), 0);
    assert!(collar.connector().last_json("care/noah/location").is_some());
}

#[test]
fn stale_fix_publishes_no_location() {
    let mut collar = Collar::new(Topics::default());
    collar.walk(0.0, GPS_STEP_MS);
    let before = collar.connector().on_topic("care/location").count();

    // Snapshots keep going while the fix ages out
    let mut now = collar.now;
    for _ in 0..12 {
        now += 10_000;
        collar.engine.tick(now, &mut collar.transport);
    }

    let snapshot = collar.connector().last_json("care/sensor/data").unwrap();
    assert_eq!(snapshot["gps"]["stale"], true);
    assert_eq!(collar.connector().on_topic("care/location").count(), before);
}

#[test]
fn dropped_link_counts_failures() {
    let mut collar = Collar::new(Topics::default());
    collar.transport.connector_mut().set_connected(false);

    collar.walk(1_300.0, 3_000);
    assert_eq!(collar.engine.stats().dispatched, 0);
    assert!(collar.engine.stats().failed > 0);
    assert!(collar.connector().stats().messages_failed > 0);
    assert!(collar.connector().messages().is_empty());

    // Failed dispatches do not consume the window
    collar.transport.connector_mut().set_connected(true);
    collar.walk(1_300.0, GPS_STEP_MS);
    assert_eq!(collar.connector().on_topic("care/alert").count(), 1);
    assert_eq!(collar.connector().stats().reconnections, 1);
}
