//! MQTT connector
//!
//! Wraps the synchronous `rumqttc` client. The connection event loop runs on
//! its own thread and keeps reconnecting after errors; `send` only enqueues
//! and never blocks the engine's control loop. While the broker link is down
//! sends fail fast with [`MqttError::NotConnected`] instead of queueing.
//!
//! A retained last-will on the status topic reports `offline` when the
//! device drops off without saying goodbye.
//!
//! Dropping the connector stops the event loop and joins its thread, also
//! while the broker is unreachable.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use rumqttc::{Client, ClientError, Connection, Event, LastWill, MqttOptions, Packet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ConnectionStats, Connector, ConnectorError};

pub use rumqttc::QoS;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Broker link is down
    #[error("Not connected to broker")]
    NotConnected,

    /// Outgoing request queue is full
    #[error("Request queue full")]
    QueueFull,

    /// Client rejected the request
    #[error("Client error: {0}")]
    Client(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MqttError> for ConnectorError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::NotConnected => ConnectorError::NotConnected,
            MqttError::QueueFull => ConnectorError::BufferFull,
            MqttError::Client(msg) => ConnectorError::ProtocolError(msg),
            MqttError::Config(msg) => ConnectorError::ConfigError(msg),
        }
    }
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client id; the device id is used when empty
    pub client_id: String,
    /// Optional user name
    pub username: Option<String>,
    /// Password for `username`
    pub password: Option<String>,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Delivery guarantee for every publish
    #[serde(with = "qos_level")]
    pub qos: QoS,
    /// Outgoing request queue capacity
    pub queue_capacity: usize,
    /// Pause after a connection error before polling again
    pub reconnect_delay_ms: u64,
    /// Topic for the retained last-will; none when empty
    pub last_will_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "broker.hivemq.com".into(),
            port: 1883,
            client_id: String::new(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            qos: QoS::AtLeastOnce,
            queue_capacity: 32,
            reconnect_delay_ms: 5_000,
            last_will_topic: "care/status".into(),
        }
    }
}

impl MqttConfig {
    /// Configuration for a broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }

    /// Set the client id
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    fn validate(&self) -> Result<(), MqttError> {
        if self.host.is_empty() {
            return Err(MqttError::Config("broker host is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client id is empty".into()));
        }
        // rumqttc refuses keep-alives under 5 s
        if self.keep_alive_secs < 5 {
            return Err(MqttError::Config(format!("keep-alive {} s below 5 s", self.keep_alive_secs)));
        }
        if self.queue_capacity == 0 {
            return Err(MqttError::Config("queue capacity is zero".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        if let Some(username) = &self.username {
            options.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }
        if !self.last_will_topic.is_empty() {
            let will = format!(r#"{{"client_id":"{}","status":"offline"}}"#, self.client_id);
            options.set_last_will(LastWill::new(self.last_will_topic.clone(), will, self.qos, true));
        }
        options
    }
}

/// Publishes engine messages to an MQTT broker
pub struct MqttConnector {
    client: Client,
    qos: QoS,
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
    shutdown: Arc<AtomicBool>,
    event_loop: Option<JoinHandle<()>>,
}

impl MqttConnector {
    /// Connect and start the event loop thread
    pub fn new(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;
        let (client, connection) = Client::new(config.options(), config.queue_capacity);

        let connected = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(ConnectionStats::default()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let state = LoopState {
            connected: Arc::clone(&connected),
            stats: Arc::clone(&stats),
            shutdown: Arc::clone(&shutdown),
            delay: Duration::from_millis(config.reconnect_delay_ms),
        };
        let event_loop = thread::Builder::new()
            .name("careguard-mqtt".into())
            .spawn(move || drive(connection, state))
            .map_err(|e| MqttError::Config(format!("cannot spawn event loop: {}", e)))?;

        log::info!("MQTT client {} -> {}:{}", config.client_id, config.host, config.port);
        Ok(Self {
            client,
            qos: config.qos,
            connected,
            stats,
            shutdown,
            event_loop: Some(event_loop),
        })
    }

    fn with_stats(&self, f: impl FnOnce(&mut ConnectionStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}

impl Drop for MqttConnector {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Wakes an idle loop blocked on the next event
        let _ = self.client.try_disconnect();
        if let Some(handle) = self.event_loop.take() {
            if handle.join().is_err() {
                log::warn!("MQTT event loop panicked");
            }
        }
    }
}

/// Shared between the connector and its event loop
struct LoopState {
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
    shutdown: Arc<AtomicBool>,
    delay: Duration,
}

impl LoopState {
    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Sleep for the reconnect delay, waking early on shutdown
    fn pause(&self) {
        let until = Instant::now() + self.delay;
        while !self.stopping() {
            let now = Instant::now();
            if now >= until {
                break;
            }
            thread::sleep((until - now).min(SHUTDOWN_POLL));
        }
    }
}

/// Granularity of the shutdown check while waiting to reconnect
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Poll the connection until the client is dropped
fn drive(mut connection: Connection, state: LoopState) {
    let LoopState { connected, stats, .. } = &state;
    let mut was_connected = false;
    for notification in connection.iter() {
        if state.stopping() {
            break;
        }
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Release);
                if was_connected {
                    if let Ok(mut s) = stats.lock() {
                        s.reconnections += 1;
                    }
                }
                was_connected = true;
                log::info!("MQTT connected");
            }
            Ok(_) => {}
            Err(rumqttc::ConnectionError::RequestsDone) => break,
            Err(e) => {
                if connected.swap(false, Ordering::AcqRel) {
                    log::warn!("MQTT connection lost: {}", e);
                }
                if let Ok(mut s) = stats.lock() {
                    s.last_error = Some(e.to_string());
                }
                state.pause();
                if state.stopping() {
                    break;
                }
            }
        }
    }
    connected.store(false, Ordering::Release);
    log::debug!("MQTT event loop stopped");
}

impl Connector for MqttConnector {
    type Error = MqttError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if !self.is_connected() {
            let err = MqttError::NotConnected;
            self.with_stats(|s| s.record_failure(&err));
            return Err(err);
        }

        match self.client.try_publish(topic, self.qos, false, data.to_vec()) {
            Ok(()) => {
                self.with_stats(|s| s.record_sent(data.len()));
                Ok(())
            }
            Err(e) => {
                let err = match e {
                    ClientError::TryRequest(_) => MqttError::QueueFull,
                    other => MqttError::Client(other.to_string()),
                };
                self.with_stats(|s| s.record_failure(&err));
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// QoS as its numeric level in settings files
mod qos_level {
    use rumqttc::QoS;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(qos: &QoS, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*qos as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<QoS, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            n => Err(D::Error::custom(format!("invalid QoS level {}", n))),
        }
    }
}
