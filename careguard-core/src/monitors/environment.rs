//! Temperature and humidity band monitor
//!
//! Each channel is judged independently against an inclusive `[low, high]`
//! band. A change of state (out of range, or back in range) has to be seen
//! on `confirm_samples` consecutive *new* samples; re-reading the same
//! buffered sample on later ticks does not count.

use heapless::Vec;

use crate::{
    buffer::SampleBuffer,
    config::{Band, EnvironmentConfig},
    debounce::Debouncer,
    time::Timestamp,
};

use super::{MonitorEvent, Transition};

/// Environmental quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnvChannel {
    /// Air temperature (°C)
    Temperature,
    /// Relative humidity (%)
    Humidity,
}

impl EnvChannel {
    /// Lower-case wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }
}

/// State of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnvChannelState {
    /// Within the band (inclusive)
    InRange,
    /// Above the band
    TooHigh,
    /// Below the band
    TooLow,
    /// No fresh sample
    #[default]
    Unknown,
}

impl EnvChannelState {
    /// Upper-case wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InRange => "NORMAL",
            Self::TooHigh => "HIGH",
            Self::TooLow => "LOW",
            Self::Unknown => "UNKNOWN",
        }
    }

    fn classify(value: f32, band: &Band) -> Self {
        if value > band.high {
            Self::TooHigh
        } else if value < band.low {
            Self::TooLow
        } else {
            Self::InRange
        }
    }
}

/// Debounced band state of one channel
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    channel: EnvChannel,
    band: Band,
    committed: EnvChannelState,
    debouncer: Debouncer<EnvChannelState>,
    last_sequence: Option<u32>,
}

impl ChannelMonitor {
    /// Create for one channel
    pub fn new(channel: EnvChannel, band: Band, confirm_samples: u8) -> Self {
        Self {
            channel,
            band,
            committed: EnvChannelState::Unknown,
            debouncer: Debouncer::new(confirm_samples),
            last_sequence: None,
        }
    }

    /// Evaluate the channel buffer on a tick
    pub fn evaluate(&mut self, buffer: &SampleBuffer<f32>, now: Timestamp) -> Option<MonitorEvent> {
        let Some(sample) = buffer.fresh(now) else {
            self.debouncer.reset();
            if self.committed == EnvChannelState::Unknown {
                return None;
            }
            return Some(self.commit(EnvChannelState::Unknown, None, now));
        };

        if self.last_sequence == Some(buffer.sequence()) {
            return None;
        }
        self.last_sequence = Some(buffer.sequence());

        let value = sample.value;
        let candidate = EnvChannelState::classify(value, &self.band);
        let next = self.debouncer.observe(self.committed, candidate)?;
        Some(self.commit(next, Some(value), now))
    }

    fn commit(&mut self, to: EnvChannelState, value: Option<f32>, now: Timestamp) -> MonitorEvent {
        let transition = Transition::new(self.committed, to, now);
        self.committed = to;
        cg_debug!("{} {:?} -> {:?}", self.channel.as_str(), transition.from, transition.to);
        MonitorEvent::Environment { channel: self.channel, transition, value }
    }

    /// Committed state
    pub fn state(&self) -> EnvChannelState {
        self.committed
    }
}

/// Both environmental channels
#[derive(Debug, Clone)]
pub struct EnvironmentalMonitor {
    temperature: ChannelMonitor,
    humidity: ChannelMonitor,
}

impl EnvironmentalMonitor {
    /// Create from validated configuration
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            temperature: ChannelMonitor::new(EnvChannel::Temperature, config.temperature, config.confirm_samples),
            humidity: ChannelMonitor::new(EnvChannel::Humidity, config.humidity, config.confirm_samples),
        }
    }

    /// Evaluate both channels; temperature first
    pub fn evaluate(
        &mut self,
        temperature: &SampleBuffer<f32>,
        humidity: &SampleBuffer<f32>,
        now: Timestamp,
    ) -> Vec<MonitorEvent, 2> {
        let mut events = Vec::new();
        for event in [self.temperature.evaluate(temperature, now), self.humidity.evaluate(humidity, now)]
            .into_iter()
            .flatten()
        {
            // Two channels, two slots
            let _ = events.push(event);
        }
        events
    }

    /// Temperature channel state
    pub fn temperature(&self) -> EnvChannelState {
        self.temperature.state()
    }

    /// Humidity channel state
    pub fn humidity(&self) -> EnvChannelState {
        self.humidity.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReadingResult;

    fn any(_: &f32) -> ReadingResult<()> {
        Ok(())
    }

    fn settled() -> (SampleBuffer<f32>, ChannelMonitor) {
        let mut buffer = SampleBuffer::new(2_000, any);
        let mut monitor = ChannelMonitor::new(EnvChannel::Temperature, Band::new(15.0, 35.0), 2);
        buffer.push(22.0, 0, true).unwrap();
        monitor.evaluate(&buffer, 0);
        buffer.push(22.0, 2_000, true).unwrap();
        monitor.evaluate(&buffer, 2_000);
        assert_eq!(monitor.state(), EnvChannelState::InRange);
        (buffer, monitor)
    }

    #[test]
    fn single_excursion_is_ignored() {
        let (mut buffer, mut monitor) = settled();
        buffer.push(40.0, 4_000, true).unwrap();
        assert_eq!(monitor.evaluate(&buffer, 4_000), None);
        buffer.push(25.0, 6_000, true).unwrap();
        assert_eq!(monitor.evaluate(&buffer, 6_000), None);
        assert_eq!(monitor.state(), EnvChannelState::InRange);
    }

    #[test]
    fn two_consecutive_excursions_transition_once() {
        let (mut buffer, mut monitor) = settled();
        buffer.push(40.0, 4_000, true).unwrap();
        assert_eq!(monitor.evaluate(&buffer, 4_000), None);
        buffer.push(41.0, 6_000, true).unwrap();
        assert!(monitor.evaluate(&buffer, 6_000).is_some());
        buffer.push(42.0, 8_000, true).unwrap();
        assert_eq!(monitor.evaluate(&buffer, 8_000), None);
        assert_eq!(monitor.state(), EnvChannelState::TooHigh);
    }

    #[test]
    fn same_sample_twice_does_not_confirm() {
        let (mut buffer, mut monitor) = settled();
        buffer.push(10.0, 4_000, true).unwrap();
        assert_eq!(monitor.evaluate(&buffer, 4_000), None);
        assert_eq!(monitor.evaluate(&buffer, 4_500), None);
        assert_eq!(monitor.state(), EnvChannelState::InRange);
    }

    #[test]
    fn band_edges_are_in_range() {
        let band = Band::new(15.0, 35.0);
        assert_eq!(EnvChannelState::classify(15.0, &band), EnvChannelState::InRange);
        assert_eq!(EnvChannelState::classify(35.0, &band), EnvChannelState::InRange);
        assert_eq!(EnvChannelState::classify(35.1, &band), EnvChannelState::TooHigh);
        assert_eq!(EnvChannelState::classify(14.9, &band), EnvChannelState::TooLow);
    }

    #[test]
    fn channels_are_independent() {
        let config = EnvironmentConfig::default();
        let mut monitor = EnvironmentalMonitor::new(&config);
        let mut temperature = SampleBuffer::new(config.read_interval_ms, any);
        let mut humidity = SampleBuffer::new(config.read_interval_ms, any);

        for (t, (temp, hum)) in [(22.0, 50.0), (22.0, 50.0), (36.0, 90.0), (37.0, 91.0)].into_iter().enumerate() {
            let now = t as u64 * 2_000;
            temperature.push(temp, now, true).unwrap();
            humidity.push(hum, now, true).unwrap();
            let events = monitor.evaluate(&temperature, &humidity, now);
            match t {
                1 | 3 => assert_eq!(events.len(), 2),
                _ => assert!(events.is_empty()),
            }
        }
        assert_eq!(monitor.temperature(), EnvChannelState::TooHigh);
        assert_eq!(monitor.humidity(), EnvChannelState::TooHigh);
    }

    #[test]
    fn stale_channel_reports_unknown() {
        let (buffer, mut monitor) = settled();
        assert!(monitor.evaluate(&buffer, 60_000).is_some());
        assert_eq!(monitor.state(), EnvChannelState::Unknown);
    }
}
