//! Per-sensor sample storage
//!
//! ## Overview
//!
//! Two containers, both fixed-size and allocation free:
//!
//! - [`SampleBuffer`]: the latest valid reading of one sensor plus what is
//!   needed to judge its freshness. Drivers write into it on their own
//!   cadence; monitors read it on every tick.
//! - [`RollingWindow`]: a ring of recent acceleration deviations used by the
//!   activity classifier. When full it overwrites the oldest value.
//!
//! ## Staleness
//!
//! A buffer is stale when it has never held a sample, or when its latest
//! sample is older than `3 ×` the sensor's expected interval. Stale input is
//! not an error; the owning monitor reports `Unknown` instead.
//!
//! ```text
//! expected interval = 1000 ms
//!
//! sample @ 10_000        tick @ 12_500   tick @ 13_000   tick @ 13_001
//!        │                    fresh           fresh           STALE
//!        └──────── 3 000 ms ───────────────────────┘
//! ```

use crate::{
    constants::STALE_INTERVAL_FACTOR,
    errors::{ReadingError, ReadingResult},
    time::{elapsed_ms, Timestamp},
};

/// One reading with its capture time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample<T> {
    /// Sensor value
    pub value: T,
    /// Capture time (ms since boot)
    pub timestamp: Timestamp,
    /// Driver-reported validity
    pub valid: bool,
}

/// Plausibility check run on every incoming value
pub type SampleCheck<T> = fn(&T) -> ReadingResult<()>;

/// Latest valid reading of one sensor
///
/// Rejected samples never overwrite the buffered one; they only bump the
/// rejection counter.
#[derive(Debug, Clone)]
pub struct SampleBuffer<T: Copy> {
    latest: Option<Sample<T>>,
    expected_interval_ms: u64,
    sequence: u32,
    accepted: u32,
    rejected: u32,
    check: SampleCheck<T>,
}

impl<T: Copy> SampleBuffer<T> {
    /// Create an empty buffer
    pub fn new(expected_interval_ms: u64, check: SampleCheck<T>) -> Self {
        Self {
            latest: None,
            expected_interval_ms,
            sequence: 0,
            accepted: 0,
            rejected: 0,
            check,
        }
    }

    /// Offer a new reading
    ///
    /// The reading is refused when the driver flagged it, when it is older
    /// than the buffered sample, or when it fails the plausibility check.
    pub fn push(&mut self, value: T, timestamp: Timestamp, valid: bool) -> ReadingResult<()> {
        let result = self.admit(&value, timestamp, valid);
        match result {
            Ok(()) => {
                self.latest = Some(Sample { value, timestamp, valid });
                self.sequence = self.sequence.wrapping_add(1);
                self.accepted = self.accepted.saturating_add(1);
            }
            Err(_) => self.rejected = self.rejected.saturating_add(1),
        }
        result
    }

    fn admit(&self, value: &T, timestamp: Timestamp, valid: bool) -> ReadingResult<()> {
        if !valid {
            return Err(ReadingError::Flagged);
        }
        if let Some(latest) = &self.latest {
            if timestamp < latest.timestamp {
                return Err(ReadingError::OutOfOrder { timestamp, latest: latest.timestamp });
            }
        }
        (self.check)(value)
    }

    /// Latest accepted sample
    pub fn latest(&self) -> Option<&Sample<T>> {
        self.latest.as_ref()
    }

    /// Latest accepted sample, only if still fresh at `now`
    pub fn fresh(&self, now: Timestamp) -> Option<&Sample<T>> {
        if self.is_stale(now) {
            None
        } else {
            self.latest.as_ref()
        }
    }

    /// No sample yet, or the latest is older than the staleness horizon
    pub fn is_stale(&self, now: Timestamp) -> bool {
        match &self.latest {
            None => true,
            Some(sample) => elapsed_ms(sample.timestamp, now) > self.stale_after_ms(),
        }
    }

    /// Age of the latest sample
    pub fn age_ms(&self, now: Timestamp) -> Option<u64> {
        self.latest.as_ref().map(|s| elapsed_ms(s.timestamp, now))
    }

    /// Staleness horizon
    pub fn stale_after_ms(&self) -> u64 {
        self.expected_interval_ms.saturating_mul(STALE_INTERVAL_FACTOR)
    }

    /// Incremented on every accepted sample; lets monitors tell new data apart
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Accepted sample count
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Rejected sample count
    pub fn rejected(&self) -> u32 {
        self.rejected
    }
}

/// Fixed-capacity ring of recent values
///
/// `N` is the compile-time capacity; `limit` (≤ N) is the configured window
/// length. Iteration runs oldest to newest.
#[derive(Debug, Clone)]
pub struct RollingWindow<const N: usize> {
    data: [f32; N],
    write_pos: usize,
    len: usize,
    limit: usize,
}

impl<const N: usize> RollingWindow<N> {
    /// Create a window holding at most `limit` values (clamped to `1..=N`)
    pub fn new(limit: usize) -> Self {
        Self {
            data: [0.0; N],
            write_pos: 0,
            len: 0,
            limit: limit.clamp(1, N),
        }
    }

    /// Append, overwriting the oldest value when full
    pub fn push(&mut self, value: f32) {
        self.data[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.limit;
        if self.len < self.limit {
            self.len += 1;
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Configured window length
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop every value
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Most recent value
    pub fn last(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let idx = if self.write_pos == 0 { self.limit - 1 } else { self.write_pos - 1 };
        Some(self.data[idx])
    }

    /// Values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        // Until the window wraps the oldest value sits at index 0
        let start = if self.len < self.limit { 0 } else { self.write_pos };
        (0..self.len).map(move |i| self.data[(start + i) % self.limit])
    }

    /// Largest stored value
    pub fn peak(&self) -> Option<f32> {
        self.iter().fold(None, |acc, v| match acc {
            Some(max) if max >= v => Some(max),
            _ => Some(v),
        })
    }

    /// Mean absolute difference between successive values
    ///
    /// `None` with fewer than two values.
    pub fn mean_abs_diff(&self) -> Option<f32> {
        if self.len < 2 {
            return None;
        }
        let mut prev: Option<f32> = None;
        let mut total = 0.0f32;
        for value in self.iter() {
            if let Some(p) = prev {
                total += libm::fabsf(value - p);
            }
            prev = Some(value);
        }
        Some(total / (self.len - 1) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite(v: &f32) -> ReadingResult<()> {
        if v.is_finite() { Ok(()) } else { Err(ReadingError::NotFinite) }
    }

    #[test]
    fn empty_buffer_is_stale() {
        let buffer = SampleBuffer::<f32>::new(1000, finite);
        assert!(buffer.is_stale(0));
        assert!(buffer.latest().is_none());
        assert!(buffer.age_ms(5).is_none());
    }

    #[test]
    fn staleness_horizon_is_three_intervals() {
        let mut buffer = SampleBuffer::<f32>::new(1000, finite);
        buffer.push(1.0, 10_000, true).unwrap();

        assert!(!buffer.is_stale(13_000));
        assert!(buffer.is_stale(13_001));
        assert!(buffer.fresh(13_001).is_none());
        assert_eq!(buffer.age_ms(12_000), Some(2_000));
    }

    #[test]
    fn rejected_samples_keep_previous_value() {
        let mut buffer = SampleBuffer::<f32>::new(100, finite);
        buffer.push(1.0, 100, true).unwrap();

        assert_eq!(buffer.push(f32::NAN, 200, true), Err(ReadingError::NotFinite));
        assert_eq!(buffer.push(2.0, 300, false), Err(ReadingError::Flagged));
        assert_eq!(
            buffer.push(3.0, 50, true),
            Err(ReadingError::OutOfOrder { timestamp: 50, latest: 100 })
        );

        let latest = buffer.latest().unwrap();
        assert_eq!(latest.value, 1.0);
        assert_eq!(latest.timestamp, 100);
        assert_eq!(buffer.accepted(), 1);
        assert_eq!(buffer.rejected(), 3);
        assert_eq!(buffer.sequence(), 1);
    }

    #[test]
    fn window_overwrites_oldest() {
        let mut window = RollingWindow::<8>::new(3);
        for i in 0..5 {
            window.push(i as f32);
        }

        assert_eq!(window.len(), 3);
        let values: Vec<f32> = window.iter().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(window.last(), Some(4.0));
        assert_eq!(window.peak(), Some(4.0));
    }

    #[test]
    fn window_limit_is_clamped() {
        assert_eq!(RollingWindow::<4>::new(10).limit(), 4);
        assert_eq!(RollingWindow::<4>::new(0).limit(), 1);
    }

    #[test]
    fn mean_abs_diff_measures_jitter() {
        let mut window = RollingWindow::<8>::new(8);
        assert_eq!(window.mean_abs_diff(), None);

        for v in [0.0, 0.1, 0.0, 0.1, 0.0] {
            window.push(v);
        }
        let jitter = window.mean_abs_diff().unwrap();
        assert!((jitter - 0.1).abs() < 1e-6);

        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.peak(), None);
    }
}
