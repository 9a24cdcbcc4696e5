//! Debounce primitives shared by the monitors
//!
//! [`Debouncer`] requires a candidate state to be observed on `required`
//! consecutive evaluations before it replaces the committed state.
//! [`DwellTimer`] requires a condition to hold continuously for a duration.

use crate::time::{elapsed_ms, Timestamp};

/// Consecutive-evaluation debounce
#[derive(Debug, Clone, Copy)]
pub struct Debouncer<S: Copy + PartialEq> {
    pending: Option<S>,
    count: u8,
    required: u8,
}

impl<S: Copy + PartialEq> Debouncer<S> {
    /// Create a debouncer; `required` is clamped to at least 1
    pub fn new(required: u8) -> Self {
        Self { pending: None, count: 0, required: required.max(1) }
    }

    /// Feed one evaluation
    ///
    /// Returns the new state when `candidate` has now been seen `required`
    /// times in a row. Seeing the committed state again, or a different
    /// candidate, restarts the count.
    pub fn observe(&mut self, committed: S, candidate: S) -> Option<S> {
        if candidate == committed {
            self.reset();
            return None;
        }

        if self.pending == Some(candidate) {
            self.count = self.count.saturating_add(1);
        } else {
            self.pending = Some(candidate);
            self.count = 1;
        }

        if self.count >= self.required {
            self.reset();
            Some(candidate)
        } else {
            None
        }
    }

    /// Forget any pending candidate
    pub fn reset(&mut self) {
        self.pending = None;
        self.count = 0;
    }

    /// Candidate currently being confirmed
    pub fn pending(&self) -> Option<S> {
        self.pending
    }
}

/// Continuous-duration condition timer
#[derive(Debug, Clone, Copy)]
pub struct DwellTimer {
    since: Option<Timestamp>,
    dwell_ms: u64,
}

impl DwellTimer {
    /// Create a timer for `dwell_ms`
    pub fn new(dwell_ms: u64) -> Self {
        Self { since: None, dwell_ms }
    }

    /// Report whether `condition` has held for at least the dwell time
    pub fn observe(&mut self, condition: bool, now: Timestamp) -> bool {
        if !condition {
            self.since = None;
            return false;
        }
        let since = *self.since.get_or_insert(now);
        elapsed_ms(since, now) >= self.dwell_ms
    }

    /// Restart from scratch
    pub fn reset(&mut self) {
        self.since = None;
    }

    /// When the condition started holding
    pub fn since(&self) -> Option<Timestamp> {
        self.since
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level {
        Low,
        High,
        Mid,
    }

    #[test]
    fn commits_after_required_evaluations() {
        let mut d = Debouncer::new(2);
        assert_eq!(d.observe(Level::Low, Level::High), None);
        assert_eq!(d.pending(), Some(Level::High));
        assert_eq!(d.observe(Level::Low, Level::High), Some(Level::High));
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn returning_to_committed_resets() {
        let mut d = Debouncer::new(2);
        d.observe(Level::Low, Level::High);
        assert_eq!(d.observe(Level::Low, Level::Low), None);
        assert_eq!(d.observe(Level::Low, Level::High), None);
    }

    #[test]
    fn changing_candidate_restarts_count() {
        let mut d = Debouncer::new(2);
        d.observe(Level::Low, Level::High);
        assert_eq!(d.observe(Level::Low, Level::Mid), None);
        assert_eq!(d.observe(Level::Low, Level::Mid), Some(Level::Mid));
    }

    #[test]
    fn zero_requirement_behaves_as_one() {
        let mut d = Debouncer::new(0);
        assert_eq!(d.observe(Level::Low, Level::High), Some(Level::High));
    }

    #[test]
    fn dwell_requires_continuous_condition() {
        let mut t = DwellTimer::new(3_000);
        assert!(!t.observe(true, 1_000));
        assert!(!t.observe(true, 3_999));
        assert!(t.observe(true, 4_000));

        // Interruption restarts the dwell
        assert!(!t.observe(false, 4_100));
        assert!(!t.observe(true, 4_200));
        assert_eq!(t.since(), Some(4_200));
        assert!(t.observe(true, 7_200));
    }
}
