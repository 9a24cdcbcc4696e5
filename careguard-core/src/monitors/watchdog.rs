//! No-motion watchdog
//!
//! Tracks when qualifying motion was last seen. The watchdog arms on the
//! first tick, fires once when the silence exceeds the timeout, and stays
//! quiet until motion resumes, at which point it reports how long the
//! silence lasted and re-arms.

use crate::{
    config::WatchdogConfig,
    time::{elapsed_ms, Timestamp},
};

use super::activity::ActivityState;

/// Watchdog output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogEvent {
    /// Silence exceeded the timeout
    Timeout {
        /// Silence so far
        elapsed_ms: u64,
        /// Tick that detected it
        at: Timestamp,
    },
    /// Motion seen again after a timeout
    MotionResumed {
        /// Total silence
        silent_ms: u64,
        /// Tick that detected it
        at: Timestamp,
    },
}

impl WatchdogEvent {
    /// Tick that produced the event
    pub fn at(&self) -> Timestamp {
        match self {
            Self::Timeout { at, .. } | Self::MotionResumed { at, .. } => *at,
        }
    }
}

/// One-shot inactivity timer
#[derive(Debug, Clone)]
pub struct NoMotionWatchdog {
    timeout_ms: u64,
    last_motion: Option<Timestamp>,
    fired: bool,
}

impl NoMotionWatchdog {
    /// Create from validated configuration
    pub fn new(config: &WatchdogConfig) -> Self {
        Self { timeout_ms: config.timeout_ms, last_motion: None, fired: false }
    }

    /// Evaluate against the committed activity state
    pub fn evaluate(&mut self, activity: ActivityState, now: Timestamp) -> Option<WatchdogEvent> {
        let last = *self.last_motion.get_or_insert(now);

        if activity.is_qualifying_motion() {
            self.last_motion = Some(now);
            if self.fired {
                self.fired = false;
                let silent_ms = elapsed_ms(last, now);
                cg_info!("motion resumed after {} ms", silent_ms);
                return Some(WatchdogEvent::MotionResumed { silent_ms, at: now });
            }
            return None;
        }

        let elapsed = elapsed_ms(last, now);
        if !self.fired && elapsed > self.timeout_ms {
            self.fired = true;
            cg_warn!("no motion for {} ms", elapsed);
            return Some(WatchdogEvent::Timeout { elapsed_ms: elapsed, at: now });
        }
        None
    }

    /// Silence so far (zero before the first tick)
    pub fn silence_ms(&self, now: Timestamp) -> u64 {
        self.last_motion.map(|last| elapsed_ms(last, now)).unwrap_or(0)
    }

    /// Timeout has fired and motion has not resumed yet
    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
