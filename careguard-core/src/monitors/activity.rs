//! Activity classification from acceleration magnitude
//!
//! ## Overview
//!
//! Every IMU sample is turned into a deviation from the 1 g resting
//! baseline, `|m − 1|`, and pushed into a short rolling window. On each tick
//! the window is classified against strictly ordered thresholds:
//!
//! ```text
//! deviation (g)
//!   fall ─────────────  single sample arms a pending fall
//!   run  ─────────────  window peak ≥ run   → Running
//!   step ─────────────  window peak ≥ step  → Walking
//!         dead band     no candidate, committed state holds
//!   rest ─────────────  window peak < rest  → Trembling if jittery, else Resting
//! ```
//!
//! ## Debounce
//!
//! Ordinary state changes are committed only after the same candidate has
//! been produced on `confirm_evaluations` consecutive ticks. Falls take a
//! separate path: the impact sample arms a pending fall that latches once
//! `fall_confirm_samples` further fresh samples have arrived. A latched fall
//! is only cleared by [`ActivityClassifier::acknowledge_fall`].
//!
//! ## Stale input
//!
//! With no IMU sample inside `3 ×` the read interval the classifier reports
//! `Unknown`, drops its window and any pending fall, and stops counting
//! steps. A latched fall survives staleness.

use crate::{
    buffer::RollingWindow,
    config::ActivityConfig,
    constants::{ACTIVITY_WINDOW_CAPACITY, STANDARD_GRAVITY_G},
    debounce::Debouncer,
    time::{elapsed_ms, Timestamp},
};

use super::{MonitorEvent, Transition};

/// Discrete activity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivityState {
    /// Below the rest threshold, steady
    Resting,
    /// Stride-level movement
    Walking,
    /// Run-level movement
    Running,
    /// Impact detected and latched
    Falling,
    /// Below the rest threshold but jittery
    Trembling,
    /// No fresh IMU data
    #[default]
    Unknown,
}

impl ActivityState {
    /// Anything other than Resting/Unknown refreshes the no-motion watchdog
    pub const fn is_qualifying_motion(self) -> bool {
        !matches!(self, Self::Resting | Self::Unknown)
    }

    /// Walking or running; accrues active time
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Walking | Self::Running)
    }

    /// Lower-case wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resting => "resting",
            Self::Walking => "walking",
            Self::Running => "running",
            Self::Falling => "falling",
            Self::Trembling => "trembling",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingFall {
    peak_g: f32,
    remaining: u8,
}

/// Activity state machine, step counter and fall latch
#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    config: ActivityConfig,
    window: RollingWindow<ACTIVITY_WINDOW_CAPACITY>,
    committed: ActivityState,
    debouncer: Debouncer<ActivityState>,
    pending_fall: Option<PendingFall>,
    latched_fall: Option<f32>,
    above_step: bool,
    steps: u32,
    period_steps: u32,
    period_active_ms: u64,
    last_tick: Option<Timestamp>,
}

impl ActivityClassifier {
    /// Create from validated configuration
    pub fn new(config: &ActivityConfig) -> Self {
        Self {
            config: *config,
            window: RollingWindow::new(config.window_len),
            committed: ActivityState::Unknown,
            debouncer: Debouncer::new(config.confirm_evaluations),
            pending_fall: None,
            latched_fall: None,
            above_step: false,
            steps: 0,
            period_steps: 0,
            period_active_ms: 0,
            last_tick: None,
        }
    }

    /// Consume one accepted acceleration magnitude sample
    ///
    /// Called for every sample, not once per tick, so short impacts and
    /// strides between ticks are never missed.
    pub fn ingest(&mut self, magnitude_g: f32) {
        let deviation = libm::fabsf(magnitude_g - STANDARD_GRAVITY_G);
        self.window.push(deviation);

        // Rising edge through the stride threshold counts one step; impacts
        // and anything while a fall is latched do not
        let above = deviation >= self.config.step_threshold_g;
        let impact = deviation >= self.config.fall_threshold_g;
        if above && !self.above_step && !impact && self.latched_fall.is_none() {
            self.steps = self.steps.saturating_add(1);
            self.period_steps = self.period_steps.saturating_add(1);
        }
        self.above_step = above;

        if self.latched_fall.is_some() {
            return;
        }

        if let Some(pending) = self.pending_fall.as_mut() {
            pending.peak_g = pending.peak_g.max(deviation);
            pending.remaining = pending.remaining.saturating_sub(1);
            if pending.remaining == 0 {
                self.latched_fall = Some(pending.peak_g);
                self.pending_fall = None;
            }
            return;
        }

        if deviation >= self.config.fall_threshold_g {
            cg_debug!("impact {} g armed pending fall", deviation);
            if self.config.fall_confirm_samples == 0 {
                self.latched_fall = Some(deviation);
            } else {
                self.pending_fall = Some(PendingFall {
                    peak_g: deviation,
                    remaining: self.config.fall_confirm_samples,
                });
            }
        }
    }

    /// Evaluate on a tick
    ///
    /// `imu_stale` is the staleness of the motion buffer at `now`.
    pub fn evaluate(&mut self, imu_stale: bool, now: Timestamp) -> Option<MonitorEvent> {
        self.accrue_active_time(now);

        if let Some(peak) = self.latched_fall {
            if self.committed != ActivityState::Falling {
                cg_warn!("fall latched, peak deviation {} g", peak);
                return Some(self.commit(ActivityState::Falling, peak, now));
            }
            return None;
        }

        if imu_stale {
            self.window.clear();
            self.pending_fall = None;
            self.debouncer.reset();
            self.above_step = false;
            if self.committed != ActivityState::Unknown {
                return Some(self.commit(ActivityState::Unknown, 0.0, now));
            }
            return None;
        }

        let (candidate, magnitude) = self.candidate()?;
        let next = self.debouncer.observe(self.committed, candidate)?;
        Some(self.commit(next, magnitude, now))
    }

    fn candidate(&self) -> Option<(ActivityState, f32)> {
        let peak = self.window.peak()?;
        let c = &self.config;

        let state = if peak >= c.run_threshold_g {
            ActivityState::Running
        } else if peak >= c.step_threshold_g {
            ActivityState::Walking
        } else if peak < c.rest_threshold_g {
            match self.window.mean_abs_diff() {
                Some(jitter) if jitter >= c.tremble_threshold_g => ActivityState::Trembling,
                _ => ActivityState::Resting,
            }
        } else {
            return None;
        };
        Some((state, peak))
    }

    fn commit(&mut self, to: ActivityState, magnitude_g: f32, now: Timestamp) -> MonitorEvent {
        let transition = Transition::new(self.committed, to, now);
        self.committed = to;
        self.debouncer.reset();
        cg_debug!("activity {:?} -> {:?}", transition.from, transition.to);
        MonitorEvent::Activity { transition, magnitude_g }
    }

    fn accrue_active_time(&mut self, now: Timestamp) {
        if let Some(last) = self.last_tick {
            if self.committed.is_active() {
                self.period_active_ms = self.period_active_ms.saturating_add(elapsed_ms(last, now));
            }
        }
        self.last_tick = Some(now);
    }

    /// Clear a committed fall
    ///
    /// Returns the Falling → Resting transition. A fall that is still being
    /// confirmed, or latched but not yet reported by [`Self::evaluate`], is
    /// left alone and `None` is returned. The classifier starts over from an
    /// empty window.
    pub fn acknowledge_fall(&mut self, now: Timestamp) -> Option<MonitorEvent> {
        if self.committed != ActivityState::Falling {
            return None;
        }
        self.pending_fall = None;
        let peak = self.latched_fall.take();
        self.window.clear();
        self.above_step = false;
        cg_info!("fall acknowledged");
        Some(self.commit(ActivityState::Resting, peak.unwrap_or(0.0), now))
    }

    /// Peak impact of the latched fall while it is committed
    pub fn fall_ongoing(&self) -> Option<f32> {
        match self.committed {
            ActivityState::Falling => self.latched_fall,
            _ => None,
        }
    }

    /// Committed state
    pub fn state(&self) -> ActivityState {
        self.committed
    }

    /// A fall is latched (committed or about to be on the next tick)
    pub fn fall_latched(&self) -> bool {
        self.latched_fall.is_some()
    }

    /// Steps since boot
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Steps and active time accumulated in the current summary period
    pub fn period(&self) -> (u32, u64) {
        (self.period_steps, self.period_active_ms)
    }

    /// Start a new summary period
    pub fn reset_period(&mut self) {
        self.period_steps = 0;
        self.period_active_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ActivityConfig {
        ActivityConfig {
            window_len: 4,
            confirm_evaluations: 2,
            fall_confirm_samples: 1,
            ..ActivityConfig::default()
        }
    }

    fn feed(c: &mut ActivityClassifier, samples: &[f32]) {
        for &s in samples {
            c.ingest(s);
        }
    }

    fn state_after(c: &mut ActivityClassifier, now: Timestamp) -> Option<ActivityState> {
        match c.evaluate(false, now) {
            Some(MonitorEvent::Activity { transition, .. }) => Some(transition.to),
            _ => None,
        }
    }

    #[test]
    fn resting_requires_two_evaluations() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0, 1.01, 1.0, 1.01]);

        assert_eq!(state_after(&mut c, 100), None);
        assert_eq!(state_after(&mut c, 200), Some(ActivityState::Resting));
        assert_eq!(c.state(), ActivityState::Resting);
    }

    #[test]
    fn walking_and_running_by_peak_deviation() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0, 2.3, 1.0, 1.1]); // peak 1.3 ≥ step 1.15
        c.evaluate(false, 100);
        assert_eq!(state_after(&mut c, 200), Some(ActivityState::Walking));

        feed(&mut c, &[2.9, 1.0, 1.0, 1.0]); // peak 1.9 ≥ run 1.8
        c.evaluate(false, 300);
        assert_eq!(state_after(&mut c, 400), Some(ActivityState::Running));
    }

    #[test]
    fn jitter_below_rest_is_trembling() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0, 1.1, 1.0, 1.1]); // peak 0.1, jitter 0.1
        c.evaluate(false, 100);
        assert_eq!(state_after(&mut c, 200), Some(ActivityState::Trembling));
    }

    #[test]
    fn dead_band_holds_committed_state() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0; 4]);
        c.evaluate(false, 100);
        c.evaluate(false, 200);
        assert_eq!(c.state(), ActivityState::Resting);

        feed(&mut c, &[1.5, 1.5, 1.5, 1.5]); // 0.5: between rest and step
        assert_eq!(state_after(&mut c, 300), None);
        assert_eq!(state_after(&mut c, 400), None);
        assert_eq!(c.state(), ActivityState::Resting);
    }

    #[test]
    fn spike_latches_fall_until_acknowledged() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0; 4]);
        c.evaluate(false, 100);
        c.evaluate(false, 200);

        c.ingest(3.8); // deviation 2.8
        assert_eq!(state_after(&mut c, 250), None, "needs a confirming sample");
        c.ingest(1.0);
        assert_eq!(state_after(&mut c, 300), Some(ActivityState::Falling));

        feed(&mut c, &[1.0; 8]);
        for t in 4..10 {
            assert_eq!(c.evaluate(false, t * 100), None);
        }
        // Staleness does not clear the latch
        assert_eq!(c.evaluate(true, 5_000), None);
        assert_eq!(c.state(), ActivityState::Falling);
        assert!(c.fall_ongoing().is_some());

        match c.acknowledge_fall(6_000) {
            Some(MonitorEvent::Activity { transition, .. }) => {
                assert_eq!(transition.from, ActivityState::Falling);
                assert_eq!(transition.to, ActivityState::Resting);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!c.fall_latched());
    }

    #[test]
    fn impact_is_not_a_step() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0; 4]);
        c.ingest(4.0);
        feed(&mut c, &[1.0, 1.0]);
        assert_eq!(c.steps(), 0);
        assert!(c.fall_latched());

        // Strides while the fall is latched are not counted either
        feed(&mut c, &[2.3, 1.0, 2.3, 1.0]);
        assert_eq!(c.steps(), 0);
        assert_eq!(c.period().0, 0);
    }

    #[test]
    fn unreported_fall_survives_acknowledge() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0; 4]);
        c.evaluate(false, 100);
        c.evaluate(false, 200);

        c.ingest(3.8);
        c.ingest(1.0);
        assert!(c.fall_latched());
        assert_eq!(c.acknowledge_fall(250), None);
        assert!(c.fall_latched(), "latch kept until reported");
        assert_eq!(state_after(&mut c, 300), Some(ActivityState::Falling));
        assert!(c.acknowledge_fall(400).is_some());
        assert!(!c.fall_latched());
    }

    #[test]
    fn pending_fall_dropped_when_stale() {
        let mut c = ActivityClassifier::new(&config());
        c.ingest(3.8);
        assert_eq!(c.evaluate(true, 1_000), None);
        c.ingest(1.0);
        assert!(!c.fall_latched());
    }

    #[test]
    fn stale_reports_unknown() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0; 4]);
        c.evaluate(false, 100);
        c.evaluate(false, 200);

        assert_eq!(
            c.evaluate(true, 1_000).map(|e| match e {
                MonitorEvent::Activity { transition, .. } => transition.to,
                _ => unreachable!(),
            }),
            Some(ActivityState::Unknown)
        );
        assert_eq!(c.evaluate(true, 1_100), None);
    }

    #[test]
    fn steps_count_rising_edges() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[1.0, 2.3, 2.4, 1.0, 2.3, 1.0, 0.9]);
        assert_eq!(c.steps(), 2);
        assert_eq!(c.period().0, 2);
        c.reset_period();
        assert_eq!(c.period(), (0, 0));
        assert_eq!(c.steps(), 2);
    }

    #[test]
    fn active_time_accrues_while_walking() {
        let mut c = ActivityClassifier::new(&config());
        feed(&mut c, &[2.3, 1.0, 2.3, 1.0]);
        c.evaluate(false, 0);
        c.evaluate(false, 100); // commits Walking
        feed(&mut c, &[2.3, 1.0]);
        c.evaluate(false, 600);
        assert_eq!(c.period().1, 500);
    }
}
