//! Proximity and bed-exit detection from a ToF distance sensor
//!
//! The sensor points at the bed or chair. A short distance means someone is
//! close to the device (Near); a long distance held for the dwell time
//! means the person has left (BedExit).
//!
//! ```text
//!  0        near  near+h         far-h  far        max
//!  ├─ Near ──┤·····│─── Far ──────│·····├─ BedExit ─┤ beyond: no target
//! ```
//!
//! The dotted bands are hysteresis: once Near, the distance has to reach
//! `near + hysteresis_mm` to leave; once BedExit, it has to come back to
//! `far − hysteresis_mm`.

use crate::{
    buffer::SampleBuffer,
    config::ProximityConfig,
    debounce::{Debouncer, DwellTimer},
    time::Timestamp,
};

use super::{MonitorEvent, Transition};

/// Proximity zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProximityState {
    /// Target closer than the near threshold
    Near,
    /// Between near and far, or far but not yet for the dwell time
    Far,
    /// Beyond far (or no target) for the dwell time
    BedExit,
    /// No fresh distance data
    #[default]
    Unknown,
}

impl ProximityState {
    /// Upper-case wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Near => "NEAR",
            Self::Far => "FAR",
            Self::BedExit => "BED_EXIT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Near/Far/BedExit state machine
#[derive(Debug, Clone)]
pub struct ProximityMonitor {
    config: ProximityConfig,
    committed: ProximityState,
    debouncer: Debouncer<ProximityState>,
    dwell: DwellTimer,
}

impl ProximityMonitor {
    /// Create from validated configuration
    pub fn new(config: &ProximityConfig) -> Self {
        Self {
            config: *config,
            committed: ProximityState::Unknown,
            debouncer: Debouncer::new(config.confirm_evaluations),
            dwell: DwellTimer::new(config.bed_exit_dwell_ms),
        }
    }

    /// Evaluate the distance buffer on a tick
    pub fn evaluate(&mut self, buffer: &SampleBuffer<f32>, now: Timestamp) -> Option<MonitorEvent> {
        let Some(sample) = buffer.fresh(now) else {
            self.debouncer.reset();
            self.dwell.reset();
            if self.committed == ProximityState::Unknown {
                return None;
            }
            return Some(self.commit(ProximityState::Unknown, None, now));
        };

        let distance = self.target_distance(sample.value);
        let candidate = self.candidate(distance, now);

        if candidate == ProximityState::BedExit {
            // The dwell timer already provided the debounce
            self.debouncer.reset();
            if self.committed == ProximityState::BedExit {
                return None;
            }
            return Some(self.commit(candidate, distance, now));
        }

        let next = self.debouncer.observe(self.committed, candidate)?;
        Some(self.commit(next, distance, now))
    }

    /// `None` when nothing is in range
    fn target_distance(&self, raw_mm: f32) -> Option<f32> {
        if raw_mm > self.config.max_mm {
            None
        } else {
            Some(raw_mm)
        }
    }

    fn candidate(&mut self, distance: Option<f32>, now: Timestamp) -> ProximityState {
        let c = &self.config;
        let committed = self.committed;

        let near_limit = if committed == ProximityState::Near { c.near_mm + c.hysteresis_mm } else { c.near_mm };
        let is_near = matches!(distance, Some(d) if d < near_limit);

        let far_beyond = |d: Option<f32>| match d {
            None => true,
            Some(d) if committed == ProximityState::BedExit => d > c.far_mm - c.hysteresis_mm,
            Some(d) => d > c.far_mm,
        };
        let is_far = !is_near && far_beyond(distance);

        let dwelled = self.dwell.observe(is_far, now);

        if is_near {
            ProximityState::Near
        } else if is_far && (committed == ProximityState::BedExit || dwelled) {
            ProximityState::BedExit
        } else {
            ProximityState::Far
        }
    }

    fn commit(&mut self, to: ProximityState, distance_mm: Option<f32>, now: Timestamp) -> MonitorEvent {
        let transition = Transition::new(self.committed, to, now);
        self.committed = to;
        cg_debug!("proximity {:?} -> {:?}", transition.from, transition.to);
        MonitorEvent::Proximity { transition, distance_mm }
    }

    /// Committed state
    pub fn state(&self) -> ProximityState {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReadingResult;

    fn any(_: &f32) -> ReadingResult<()> {
        Ok(())
    }

    struct Rig {
        buffer: SampleBuffer<f32>,
        monitor: ProximityMonitor,
    }

    impl Rig {
        fn new() -> Self {
            let config = ProximityConfig::default();
            Self {
                buffer: SampleBuffer::new(config.read_interval_ms, any),
                monitor: ProximityMonitor::new(&config),
            }
        }

        fn step(&mut self, distance: f32, now: Timestamp) -> Option<ProximityState> {
            self.buffer.push(distance, now, true).unwrap();
            match self.monitor.evaluate(&self.buffer, now) {
                Some(MonitorEvent::Proximity { transition, .. }) => Some(transition.to),
                _ => None,
            }
        }
    }

    #[test]
    fn near_needs_two_evaluations() {
        let mut rig = Rig::new();
        assert_eq!(rig.step(300.0, 0), None);
        assert_eq!(rig.step(300.0, 200), Some(ProximityState::Near));
    }

    #[test]
    fn leaving_near_respects_hysteresis() {
        let mut rig = Rig::new();
        rig.step(300.0, 0);
        rig.step(300.0, 200);

        // 520 < 500 + 50: still Near
        assert_eq!(rig.step(520.0, 400), None);
        assert_eq!(rig.step(520.0, 600), None);
        assert_eq!(rig.monitor.state(), ProximityState::Near);

        assert_eq!(rig.step(600.0, 800), None);
        assert_eq!(rig.step(600.0, 1_000), Some(ProximityState::Far));
    }

    #[test]
    fn bed_exit_after_dwell() {
        let mut rig = Rig::new();
        rig.step(1_000.0, 0);
        rig.step(1_000.0, 200);
        assert_eq!(rig.monitor.state(), ProximityState::Far);

        let mut t = 400;
        while t < 3_400 {
            assert_eq!(rig.step(2_500.0, t), None, "at {t}");
            t += 200;
        }
        assert_eq!(rig.step(2_500.0, 3_400), Some(ProximityState::BedExit));
    }

    #[test]
    fn interrupted_dwell_restarts() {
        let mut rig = Rig::new();
        rig.step(1_000.0, 0);
        rig.step(1_000.0, 200);

        rig.step(2_500.0, 400);
        rig.step(1_500.0, 2_000);
        assert_eq!(rig.step(2_500.0, 3_500), None);
        assert_eq!(rig.step(2_500.0, 6_400), None);
        assert_eq!(rig.step(2_500.0, 6_500), Some(ProximityState::BedExit));
    }

    #[test]
    fn beyond_max_counts_as_no_target() {
        let mut rig = Rig::new();
        rig.step(1_000.0, 0);
        rig.step(1_000.0, 200);

        rig.step(9_000.0, 400);
        assert_eq!(rig.step(9_000.0, 3_400), Some(ProximityState::BedExit));
    }

    #[test]
    fn leaving_bed_exit_respects_hysteresis() {
        let mut rig = Rig::new();
        rig.step(2_500.0, 0);
        rig.step(2_500.0, 3_000);
        assert_eq!(rig.monitor.state(), ProximityState::BedExit);

        // 1_980 > 2_000 - 50: still out of bed
        assert_eq!(rig.step(1_980.0, 3_200), None);
        assert_eq!(rig.step(1_980.0, 3_400), None);

        rig.step(1_900.0, 3_600);
        assert_eq!(rig.step(1_900.0, 3_800), Some(ProximityState::Far));
    }

    #[test]
    fn stale_resets_to_unknown() {
        let mut rig = Rig::new();
        rig.step(300.0, 0);
        rig.step(300.0, 200);

        let event = rig.monitor.evaluate(&rig.buffer, 10_000);
        assert!(matches!(
            event,
            Some(MonitorEvent::Proximity { transition: Transition { to: ProximityState::Unknown, .. }, distance_mm: None })
        ));
        assert_eq!(rig.monitor.evaluate(&rig.buffer, 10_200), None);
    }
}
