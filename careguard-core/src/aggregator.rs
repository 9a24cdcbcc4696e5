//! Alert aggregation, prioritisation and throttling
//!
//! ## Overview
//!
//! The aggregator receives the signals of one tick in evaluation order,
//! turns them into candidate records, sorts the candidates by severity
//! (stable, so ties keep evaluation order), and decides for each one whether
//! it goes to the transport and whether it goes to the push notifier.
//!
//! ## Dispatch rule
//!
//! ```text
//! severity < dispatch_floor                        → suppressed
//! never dispatched                                 → dispatch
//! now − last_dispatch[kind] ≥ min_renotify(kind)   → dispatch
//! Emergency and first dispatch since last clear    → dispatch
//! otherwise                                        → throttled
//! ```
//!
//! The notifier path applies the same rule with `notify_floor`,
//! `last_notify[kind]` and `notify_interval_ms`.
//!
//! ## Ledger
//!
//! The [`DispatchLedger`] is updated only after a successful delivery, so a
//! failed publish is neither retried nor counted against the throttle
//! window.

use heapless::Vec;

use crate::{
    alerts::{AlertKind, AlertRecord, Phase, Severity, Signal},
    config::AlertPolicy,
    constants::MAX_SIGNALS_PER_TICK,
    time::{elapsed_ms, Timestamp},
    transport::{Notifier, Transport},
};

/// Per-kind dispatch bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Last successful publish
    pub last_dispatch: Option<Timestamp>,
    /// Last successful push notification
    pub last_notify: Option<Timestamp>,
    /// Condition currently raised
    pub active: bool,
    /// Published since the condition was last raised from clear
    pub dispatched_in_episode: bool,
    /// Notified since the condition was last raised from clear
    pub notified_in_episode: bool,
}

impl LedgerEntry {
    fn raise(&mut self) {
        if !self.active {
            self.active = true;
            self.dispatched_in_episode = false;
            self.notified_in_episode = false;
        }
    }

    fn clear(&mut self) {
        self.active = false;
        self.dispatched_in_episode = false;
        self.notified_in_episode = false;
    }
}

/// Dispatch history for every alert kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchLedger {
    entries: [LedgerEntry; AlertKind::COUNT],
}

impl DispatchLedger {
    /// Empty ledger
    pub const fn new() -> Self {
        const EMPTY: LedgerEntry = LedgerEntry {
            last_dispatch: None,
            last_notify: None,
            active: false,
            dispatched_in_episode: false,
            notified_in_episode: false,
        };
        Self { entries: [EMPTY; AlertKind::COUNT] }
    }

    /// Entry for a kind
    pub fn entry(&self, kind: AlertKind) -> &LedgerEntry {
        &self.entries[kind.index()]
    }

    fn entry_mut(&mut self, kind: AlertKind) -> &mut LedgerEntry {
        &mut self.entries[kind.index()]
    }
}

impl Default for DispatchLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery counters since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchStats {
    /// Records published
    pub dispatched: u32,
    /// Records below the dispatch floor
    pub suppressed: u32,
    /// Records held back by the re-notify interval
    pub throttled: u32,
    /// Publish failures
    pub failed: u32,
    /// Push notifications sent
    pub notified: u32,
    /// Push notification failures
    pub notify_failed: u32,
}

/// Outcome of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Records published, in dispatch order
    pub dispatched: Vec<AlertRecord, MAX_SIGNALS_PER_TICK>,
    /// Records pushed to the notifier
    pub notified: Vec<AlertRecord, MAX_SIGNALS_PER_TICK>,
    /// Held back by the re-notify interval
    pub throttled: u32,
    /// Below the dispatch floor
    pub suppressed: u32,
    /// Publish failures
    pub failed: u32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    record: AlertRecord,
}

/// Turns signals into throttled deliveries
#[derive(Debug, Clone)]
pub struct AlertAggregator {
    policy: AlertPolicy,
    ledger: DispatchLedger,
    stats: DispatchStats,
}

impl AlertAggregator {
    /// Create from validated policy
    pub fn new(policy: &AlertPolicy) -> Self {
        Self { policy: policy.clone(), ledger: DispatchLedger::new(), stats: DispatchStats::default() }
    }

    /// Process one tick's signals
    pub fn process<T, N>(
        &mut self,
        signals: &[Signal],
        now: Timestamp,
        device_id: &str,
        transport: &mut T,
        notifier: &mut N,
    ) -> DispatchOutcome
    where
        T: Transport + ?Sized,
        N: Notifier + ?Sized,
    {
        let candidates = self.collect(signals);
        let mut outcome = DispatchOutcome::default();

        for candidate in candidates.iter() {
            let record = candidate.record;
            self.dispatch(&record, now, device_id, transport, &mut outcome);
            self.notify(&record, now, device_id, notifier, &mut outcome);
        }

        outcome
    }

    /// Apply clears/raises to the ledger and order what remains by severity
    fn collect(&mut self, signals: &[Signal]) -> Vec<Candidate, MAX_SIGNALS_PER_TICK> {
        let mut candidates: Vec<Candidate, MAX_SIGNALS_PER_TICK> = Vec::new();

        for signal in signals {
            let kind = signal.record.kind();
            match signal.phase {
                Phase::Cleared => self.ledger.entry_mut(kind).clear(),
                Phase::Raised => {
                    self.ledger.entry_mut(kind).raise();
                    insert_by_severity(&mut candidates, Candidate { record: signal.record });
                }
                Phase::Ongoing => {
                    if !self.policy.repeat_active_emergencies {
                        continue;
                    }
                    let raised_now = signals
                        .iter()
                        .any(|s| s.phase == Phase::Raised && s.record.kind() == kind);
                    if raised_now {
                        continue;
                    }
                    self.ledger.entry_mut(kind).raise();
                    insert_by_severity(&mut candidates, Candidate { record: signal.record });
                }
            }
        }

        candidates
    }

    fn dispatch<T: Transport + ?Sized>(
        &mut self,
        record: &AlertRecord,
        now: Timestamp,
        device_id: &str,
        transport: &mut T,
        outcome: &mut DispatchOutcome,
    ) {
        let kind = record.kind();
        if record.severity() < self.policy.dispatch_floor {
            self.stats.suppressed = self.stats.suppressed.saturating_add(1);
            outcome.suppressed += 1;
            return;
        }

        let entry = *self.ledger.entry(kind);
        let interval = self.policy.interval_for(kind, record.severity());
        if !eligible(record.severity(), entry.last_dispatch, entry.dispatched_in_episode, interval, now) {
            self.stats.throttled = self.stats.throttled.saturating_add(1);
            outcome.throttled += 1;
            return;
        }

        match transport.publish(device_id, record) {
            Ok(()) => {
                let entry = self.ledger.entry_mut(kind);
                entry.last_dispatch = Some(now);
                entry.dispatched_in_episode = true;
                self.stats.dispatched = self.stats.dispatched.saturating_add(1);
                // Capacity equals the candidate capacity
                let _ = outcome.dispatched.push(*record);
                cg_info!("dispatched {} ({})", kind.name(), record.severity().as_str());
            }
            Err(_e) => {
                self.stats.failed = self.stats.failed.saturating_add(1);
                outcome.failed += 1;
                cg_warn!("publish of {} failed: {:?}", kind.name(), _e);
            }
        }
    }

    fn notify<N: Notifier + ?Sized>(
        &mut self,
        record: &AlertRecord,
        now: Timestamp,
        device_id: &str,
        notifier: &mut N,
        outcome: &mut DispatchOutcome,
    ) {
        if !notifier.is_enabled() || record.severity() < self.policy.notify_floor {
            return;
        }

        let kind = record.kind();
        let entry = *self.ledger.entry(kind);
        if !eligible(
            record.severity(),
            entry.last_notify,
            entry.notified_in_episode,
            self.policy.notify_interval_ms,
            now,
        ) {
            return;
        }

        match notifier.notify(device_id, record) {
            Ok(()) => {
                let entry = self.ledger.entry_mut(kind);
                entry.last_notify = Some(now);
                entry.notified_in_episode = true;
                self.stats.notified = self.stats.notified.saturating_add(1);
                let _ = outcome.notified.push(*record);
            }
            Err(_e) => {
                self.stats.notify_failed = self.stats.notify_failed.saturating_add(1);
                cg_warn!("notification of {} failed: {:?}", kind.name(), _e);
            }
        }
    }

    /// Dispatch history
    pub fn ledger(&self) -> &DispatchLedger {
        &self.ledger
    }

    /// Counters since boot
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Active policy
    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }
}

fn eligible(
    severity: Severity,
    last: Option<Timestamp>,
    sent_in_episode: bool,
    interval_ms: u64,
    now: Timestamp,
) -> bool {
    match last {
        None => true,
        Some(last) if elapsed_ms(last, now) >= interval_ms => true,
        Some(_) => severity == Severity::Emergency && !sent_in_episode,
    }
}

/// Stable insertion: after every candidate of equal or higher severity
fn insert_by_severity(candidates: &mut Vec<Candidate, MAX_SIGNALS_PER_TICK>, candidate: Candidate) {
    let severity = candidate.record.severity();
    let pos = candidates
        .iter()
        .position(|c| c.record.severity() < severity)
        .unwrap_or(candidates.len());
    if candidates.insert(pos, candidate).is_err() {
        cg_warn!("candidate overflow, dropped {}", candidate.record.kind().name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alerts::AlertPayload,
        errors::TransportError,
        transport::{NoNotifier, RecordingNotifier, RecordingTransport},
    };

    fn raised(kind: AlertKind, severity: Severity, at: Timestamp) -> Signal {
        Signal { phase: Phase::Raised, record: AlertRecord::new(kind, severity, at, AlertPayload::None) }
    }

    fn cleared(kind: AlertKind, at: Timestamp) -> Signal {
        Signal { phase: Phase::Cleared, record: AlertRecord::new(kind, Severity::Info, at, AlertPayload::None) }
    }

    fn run(agg: &mut AlertAggregator, signals: &[Signal], now: Timestamp, t: &mut RecordingTransport) -> DispatchOutcome {
        agg.process(signals, now, "dev", t, &mut NoNotifier)
    }

    #[test]
    fn warning_throttled_inside_window() {
        let mut agg = AlertAggregator::new(&AlertPolicy::default());
        let mut t = RecordingTransport::default();

        let first = run(&mut agg, &[raised(AlertKind::NoMotion, Severity::Warning, 0)], 0, &mut t);
        let second = run(&mut agg, &[raised(AlertKind::NoMotion, Severity::Warning, 10_000)], 10_000, &mut t);

        assert_eq!(first.dispatched.len(), 1);
        assert_eq!(second.dispatched.len(), 0);
        assert_eq!(second.throttled, 1);
        assert_eq!(t.alert_count(), 1);

        let third = run(&mut agg, &[raised(AlertKind::NoMotion, Severity::Warning, 60_000)], 60_000, &mut t);
        assert_eq!(third.dispatched.len(), 1);
    }

    #[test]
    fn below_floor_is_suppressed() {
        let mut agg = AlertAggregator::new(&AlertPolicy::default());
        let mut t = RecordingTransport::default();
        let out = run(&mut agg, &[raised(AlertKind::BedExit, Severity::Caution, 0)], 0, &mut t);
        assert_eq!(out.suppressed, 1);
        assert_eq!(t.alert_count(), 0);
        assert_eq!(agg.stats().suppressed, 1);
    }

    #[test]
    fn fresh_emergency_bypasses_window() {
        let mut agg = AlertAggregator::new(&AlertPolicy::default());
        let mut t = RecordingTransport::default();

        run(&mut agg, &[raised(AlertKind::Fall, Severity::Emergency, 0)], 0, &mut t);
        // Repeated while still active: throttled
        let repeat = run(&mut agg, &[raised(AlertKind::Fall, Severity::Emergency, 5_000)], 5_000, &mut t);
        assert_eq!(repeat.throttled, 1);

        // Cleared then raised again: fresh rise goes out at once
        run(&mut agg, &[cleared(AlertKind::Fall, 10_000)], 10_000, &mut t);
        let fresh = run(&mut agg, &[raised(AlertKind::Fall, Severity::Emergency, 20_000)], 20_000, &mut t);
        assert_eq!(fresh.dispatched.len(), 1);
        assert_eq!(t.alert_count(), 2);
    }

    #[test]
    fn records_sorted_by_severity_stable() {
        let mut agg = AlertAggregator::new(&AlertPolicy::default());
        let mut t = RecordingTransport::default();
        let signals = [
            raised(AlertKind::TemperatureHigh, Severity::Warning, 0),
            raised(AlertKind::Fall, Severity::Emergency, 0),
            raised(AlertKind::HumidityHigh, Severity::Warning, 0),
            raised(AlertKind::GeofenceEscape, Severity::Emergency, 0),
        ];
        let out = run(&mut agg, &signals, 0, &mut t);
        let kinds: Vec<AlertKind, 8> = out.dispatched.iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds.as_slice(),
            &[AlertKind::Fall, AlertKind::GeofenceEscape, AlertKind::TemperatureHigh, AlertKind::HumidityHigh]
        );
    }

    #[test]
    fn ongoing_skipped_when_raised_same_tick() {
        let mut agg = AlertAggregator::new(&AlertPolicy::default());
        let mut t = RecordingTransport::default();
        let raise = raised(AlertKind::GeofenceEscape, Severity::Emergency, 0);
        let ongoing = Signal { phase: Phase::Ongoing, ..raise };
        let out = run(&mut agg, &[raise, ongoing], 0, &mut t);
        assert_eq!(out.dispatched.len(), 1);
        assert_eq!(out.throttled, 0);
    }

    #[test]
    fn failure_counts_and_leaves_ledger() {
        let mut agg = AlertAggregator::new(&AlertPolicy::default());
        let mut t = RecordingTransport::default();
        t.fail_with(Some(TransportError::NotConnected));

        let out = run(&mut agg, &[raised(AlertKind::NoMotion, Severity::Warning, 0)], 0, &mut t);
        assert_eq!(out.failed, 1);
        assert_eq!(agg.stats().failed, 1);
        assert_eq!(agg.ledger().entry(AlertKind::NoMotion).last_dispatch, None);

        t.fail_with(None);
        let retry = run(&mut agg, &[raised(AlertKind::NoMotion, Severity::Warning, 1_000)], 1_000, &mut t);
        assert_eq!(retry.dispatched.len(), 1);
    }

    #[test]
    fn notifier_uses_its_own_interval() {
        let policy = AlertPolicy { notify_interval_ms: 300_000, ..AlertPolicy::default() };
        let mut agg = AlertAggregator::new(&policy);
        let mut t = RecordingTransport::default();
        let mut n = RecordingNotifier::default();

        for s in 0..5u64 {
            let now = s * 60_000;
            agg.process(&[raised(AlertKind::NoMotion, Severity::Warning, now)], now, "dev", &mut t, &mut n);
        }
        assert_eq!(t.alert_count(), 5);
        assert_eq!(n.count(), 1);
        assert_eq!(agg.stats().notified, 1);
    }
}
