use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::RenderReport;

/// What the probe decided on a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Too early, or the switcher has not reported yet
    Waiting,
    /// The switcher drew its groups; nothing to do
    Keep,
    /// Groups exist but the switcher drew none of them
    Replace,
    /// Already decided
    Done,
}

/// One-shot check that the primary switcher rendered its group structure.
///
/// Fires no earlier than `delay` after start and only once a render report
/// exists; after that it always answers [`ProbeOutcome::Done`].
#[derive(Debug, Clone)]
pub struct FallbackProbe {
    delay: Duration,
    started: Instant,
    done: bool,
}

impl FallbackProbe {
    pub fn new(delay: Duration, started: Instant) -> Self {
        Self {
            delay,
            started,
            done: false,
        }
    }

    pub fn poll(&mut self, now: Instant, report: Option<RenderReport>, has_groups: bool) -> ProbeOutcome {
        if self.done {
            return ProbeOutcome::Done;
        }
        if now.saturating_duration_since(self.started) < self.delay {
            return ProbeOutcome::Waiting;
        }
        let Some(report) = report else {
            return ProbeOutcome::Waiting;
        };

        self.done = true;
        if has_groups && report.is_flat() {
            info!(
                leaves = report.leaf_entries,
                "layer switcher rendered no groups, installing checkbox tree"
            );
            ProbeOutcome::Replace
        } else {
            debug!(groups = report.group_entries, "layer switcher rendered groups");
            ProbeOutcome::Keep
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT: RenderReport = RenderReport {
        group_entries: 0,
        leaf_entries: 17,
    };
    const NESTED: RenderReport = RenderReport {
        group_entries: 5,
        leaf_entries: 17,
    };

    #[test]
    fn test_waits_for_delay_and_report() {
        let start = Instant::now();
        let mut probe = FallbackProbe::new(Duration::from_millis(700), start);

        assert_eq!(probe.poll(start, Some(FLAT), true), ProbeOutcome::Waiting);
        let later = start + Duration::from_millis(701);
        assert_eq!(probe.poll(later, None, true), ProbeOutcome::Waiting);
        assert!(!probe.is_done());
        assert_eq!(probe.poll(later, Some(FLAT), true), ProbeOutcome::Replace);
    }

    #[test]
    fn test_runs_once() {
        let start = Instant::now();
        let mut probe = FallbackProbe::new(Duration::ZERO, start);
        assert_eq!(probe.poll(start, Some(NESTED), true), ProbeOutcome::Keep);
        assert_eq!(probe.poll(start, Some(FLAT), true), ProbeOutcome::Done);
    }

    #[test]
    fn test_flat_model_is_kept() {
        let start = Instant::now();
        let mut probe = FallbackProbe::new(Duration::ZERO, start);
        assert_eq!(probe.poll(start, Some(FLAT), false), ProbeOutcome::Keep);
    }
}
