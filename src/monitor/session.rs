use std::time::Instant;

use crate::notify::Identity;

/// When the operator asked for a wake and when the packet actually left. The gap between
/// the two is reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeTiming {
    pub command_issued_at: Instant,
    pub wake_sent_at: Instant,
}

#[derive(Debug, Clone)]
pub struct MonitoringSession {
    pub requester: Identity,
    pub timing: WakeTiming,
    last_progress_secs: u64,
    next_check_secs: u64,
}

impl MonitoringSession {
    pub fn new(requester: Identity, timing: WakeTiming) -> Self {
        Self {
            requester,
            timing,
            last_progress_secs: 0,
            next_check_secs: 0,
        }
    }

    /// Whole seconds since the command was issued, rounded down.
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.timing.command_issued_at)
            .as_secs()
    }

    pub fn secs_since_wake(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.timing.wake_sent_at)
            .as_secs()
    }

    pub fn progress_due(&self, elapsed_secs: u64, interval_secs: u64) -> bool {
        elapsed_secs >= self.last_progress_secs + interval_secs
    }

    /// Moves the threshold to the reported value itself, not to the next multiple.
    pub fn mark_progress(&mut self, elapsed_secs: u64) {
        self.last_progress_secs = elapsed_secs;
    }

    pub fn check_due(&self, elapsed_secs: u64) -> bool {
        elapsed_secs >= self.next_check_secs
    }

    /// Schedules the next check at the next multiple of the interval after `elapsed_secs`,
    /// so sparse or uneven ticks can delay a check but never skip a window for good.
    /// An interval of zero is treated as one second.
    pub fn mark_checked(&mut self, elapsed_secs: u64, interval_secs: u64) {
        let interval_secs = interval_secs.max(1);
        self.next_check_secs = (elapsed_secs / interval_secs + 1) * interval_secs;
    }
}
