use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use log::{debug, info, warn};

use crate::error::SessionError;
use crate::liveness::{LivenessCheck, ProbeResult};
use crate::notify::{Identity, Notifier};
use crate::target::WakeTarget;

pub use self::report::{BootReport, BootSpeed};
pub use self::session::{MonitoringSession, WakeTiming};

pub mod report;
mod session;

#[derive(Args, Clone, Debug)]
#[group(id = "monitor")]
pub struct Params {
    /// Give up on a boot after this many seconds since the wake command.
    #[arg(long, env = "MAX_WAIT_SECS", default_value = "90",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_wait_secs: u64,

    /// Check whether the host is up every this many seconds.
    #[arg(long, env = "CHECK_INTERVAL_SECS", default_value = "3",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub check_interval_secs: u64,

    /// Send a progress message every this many seconds while waiting.
    #[arg(long, env = "PROGRESS_INTERVAL_SECS", default_value = "15",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub progress_interval_secs: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_wait_secs: 90,
            check_interval_secs: 3,
            progress_interval_secs: 15,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// What a single tick amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Waiting { elapsed_secs: u64 },
    Booted(BootReport),
    TimedOut { elapsed_secs: u64 },
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickOutcome::Booted(_) | TickOutcome::TimedOut { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub active: bool,
    pub elapsed_secs: u64,
    pub requester: Option<Identity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingReport {
    pub command_to_wake: Duration,
    pub since_wake: Duration,
    pub total: Duration,
    pub monitoring: bool,
}

/// Either idle or watching exactly one session. Time moves only through [BootMonitor::tick].
pub struct BootMonitor {
    params: Params,
    target: WakeTarget,
    probe: Arc<dyn LivenessCheck>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    session: Option<MonitoringSession>,
    last_wake: Option<WakeTiming>,
    tick_in_flight: bool,
}

impl BootMonitor {
    pub fn new(
        params: Params,
        target: WakeTarget,
        probe: Arc<dyn LivenessCheck>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            params,
            target,
            probe,
            notifier,
            clock,
            session: None,
            last_wake: None,
            tick_in_flight: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Idle → Monitoring. Refuses to replace a running session.
    pub fn start_session(&mut self, requester: Identity, timing: WakeTiming) -> Result<(), SessionError> {
        if let Some(running) = &self.session {
            return Err(SessionError::AlreadyMonitoring {
                elapsed_secs: running.elapsed_secs(self.clock.now()),
            });
        }
        info!(
            "Monitoring boot of {} for {} (up to {}s)",
            self.target.host, requester, self.params.max_wait_secs
        );
        self.last_wake = Some(timing);
        self.session = Some(MonitoringSession::new(requester, timing));
        Ok(())
    }

    /// Remembers a wake that is not being monitored, for timing queries.
    pub fn record_wake(&mut self, timing: WakeTiming) {
        self.last_wake = Some(timing);
    }

    pub fn status(&self) -> StatusReport {
        match &self.session {
            Some(session) => StatusReport {
                active: true,
                elapsed_secs: session.elapsed_secs(self.clock.now()),
                requester: Some(session.requester.clone()),
            },
            None => StatusReport {
                active: false,
                elapsed_secs: 0,
                requester: None,
            },
        }
    }

    pub fn timing(&self) -> Option<TimingReport> {
        let wake = self.last_wake?;
        let now = self.clock.now();
        Some(TimingReport {
            command_to_wake: wake.wake_sent_at.saturating_duration_since(wake.command_issued_at),
            since_wake: now.saturating_duration_since(wake.wake_sent_at),
            total: now.saturating_duration_since(wake.command_issued_at),
            monitoring: self.is_active(),
        })
    }

    /// Advances the session by one tick. A no-op while idle.
    pub async fn tick(&mut self) -> TickOutcome {
        let step = match self.begin_tick() {
            Ok(step) => step,
            Err(outcome) => return outcome,
        };
        let result = step.execute().await;
        let outcome = self.finish_tick(&step, result);
        step.announce(&outcome).await;
        outcome
    }

    /// First half of a tick: decides what is due and updates the session's schedule.
    /// The returned step does the slow network part without access to the monitor, so
    /// callers sharing the monitor need not hold it meanwhile. Only one step is in flight
    /// at a time. Ticks arriving during a running step report `Waiting`.
    pub fn begin_tick(&mut self) -> Result<TickStep, TickOutcome> {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Err(TickOutcome::Idle);
        };
        let elapsed = session.elapsed_secs(now);
        if self.tick_in_flight {
            return Err(TickOutcome::Waiting { elapsed_secs: elapsed });
        }
        let since_wake = session.secs_since_wake(now);

        let progress = if session.progress_due(elapsed, self.params.progress_interval_secs) {
            info!(
                "Boot progress: {}s ({}%)",
                elapsed,
                report::percent_of(elapsed, self.params.max_wait_secs)
            );
            session.mark_progress(elapsed);
            Some(report::progress(elapsed, since_wake, self.params.max_wait_secs))
        } else {
            None
        };

        let deadline_reached = elapsed >= self.params.max_wait_secs;
        let check_due = session.check_due(elapsed) || deadline_reached;
        if check_due {
            session.mark_checked(elapsed, self.params.check_interval_secs);
        }

        self.tick_in_flight = true;
        Ok(TickStep {
            requester: session.requester.clone(),
            elapsed_secs: elapsed,
            since_wake_secs: since_wake,
            progress,
            check_due,
            deadline_reached,
            target: self.target,
            check: self.probe.clone(),
            notifier: self.notifier.clone(),
        })
    }

    /// Second half of a tick: ends the session on a boot or at the deadline.
    pub fn finish_tick(&mut self, step: &TickStep, result: Option<ProbeResult>) -> TickOutcome {
        self.tick_in_flight = false;
        let elapsed = step.elapsed_secs;

        if let Some(result) = result.filter(|it| it.alive) {
            self.session = None;
            info!(
                "{} booted after {}s ({}s since wake packet)",
                self.target.host, elapsed, step.since_wake_secs
            );
            return TickOutcome::Booted(BootReport {
                total_secs: elapsed,
                wake_to_boot_secs: step.since_wake_secs,
                host: self.target.host,
                mac: self.target.mac,
                strategy: result.strategy,
            });
        }

        if step.deadline_reached {
            self.session = None;
            info!("{} did not come up within {}s, giving up", self.target.host, elapsed);
            return TickOutcome::TimedOut { elapsed_secs: elapsed };
        }

        TickOutcome::Waiting { elapsed_secs: elapsed }
    }
}

/// The part of a tick that talks to the network.
pub struct TickStep {
    requester: Identity,
    elapsed_secs: u64,
    since_wake_secs: u64,
    progress: Option<String>,
    check_due: bool,
    deadline_reached: bool,
    target: WakeTarget,
    check: Arc<dyn LivenessCheck>,
    notifier: Arc<dyn Notifier>,
}

impl TickStep {
    /// Sends the progress message if due, then runs the liveness check if due.
    pub async fn execute(&self) -> Option<ProbeResult> {
        if let Some(text) = &self.progress {
            self.send(text).await;
        }
        if !self.check_due {
            return None;
        }
        debug!("Checking {} at {}s", self.target.host, self.elapsed_secs);
        Some(self.check.is_online(self.target.host).await)
    }

    /// Sends the terminal message for a finished session.
    pub async fn announce(&self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Booted(report) => self.send(&report::booted(report)).await,
            TickOutcome::TimedOut { elapsed_secs } => {
                self.send(&report::timed_out(*elapsed_secs, self.since_wake_secs))
                    .await
            }
            TickOutcome::Idle | TickOutcome::Waiting { .. } => {}
        }
    }

    async fn send(&self, text: &str) {
        if let Err(e) = self.notifier.notify(&self.requester, text).await {
            warn!("Failed to notify {}, carrying on: {:?}", self.requester, e);
        }
    }
}
