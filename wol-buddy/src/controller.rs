use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use wake_crab::error::{SessionError, TransmissionError};
use wake_crab::liveness::{LivenessCheck, ProbeResult};
use wake_crab::magic_packet::PacketSender;
use wake_crab::monitor::{
    self, BootMonitor, Clock, StatusReport, TickOutcome, TimingReport, WakeTiming,
};
use wake_crab::notify::{Identity, Notifier};
use wake_crab::target::WakeTarget;

#[derive(Debug)]
pub enum WakeOutcome {
    Sent,
    AlreadyMonitoring { elapsed_secs: u64 },
    Failed(TransmissionError),
}

impl WakeOutcome {
    pub fn sent(&self) -> bool {
        matches!(self, WakeOutcome::Sent)
    }
}

/// Entry points the command layer calls into. Owns the boot monitor.
pub struct WakeController {
    target: WakeTarget,
    params: monitor::Params,
    sender: Arc<dyn PacketSender>,
    probe: Arc<dyn LivenessCheck>,
    clock: Arc<dyn Clock>,
    monitor: Mutex<BootMonitor>,
}

impl WakeController {
    pub fn new(
        target: WakeTarget,
        params: monitor::Params,
        sender: Arc<dyn PacketSender>,
        probe: Arc<dyn LivenessCheck>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let monitor = BootMonitor::new(
            params.clone(),
            target,
            probe.clone(),
            notifier,
            clock.clone(),
        );
        Self {
            target,
            params,
            sender,
            probe,
            clock,
            monitor: Mutex::new(monitor),
        }
    }

    pub fn target(&self) -> &WakeTarget {
        &self.target
    }

    pub fn monitor_params(&self) -> &monitor::Params {
        &self.params
    }

    /// Sends the wake packet and starts watching the boot on behalf of `requester`.
    /// While a boot is already being watched, nothing is sent.
    pub async fn on_wake_command(&self, requester: Identity) -> WakeOutcome {
        let issued_at = self.clock.now();
        let mut monitor = self.monitor.lock().await;
        let status = monitor.status();
        if status.active {
            info!(
                "Ignoring wake from {}, already monitoring for {}",
                requester,
                status.requester.as_ref().map_or("nobody", |it| it.as_str())
            );
            return WakeOutcome::AlreadyMonitoring {
                elapsed_secs: status.elapsed_secs,
            };
        }

        let receipt = self.sender.send(&self.target).await;
        let timing = WakeTiming {
            command_issued_at: issued_at,
            wake_sent_at: receipt.sent_at,
        };
        log_delay(&timing);
        if let Err(e) = receipt.result {
            monitor.record_wake(timing);
            return WakeOutcome::Failed(e);
        }

        match monitor.start_session(requester, timing) {
            Ok(()) => WakeOutcome::Sent,
            Err(SessionError::AlreadyMonitoring { elapsed_secs }) => {
                WakeOutcome::AlreadyMonitoring { elapsed_secs }
            }
        }
    }

    /// Sends the wake packet without watching the boot.
    pub async fn on_wake_only_command(&self) -> WakeOutcome {
        let issued_at = self.clock.now();
        let receipt = self.sender.send(&self.target).await;
        let timing = WakeTiming {
            command_issued_at: issued_at,
            wake_sent_at: receipt.sent_at,
        };
        log_delay(&timing);
        self.monitor.lock().await.record_wake(timing);
        match receipt.result {
            Ok(()) => WakeOutcome::Sent,
            Err(e) => WakeOutcome::Failed(e),
        }
    }

    /// One-shot liveness query, independent of any running session.
    pub async fn on_check_command(&self) -> ProbeResult {
        self.probe.is_online(self.target.host).await
    }

    /// The liveness check runs without the monitor lock, so queries keep answering meanwhile.
    pub async fn on_tick(&self) -> TickOutcome {
        let step = match self.monitor.lock().await.begin_tick() {
            Ok(step) => step,
            Err(outcome) => return outcome,
        };
        let result = step.execute().await;
        let outcome = self.monitor.lock().await.finish_tick(&step, result);
        step.announce(&outcome).await;
        outcome
    }

    pub async fn on_status_query(&self) -> StatusReport {
        self.monitor.lock().await.status()
    }

    pub async fn on_timing_query(&self) -> Option<TimingReport> {
        self.monitor.lock().await.timing()
    }
}

fn log_delay(timing: &WakeTiming) {
    let delay = timing
        .wake_sent_at
        .saturating_duration_since(timing.command_issued_at);
    if delay.as_millis() > 1000 {
        warn!("Wake packet left {}ms after the command", delay.as_millis());
    } else {
        info!("Wake packet left {}ms after the command", delay.as_millis());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use assertor::*;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use wake_crab::liveness::Strategy;
    use wake_crab::target::MacAddress;
    use wake_crab::test_utils::{ManualClock, RecordingNotifier, ScriptedCheck, ScriptedSender};

    use super::*;

    pub struct Fixture {
        pub controller: Arc<WakeController>,
        pub clock: Arc<ManualClock>,
        pub sender: Arc<ScriptedSender>,
        pub check: Arc<ScriptedCheck>,
        pub notifier: Arc<RecordingNotifier>,
    }

    pub fn given_controller() -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let sender = Arc::new(ScriptedSender::new(clock.clone()));
        let check = Arc::new(ScriptedCheck::offline());
        let notifier = Arc::new(RecordingNotifier::default());
        let target = WakeTarget::new(
            MacAddress::new([0xA1, 0xAA, 0x1A, 0x1A, 0x11, 0xA1]),
            Ipv4Addr::new(192, 168, 1, 255),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 228)),
        );
        let controller = Arc::new(WakeController::new(
            target,
            monitor::Params::default(),
            sender.clone(),
            check.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        Fixture {
            controller,
            clock,
            sender,
            check,
            notifier,
        }
    }

    #[tokio::test]
    async fn wake_sends_and_starts_monitoring() {
        // given
        let fx = given_controller();

        // when
        let outcome = fx.controller.on_wake_command(Identity::new("42")).await;

        // then
        assert_that!(outcome.sent()).is_true();
        assert_that!(fx.sender.sends()).is_equal_to(1);
        let status = fx.controller.on_status_query().await;
        assert_that!(status.active).is_true();
        assert_that!(status.requester).is_equal_to(Some(Identity::new("42")));
    }

    #[tokio::test]
    async fn second_wake_is_rejected_without_sending() {
        // given
        let fx = given_controller();
        fx.controller.on_wake_command(Identity::new("42")).await;
        fx.clock.set_elapsed(Duration::from_secs(12));

        // when
        let outcome = fx.controller.on_wake_command(Identity::new("7")).await;

        // then
        assert!(matches!(
            outcome,
            WakeOutcome::AlreadyMonitoring { elapsed_secs: 12 }
        ));
        assert_that!(fx.sender.sends()).is_equal_to(1);
        let status = fx.controller.on_status_query().await;
        assert_that!(status.requester).is_equal_to(Some(Identity::new("42")));
    }

    #[tokio::test]
    async fn failed_send_does_not_start_a_session() {
        // given
        let fx = given_controller();
        fx.sender.set_failing(true);

        // when
        let outcome = fx.controller.on_wake_command(Identity::new("42")).await;

        // then
        assert!(matches!(outcome, WakeOutcome::Failed(_)));
        assert_that!(fx.controller.on_status_query().await.active).is_false();
        assert_that!(fx.controller.on_timing_query().await).is_some();
    }

    #[tokio::test]
    async fn wake_only_records_timing_but_does_not_monitor() {
        // given
        let fx = given_controller();

        // when
        let outcome = fx.controller.on_wake_only_command().await;
        fx.clock.set_elapsed(Duration::from_secs(4));
        let timing = fx.controller.on_timing_query().await;

        // then
        assert_that!(outcome.sent()).is_true();
        assert_that!(fx.controller.on_status_query().await.active).is_false();
        assert_that!(timing.map(|it| it.since_wake)).is_equal_to(Some(Duration::from_secs(4)));
        assert_that!(fx.controller.on_tick().await).is_equal_to(TickOutcome::Idle);
    }

    #[tokio::test]
    async fn check_works_without_a_session() {
        // given
        let fx = given_controller();
        fx.check.set_online(Strategy::Tcp { port: 22 });

        // when
        let result = fx.controller.on_check_command().await;

        // then
        assert_that!(result.alive).is_true();
        assert_that!(result.strategy).is_equal_to(Some(Strategy::Tcp { port: 22 }));
        assert!(fx.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn ticks_drive_the_session_to_success() {
        // given
        let fx = given_controller();
        fx.controller.on_wake_command(Identity::new("42")).await;
        fx.clock.set_elapsed(Duration::from_secs(20));
        let waiting = fx.controller.on_tick().await;
        fx.check.set_online(Strategy::Http { port: Some(80) });

        // when
        fx.clock.set_elapsed(Duration::from_secs(21));
        let outcome = fx.controller.on_tick().await;

        // then
        assert_that!(waiting).is_equal_to(TickOutcome::Waiting { elapsed_secs: 20 });
        assert_that!(outcome.is_terminal()).is_true();
        let messages = fx.notifier.messages();
        assert_that!(messages.last().map(|(to, _)| to.clone()))
            .is_equal_to(Some(Identity::new("42")));
        assert_that!(fx.controller.on_status_query().await.active).is_false();
    }

    /// Reports offline, but only once released.
    #[derive(Default)]
    struct HeldCheck {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl LivenessCheck for HeldCheck {
        async fn is_online(&self, _host: IpAddr) -> ProbeResult {
            self.entered.notify_one();
            self.release.notified().await;
            ProbeResult { alive: false, strategy: None }
        }
    }

    #[tokio::test]
    async fn status_answers_while_a_check_is_running() {
        // given
        let fx = given_controller();
        let held = Arc::new(HeldCheck::default());
        let controller = Arc::new(WakeController::new(
            *fx.controller.target(),
            monitor::Params::default(),
            fx.sender.clone(),
            held.clone(),
            fx.notifier.clone(),
            fx.clock.clone(),
        ));
        controller.on_wake_command(Identity::new("42")).await;
        let ticking = tokio::spawn({
            let controller = controller.clone();
            async move { controller.on_tick().await }
        });
        held.entered.notified().await;

        // when
        let limit = Duration::from_secs(1);
        let status = tokio::time::timeout(limit, controller.on_status_query()).await;
        let overlapping = tokio::time::timeout(limit, controller.on_tick()).await;

        // then
        assert_that!(status.map(|it| it.active)).is_equal_to(Ok(true));
        assert_that!(overlapping.map(|it| it.is_terminal())).is_equal_to(Ok(false));
        held.release.notify_one();
        let finished = ticking.await.expect("tick task");
        assert_that!(finished).is_equal_to(TickOutcome::Waiting { elapsed_secs: 0 });
    }
}
