use anyhow::{anyhow, Context, Result};
use log::info;
use nix::sys;
use nix::sys::signal::Signal;
use strum::Display;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod macros;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StopReason {
    #[strum(to_string = "Terminated")]
    Terminate,
    #[strum(to_string = "Interrupted")]
    Interrupt,
    #[strum(to_string = "Hangup received")] // used by tmux apparently
    Hangup,
    #[strum(to_string = "Stop requested from within")]
    Requested,
    #[strum(to_string = "Stop token cancelled")]
    Cancelled,
}

pub struct SignalHandler {
    tok: CancellationToken,
}

pub fn new() -> SignalHandler {
    SignalHandler {
        tok: CancellationToken::new(),
    }
}

/// Stops the process cleanly from inside, e.g. when the command source runs dry.
/// Goes through the same path as an outside signal.
pub fn trigger() -> Result<()> {
    sys::signal::raise(Signal::SIGUSR1).context("raising SIGUSR1 for a clean stop")
}

impl SignalHandler {
    pub fn subscribe_stop(&self) -> CancellationToken {
        self.tok.clone()
    }

    /// Waits for the first reason to stop, then cancels every subscribed token.
    pub async fn wait_for_signal(self) -> Result<()> {
        let reason = self.next_reason().await?;
        info!("{}; stopping...", reason);
        self.tok.cancel();
        Ok(())
    }

    async fn next_reason(&self) -> Result<StopReason> {
        let mut sigterm = signal(SignalKind::terminate()).context("hooking SIGTERM")?;
        let mut sigint = signal(SignalKind::interrupt()).context("hooking SIGINT")?;
        let mut sighup = signal(SignalKind::hangup()).context("hooking SIGHUP")?;
        let mut sigusr1 = signal(SignalKind::user_defined1()).context("hooking SIGUSR1")?;

        let reason = select! {
            _ = sigterm.recv() => StopReason::Terminate,
            _ = sigint.recv() => StopReason::Interrupt,
            _ = sighup.recv() => StopReason::Hangup,
            _ = sigusr1.recv() => StopReason::Requested, // #trigger()
            _ = self.tok.cancelled() => StopReason::Cancelled,
        };
        Ok(reason)
    }
}

/// Joins a spawned task, folding a panic or cancellation into the task's own error type.
pub async fn flatten(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(err)) => Err(err),
        Err(err) => Err(anyhow!(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assertor::*;
    use tokio::time::{interval, timeout};

    use crate::loop_with_stop;

    use super::*;

    #[tokio::test]
    async fn cancelled_token_ends_the_wait() -> Result<()> {
        // given
        let handler = new();
        let stop_rx = handler.subscribe_stop();

        // when
        let waiting = tokio::spawn(handler.wait_for_signal());
        stop_rx.cancel();

        // then
        timeout(Duration::from_secs(1), flatten(waiting)).await??;
        Ok(())
    }

    #[tokio::test]
    async fn flatten_keeps_task_errors() {
        let failing = tokio::spawn(async { Err::<(), _>(anyhow!("boom")) });
        let res = flatten(failing).await;
        assert_that!(res.is_err()).is_true();
    }

    struct Counter {
        seen: std::sync::atomic::AtomicUsize,
        stop_after: usize,
        stop_tx: CancellationToken,
    }

    impl Counter {
        async fn count(&self, _it: tokio::time::Instant) -> Result<()> {
            let seen = self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if seen == self.stop_after {
                self.stop_tx.cancel();
            }
            Ok(())
        }
    }

    async fn count_until_stopped(counter: &Counter, stop_rx: CancellationToken) -> Result<()> {
        let mut trigger = interval(Duration::from_millis(1));
        loop_with_stop!(
            "counter", stop_rx,
            trigger.tick() => counter.count(it)
        )
    }

    #[tokio::test]
    async fn loop_runs_until_stop() -> Result<()> {
        // given
        let stop_rx = CancellationToken::new();
        let counter = Counter {
            seen: Default::default(),
            stop_after: 3,
            stop_tx: stop_rx.clone(),
        };

        // when
        timeout(Duration::from_secs(1), count_until_stopped(&counter, stop_rx)).await??;

        // then
        assert_that!(counter.seen.load(std::sync::atomic::Ordering::SeqCst)).is_equal_to(3);
        Ok(())
    }
}
