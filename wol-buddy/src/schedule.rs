use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use log::{error, info, trace};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use wake_crab::loop_with_stop;
use wake_crab::monitor::TickOutcome;

use crate::bot::Bot;
use crate::controller::WakeController;

#[derive(Args, Clone, Debug)]
#[group(id = "schedule")]
pub struct Params {
    /// How often to look for a new chat command, in milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "2000")]
    pub poll_interval_ms: u64,

    /// How often to advance the boot monitor, in milliseconds. Keep this at or below the
    /// check interval, otherwise checks are done late.
    #[arg(long, env = "TICK_INTERVAL_MS", default_value = "1000")]
    pub tick_interval_ms: u64,
}

pub async fn run_poll(bot: Arc<Bot>, stop_rx: CancellationToken, params: Params) -> Result<()> {
    info!("Polling for commands every {}ms.", params.poll_interval_ms);
    let mut trigger = interval(Duration::from_millis(params.poll_interval_ms.max(1)));
    trigger.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let poller = Poller { bot };
    loop_with_stop!(
        "command poll timer", stop_rx,
        trigger.tick() => poller.tick(it)
    )
}

pub async fn run_ticks(
    controller: Arc<WakeController>,
    stop_rx: CancellationToken,
    params: Params,
) -> Result<()> {
    info!("Advancing boot monitor every {}ms.", params.tick_interval_ms);
    let mut trigger = interval(Duration::from_millis(params.tick_interval_ms.max(1)));
    trigger.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ticker = Ticker { controller };
    loop_with_stop!(
        "monitor tick timer", stop_rx,
        trigger.tick() => ticker.tick(it)
    )
}

struct Poller {
    bot: Arc<Bot>,
}

impl Poller {
    async fn tick(&self, _it: Instant) -> Result<()> {
        if let Err(e) = self.bot.poll().await {
            error!("Failed to poll for commands due to {:?}", e);
        }
        Ok(())
    }
}

struct Ticker {
    controller: Arc<WakeController>,
}

impl Ticker {
    async fn tick(&self, _it: Instant) -> Result<()> {
        let outcome = self.controller.on_tick().await;
        if outcome != TickOutcome::Idle {
            trace!("Monitor tick: {:?}", outcome);
        }
        Ok(())
    }
}
