use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::executor;
use log::info;
use tokio::time::{interval, MissedTickBehavior};
use wake_crab::helpers::stop::flatten;
use wake_crab::monitor::TickOutcome;
use wake_crab::notify::{Identity, LogNotifier};

use crate::controller::{WakeController, WakeOutcome};

use super::Env;

const TICK: std::time::Duration = std::time::Duration::from_secs(1);

pub fn handle(env: Env) -> Result<()> {
    let controller = env.controller(Arc::new(LogNotifier));
    let handle = tokio::spawn(wake_and_watch(controller));
    executor::block_on(flatten(handle))
}

async fn wake_and_watch(controller: WakeController) -> Result<()> {
    match controller.on_wake_command(Identity::new("console")).await {
        WakeOutcome::Sent => info!(
            "Wake packet sent, watching {} for up to {}s.",
            controller.target().host,
            controller.monitor_params().max_wait_secs
        ),
        WakeOutcome::Failed(e) => return Err(e).context("sending the wake packet"),
        WakeOutcome::AlreadyMonitoring { .. } => bail!("a boot is already being watched"),
    }

    let mut trigger = interval(TICK);
    trigger.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        trigger.tick().await;
        match controller.on_tick().await {
            TickOutcome::Booted(_) | TickOutcome::Idle => return Ok(()),
            TickOutcome::TimedOut { elapsed_secs } => {
                bail!("{} did not boot within {}s", controller.target().host, elapsed_secs)
            }
            TickOutcome::Waiting { .. } => {}
        }
    }
}
