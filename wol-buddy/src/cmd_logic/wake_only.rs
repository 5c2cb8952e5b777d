use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::executor;
use log::info;
use wake_crab::helpers::stop::flatten;
use wake_crab::notify::LogNotifier;

use crate::controller::WakeOutcome;

use super::Env;

pub fn handle(env: Env) -> Result<()> {
    let controller = env.controller(Arc::new(LogNotifier));
    let handle = tokio::spawn(async move {
        let outcome = controller.on_wake_only_command().await;
        if outcome.sent() {
            info!("Wake packet sent for {}.", controller.target().mac);
            return Ok(());
        }
        match outcome {
            WakeOutcome::Failed(e) => Err(e).context("sending the wake packet"),
            other => bail!("wake packet not sent: {:?}", other),
        }
    });
    executor::block_on(flatten(handle))
}
