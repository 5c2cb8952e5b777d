use anyhow::{bail, Result};
use futures::executor;
use log::info;
use wake_crab::helpers::stop::flatten;
use wake_crab::liveness::{LivenessCheck, LivenessProbe};

use super::Env;

pub fn handle(env: Env) -> Result<()> {
    let probe = LivenessProbe::new(&env.liveness);
    let host = env.target.host;
    let handle = tokio::spawn(async move {
        let result = probe.is_online(host).await;
        match result.strategy {
            Some(strategy) if result.alive => {
                info!("✅ {} is online, answered via {}.", host, strategy);
                Ok(())
            }
            _ => bail!("{} is offline", host),
        }
    });
    executor::block_on(flatten(handle))
}
