use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use log::debug;
use wake_crab::liveness::{self, LivenessProbe};
use wake_crab::magic_packet::UdpPacketSender;
use wake_crab::monitor::{self, SystemClock};
use wake_crab::notify::Notifier;
use wake_crab::target::WakeTarget;

use crate::controller::WakeController;

pub mod check;
pub mod listen;
pub mod wake;
pub mod wake_only;

/// Settings shared by every subcommand.
pub struct Env {
    pub target: WakeTarget,
    pub monitor: monitor::Params,
    pub liveness: liveness::Params,
}

impl Env {
    fn controller(&self, notifier: Arc<dyn Notifier>) -> WakeController {
        WakeController::new(
            self.target,
            self.monitor.clone(),
            Arc::new(UdpPacketSender),
            Arc::new(LivenessProbe::new(&self.liveness)),
            notifier,
            Arc::new(SystemClock),
        )
    }
}

pub fn handle(env: Env, cmd: Commands) -> Result<()> {
    let command_result = match cmd {
        Commands::Listen(params) => listen::handle(env, params),
        Commands::Wake => wake::handle(env),
        Commands::WakeOnly => wake_only::handle(env),
        Commands::Check => check::handle(env),
    };
    debug!("Finished command execution. Result: {:?}", command_result);
    command_result
}

#[derive(Subcommand)]
pub enum Commands {
    /// Take commands from a chat, wake the server on request and report its boot.
    Listen(listen::Params),

    /// Send the wake packet once and watch the boot here, reporting to the log.
    Wake,

    /// Send the wake packet once, without watching the boot.
    WakeOnly,

    /// Check once whether the server is up.
    Check,
}
