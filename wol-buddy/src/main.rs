use anyhow::Result;
use clap::Parser;

use wake_crab::helpers::{bootstrap, logging};
use wake_crab::{liveness, monitor, target};

mod bot;
mod cmd_logic;
mod controller;
mod schedule;
mod transport;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[clap(flatten)]
    logging: logging::Params,

    #[clap(flatten)]
    target: target::Params,

    #[clap(flatten)]
    monitor: monitor::Params,

    #[clap(flatten)]
    liveness: liveness::Params,

    #[command(subcommand)]
    command: cmd_logic::Commands,
}

fn main() -> Result<()> {
    bootstrap::run(Cli::parse, |cli: &Cli| &cli.logging, do_run)
}

fn do_run(cli: Cli) -> Result<()> {
    let env = cmd_logic::Env {
        target: (&cli.target).into(),
        monitor: cli.monitor,
        liveness: cli.liveness,
    };
    cmd_logic::handle(env, cli.command)
}
