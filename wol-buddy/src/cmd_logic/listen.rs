use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use futures::executor;
use log::info;
use tokio::try_join;
use wake_crab::helpers::stop::{self, flatten};
use wake_crab::monitor::SystemClock;

use crate::bot::{access, Bot, Whitelist};
use crate::schedule;
use crate::transport::{ChatTransport, ConsoleTransport, TransportNotifier};

use super::Env;

#[derive(Args)]
#[group(id = "listen")]
pub struct Params {
    #[clap(flatten)]
    access: access::Params,

    #[clap(flatten)]
    schedule: schedule::Params,
}

pub fn handle(env: Env, params: Params) -> Result<()> {
    let sig_handler = stop::new();
    let stop_rx = sig_handler.subscribe_stop();
    let signal_handle = tokio::spawn(sig_handler.wait_for_signal());

    let (console, stdin_handle) = ConsoleTransport::from_stdin(stop_rx.clone());
    let transport: Arc<dyn ChatTransport> = Arc::new(console);
    let notifier = Arc::new(TransportNotifier::new(transport.clone()));
    let controller = Arc::new(env.controller(notifier));

    let whitelist = Whitelist::from(&params.access);
    let bot = Arc::new(Bot::new(
        controller.clone(),
        transport,
        whitelist,
        Arc::new(SystemClock),
    ));
    info!(
        "Ready to wake {} ({}), allowing {} identities.",
        env.target.host,
        env.target.mac,
        params.access.allowed_users.len()
    );

    let poll_handle = tokio::spawn(schedule::run_poll(
        bot,
        stop_rx.clone(),
        params.schedule.clone(),
    ));
    let tick_handle = tokio::spawn(schedule::run_ticks(
        controller,
        stop_rx,
        params.schedule,
    ));

    executor::block_on(async {
        try_join!(
            flatten(signal_handle),
            flatten(stdin_handle),
            flatten(poll_handle),
            flatten(tick_handle),
        )?;
        Ok(())
    })
}
