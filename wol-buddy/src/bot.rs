use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};
use wake_crab::monitor::Clock;
use wake_crab::notify::Identity;

use crate::controller::{WakeController, WakeOutcome};
use crate::transport::{ChatTransport, Update};

pub use self::access::Whitelist;
pub use self::command::Command;

pub mod access;
mod command;
mod replies;

pub struct Bot {
    controller: Arc<WakeController>,
    transport: Arc<dyn ChatTransport>,
    whitelist: Whitelist,
    clock: Arc<dyn Clock>,
    started_at: Instant,
}

impl Bot {
    pub fn new(
        controller: Arc<WakeController>,
        transport: Arc<dyn ChatTransport>,
        whitelist: Whitelist,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let started_at = clock.now();
        Self {
            controller,
            transport,
            whitelist,
            clock,
            started_at,
        }
    }

    /// Handles at most one pending update. Returns whether there was one.
    pub async fn poll(&self) -> Result<bool> {
        match self.transport.next_update().await? {
            Some(update) => {
                self.dispatch(update).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn dispatch(&self, update: Update) -> Result<()> {
        let from = &update.sender;
        if !self.whitelist.allows(from) {
            warn!("Rejected update {} from unknown sender {}", update.id, from);
            self.reply(from, replies::ACCESS_DENIED).await;
            return Ok(());
        }

        let command = Command::parse(&update.text);
        info!("Processing {:?} from {}", command, from);
        let host = self.controller.target().host;
        match command {
            Command::Help => {
                let text = replies::help(host, self.controller.monitor_params());
                self.reply(from, &text).await;
            }
            Command::Wake => {
                self.reply(from, replies::WAKE_ACK).await;
                let text = match self.controller.on_wake_command(from.clone()).await {
                    WakeOutcome::Sent => replies::monitoring_plan(self.controller.monitor_params()),
                    WakeOutcome::AlreadyMonitoring { elapsed_secs } => {
                        replies::already_monitoring(elapsed_secs)
                    }
                    WakeOutcome::Failed(_) => replies::WAKE_FAILED.to_string(),
                };
                self.reply(from, &text).await;
            }
            Command::WakeOnly => {
                self.reply(from, replies::WAKE_ONLY_ACK).await;
                let text = match self.controller.on_wake_only_command().await {
                    WakeOutcome::Sent => replies::wake_only_sent(host),
                    _ => replies::WAKE_FAILED.to_string(),
                };
                self.reply(from, &text).await;
            }
            Command::Status => {
                let report = self.controller.on_status_query().await;
                let text = replies::status(&report, host, self.transport.last_update_id());
                self.reply(from, &text).await;
            }
            Command::Check => {
                self.reply(from, replies::CHECKING).await;
                let result = self.controller.on_check_command().await;
                self.reply(from, &replies::check(host, &result)).await;
            }
            Command::Timing => {
                let report = self.controller.on_timing_query().await;
                self.reply(from, &replies::timing(report.as_ref())).await;
            }
            Command::Ping => {
                let uptime = self.clock.now().saturating_duration_since(self.started_at);
                self.reply(from, &replies::pong(uptime)).await;
            }
            Command::Clear => {
                let dropped = self.transport.clear_history().await?;
                debug!("Cleared {} pending updates on request of {}", dropped, from);
                self.reply(from, replies::HISTORY_CLEARED).await;
            }
            Command::Unknown(text) => {
                debug!("Unknown command from {}: {}", from, text);
                self.reply(from, &replies::unknown(&text)).await;
            }
        }
        Ok(())
    }

    async fn reply(&self, to: &Identity, text: &str) {
        if let Err(e) = self.transport.send(to, text).await {
            warn!("Failed to reply to {}, carrying on: {:?}", to, e);
        }
    }
}
