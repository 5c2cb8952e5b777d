use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use log::info;

pub use self::message::MessageBuilder;

mod message;

/// Opaque chat identity of whoever asked for something, and who gets told about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound status channel. Delivery is best-effort; callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &Identity, text: &str) -> Result<()>;
}

/// Writes notifications to the log, for runs without a chat attached.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &Identity, text: &str) -> Result<()> {
        for line in text.lines() {
            info!("[{}] {}", recipient, line);
        }
        Ok(())
    }
}
