use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use wake_crab::notify::{Identity, Notifier};

pub use self::console::ConsoleTransport;

pub mod console;

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: u64,
    pub sender: Identity,
    pub text: String,
}

/// Where commands come from and replies go to.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Fetches at most one pending update, without waiting for new ones.
    async fn next_update(&self) -> Result<Option<Update>>;

    async fn send(&self, recipient: &Identity, text: &str) -> Result<()>;

    /// Drops whatever is still pending. Returns how many updates were discarded.
    async fn clear_history(&self) -> Result<usize>;

    fn last_update_id(&self) -> Option<u64>;
}

/// Lets the boot monitor report through a chat transport.
pub struct TransportNotifier {
    transport: Arc<dyn ChatTransport>,
}

impl TransportNotifier {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Notifier for TransportNotifier {
    async fn notify(&self, recipient: &Identity, text: &str) -> Result<()> {
        self.transport.send(recipient, text).await
    }
}
