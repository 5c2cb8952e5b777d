use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, error::TryRecvError, Receiver, Sender};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use wake_crab::helpers::stop;
use wake_crab::loop_with_stop;
use wake_crab::notify::Identity;

use super::{ChatTransport, Update};

const PENDING_LINES: usize = 64;
const NO_UPDATE_YET: u64 = 0;

/// Each stdin line `<identity> <command>` is one update. Replies go to stdout.
pub struct ConsoleTransport {
    lines: Mutex<Receiver<String>>,
    last_id: AtomicU64,
}

impl ConsoleTransport {
    pub fn new(lines: Receiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
            last_id: AtomicU64::new(NO_UPDATE_YET),
        }
    }

    /// Starts reading stdin in the background. When stdin closes, the whole process is
    /// asked to stop.
    pub fn from_stdin(stop_rx: CancellationToken) -> (Self, tokio::task::JoinHandle<Result<()>>) {
        let (line_tx, line_rx) = mpsc::channel(PENDING_LINES);
        let handle = tokio::spawn(read_stdin(line_tx, stop_rx));
        (Self::new(line_rx), handle)
    }

    fn parse(&self, line: &str) -> Option<Update> {
        let (sender, text) = split_line(line)?;
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        Some(Update {
            id,
            sender: Identity::new(sender),
            text: text.to_string(),
        })
    }
}

fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((sender, text)) if !text.trim().is_empty() => Some((sender, text.trim())),
        _ => {
            warn!("Ignoring console line without `<identity> <command>`: {}", line);
            None
        }
    }
}

fn render(recipient: &Identity, text: &str) -> String {
    let mut out = format!("→ {}:\n", recipient);
    for line in text.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn next_update(&self) -> Result<Option<Update>> {
        let mut lines = self.lines.lock().await;
        loop {
            match lines.try_recv() {
                Ok(line) => {
                    if let Some(update) = self.parse(&line) {
                        return Ok(Some(update));
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(None),
            }
        }
    }

    async fn send(&self, recipient: &Identity, text: &str) -> Result<()> {
        let mut out = stdout();
        out.write_all(render(recipient, text).as_bytes())
            .await
            .context("writing reply to stdout")?;
        out.flush().await.context("flushing stdout")
    }

    async fn clear_history(&self) -> Result<usize> {
        let mut lines = self.lines.lock().await;
        let mut dropped = 0;
        while lines.try_recv().is_ok() {
            dropped += 1;
        }
        debug!("Dropped {} pending console lines", dropped);
        Ok(dropped)
    }

    fn last_update_id(&self) -> Option<u64> {
        match self.last_id.load(Ordering::SeqCst) {
            NO_UPDATE_YET => None,
            id => Some(id),
        }
    }
}

async fn read_stdin(line_tx: Sender<String>, stop_rx: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();
    let forwarder = LineForwarder {
        line_tx,
        stop_rx: stop_rx.clone(),
    };
    info!("Reading commands from stdin as `<identity> <command>` lines.");
    loop_with_stop!(
        "stdin reader", stop_rx,
        lines.next_line() => forwarder.forward(it)
    )
}

struct LineForwarder {
    line_tx: Sender<String>,
    stop_rx: CancellationToken,
}

impl LineForwarder {
    async fn forward(&self, read: std::io::Result<Option<String>>) -> Result<()> {
        match read.context("reading stdin")? {
            Some(line) => {
                if self.line_tx.send(line).await.is_err() {
                    debug!("Console transport is gone, no more lines to forward.");
                }
                Ok(())
            }
            None => {
                info!("stdin closed, stopping.");
                stop::trigger()?;
                // do not spin on a closed stdin until the signal arrives
                self.stop_rx.cancelled().await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn line_splits_into_sender_and_command() {
        assert_that!(split_line("  42 /wake \n")).is_equal_to(Some(("42", "/wake")));
        assert_that!(split_line("42\t/status")).is_equal_to(Some(("42", "/status")));
        assert_that!(split_line("")).is_equal_to(None);
        assert_that!(split_line("/wake")).is_equal_to(None);
    }

    #[test]
    fn reply_is_indented_under_recipient() {
        // given, when
        let out = render(&Identity::new("42"), "🏓 Pong!\nsecond");

        // then
        assert_that!(out).is_equal_to("→ 42:\n  🏓 Pong!\n  second\n".to_string());
    }

    #[tokio::test]
    async fn updates_come_one_at_a_time_with_rising_ids() -> Result<()> {
        // given
        let (tx, rx) = mpsc::channel(8);
        let transport = ConsoleTransport::new(rx);
        tx.send("42 /wake".to_string()).await?;
        tx.send("garbage".to_string()).await?;
        tx.send("7 /status".to_string()).await?;

        // when
        let first = transport.next_update().await?;
        let second = transport.next_update().await?;
        let third = transport.next_update().await?;

        // then
        assert_that!(first).is_equal_to(Some(Update {
            id: 1,
            sender: Identity::new("42"),
            text: "/wake".to_string(),
        }));
        assert_that!(second.map(|it| it.id)).is_equal_to(Some(2));
        assert_that!(third).is_equal_to(None);
        assert_that!(transport.last_update_id()).is_equal_to(Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn clear_drops_pending_lines() -> Result<()> {
        // given
        let (tx, rx) = mpsc::channel(8);
        let transport = ConsoleTransport::new(rx);
        tx.send("42 /wake".to_string()).await?;
        tx.send("42 /wake".to_string()).await?;

        // when
        let dropped = transport.clear_history().await?;

        // then
        assert_that!(dropped).is_equal_to(2);
        assert_that!(transport.next_update().await?).is_equal_to(None);
        assert_that!(transport.last_update_id()).is_equal_to(None);
        Ok(())
    }
}
