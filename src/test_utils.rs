use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::error::TransmissionError;
use crate::liveness::{LivenessCheck, ProbeResult, Strategy};
use crate::magic_packet::{PacketSender, SendReceipt};
use crate::monitor::Clock;
use crate::notify::{Identity, Notifier};
use crate::target::WakeTarget;

/// A clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Sets the time relative to the creation of this clock.
    pub fn set_elapsed(&self, elapsed: Duration) {
        self.offset_nanos
            .store(elapsed.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Identity, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(Identity, String)> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &Identity, text: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push((recipient.clone(), text.to_string()));
        Ok(())
    }
}

/// Fails every delivery, like a chat service that is down.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, recipient: &Identity, _text: &str) -> Result<()> {
        bail!("chat service unreachable, cannot reach {}", recipient)
    }
}

/// Answers liveness checks from a script instead of the network.
pub struct ScriptedCheck {
    answer: Mutex<ProbeResult>,
    calls: AtomicUsize,
}

impl ScriptedCheck {
    pub fn offline() -> Self {
        Self {
            answer: Mutex::new(ProbeResult::not_alive()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_online(&self, via: Strategy) {
        *self.answer.lock().expect("check lock poisoned") = ProbeResult::alive_via(via);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LivenessCheck for ScriptedCheck {
    async fn is_online(&self, _host: IpAddr) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.answer.lock().expect("check lock poisoned")
    }
}

/// Pretends to send wake packets, stamping them with the given clock.
pub struct ScriptedSender {
    clock: Arc<dyn Clock>,
    failing: AtomicBool,
    sends: AtomicUsize,
}

impl ScriptedSender {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            failing: AtomicBool::new(false),
            sends: AtomicUsize::new(0),
        }
    }

    /// Makes every following send fail as if the interface was down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PacketSender for ScriptedSender {
    async fn send(&self, _target: &WakeTarget) -> SendReceipt {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(TransmissionError::Bind {
                source: io::Error::new(io::ErrorKind::AddrNotAvailable, "interface down"),
            })
        } else {
            Ok(())
        };
        SendReceipt {
            sent_at: self.clock.now(),
            result,
        }
    }
}
