use std::net::IpAddr;
use std::time::Duration;

use wake_crab::liveness::ProbeResult;
use wake_crab::monitor::{self, StatusReport, TimingReport};
use wake_crab::notify::MessageBuilder;

const EXPECTED_BOOT: &str = "20-50 seconds";

pub const ACCESS_DENIED: &str = "⛔ Access denied";
pub const WAKE_ACK: &str = "🔌 Command received, sending WoL...";
pub const WAKE_FAILED: &str = "❌ WoL send error";
pub const WAKE_ONLY_ACK: &str = "🔌 Sending WoL without monitoring...";
pub const CHECKING: &str = "🔍 Checking server...";
pub const HISTORY_CLEARED: &str = "🗑️ History cleared";

pub fn help(host: IpAddr, params: &monitor::Params) -> String {
    MessageBuilder::new("🤖 WoL Bot with detailed monitoring")
        .blank()
        .line("📊 Commands:")
        .line("/wake - turn on + boot monitoring")
        .line("/wakeonly - WoL only (no monitoring)")
        .line("/status - system status")
        .line("/check - check server now")
        .line("/timing - timing statistics")
        .line("/ping - connection test")
        .line("/clear - clear history")
        .blank()
        .line("⚙️ Monitoring settings:")
        .field("Max time", format!("{} sec", params.max_wait_secs))
        .field("Server", host)
        .field("Normal boot", EXPECTED_BOOT)
        .build()
}

pub fn monitoring_plan(params: &monitor::Params) -> String {
    MessageBuilder::new("✅ WoL sent!")
        .blank()
        .line("📊 Starting boot monitoring:")
        .field("Expected time", EXPECTED_BOOT)
        .field("Maximum", format!("{} seconds", params.max_wait_secs))
        .bullet(format!("Check every {} sec", params.check_interval_secs))
        .bullet(format!("Progress every {} sec", params.progress_interval_secs))
        .blank()
        .line("I'll notify you when server boots with timing statistics!")
        .build()
}

pub fn already_monitoring(elapsed_secs: u64) -> String {
    MessageBuilder::new("⏳ Monitoring already in progress")
        .line(format!("{} sec elapsed, no new WoL sent", elapsed_secs))
        .build()
}

pub fn wake_only_sent(host: IpAddr) -> String {
    format!("✅ WoL sent to {}", host)
}

pub fn status(report: &StatusReport, host: IpAddr, last_update_id: Option<u64>) -> String {
    let monitoring = if report.active {
        format!("ACTIVE {} sec", report.elapsed_secs)
    } else {
        "disabled".to_string()
    };
    let mut msg = MessageBuilder::new("📊 System status:")
        .line(format!("Server: {}", host))
        .line(format!("Monitoring: {}", monitoring));
    if let Some(requester) = &report.requester {
        msg = msg.line(format!("Requested by: {}", requester));
    }
    msg.line(format!("lastUpdateId: {}", last_update_id.unwrap_or(0)))
        .build()
}

pub fn check(host: IpAddr, result: &ProbeResult) -> String {
    match (result.alive, result.strategy) {
        (true, Some(strategy)) => format!("✅ Server online! {} ({})", host, strategy),
        (true, None) => format!("✅ Server online! {}", host),
        (false, _) => format!("❌ Server offline {}", host),
    }
}

pub fn timing(report: Option<&TimingReport>) -> String {
    let Some(report) = report else {
        return "ℹ️ WoL hasn't been sent yet".to_string();
    };
    let footer = if report.monitoring {
        "📡 Monitoring active"
    } else {
        "✅ WoL was sent"
    };
    MessageBuilder::new("⏱️ Timing statistics:")
        .blank()
        .field("Command→WoL", format!("{} ms", report.command_to_wake.as_millis()))
        .field("WoL→Now", format!("{} sec", report.since_wake.as_secs()))
        .field("Total", format!("{} sec", report.total.as_secs()))
        .blank()
        .line(footer)
        .build()
}

pub fn pong(uptime: Duration) -> String {
    format!("🏓 Pong! {} ms", uptime.as_millis())
}

pub fn unknown(text: &str) -> String {
    format!("❓ Unknown command: {}", text)
}
