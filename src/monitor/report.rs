use std::net::IpAddr;

use strum::Display;

use crate::liveness::Strategy;
use crate::notify::MessageBuilder;
use crate::target::MacAddress;

const BAR_SEGMENTS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BootSpeed {
    #[strum(to_string = "⚡ Fast boot!")]
    Fast,
    #[strum(to_string = "🐢 Normal boot")]
    Normal,
    #[strum(to_string = "⚠️ Slow boot, check the server")]
    Slow,
}

impl BootSpeed {
    pub fn classify(wake_to_boot_secs: u64) -> Self {
        match wake_to_boot_secs {
            0..=29 => BootSpeed::Fast,
            30..=59 => BootSpeed::Normal,
            _ => BootSpeed::Slow,
        }
    }
}

/// Statistics of a successful boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub total_secs: u64,
    pub wake_to_boot_secs: u64,
    pub host: IpAddr,
    pub mac: MacAddress,
    pub strategy: Option<Strategy>,
}

impl BootReport {
    pub fn speed(&self) -> BootSpeed {
        BootSpeed::classify(self.wake_to_boot_secs)
    }
}

pub fn percent_of(elapsed_secs: u64, max_wait_secs: u64) -> u64 {
    (elapsed_secs.saturating_mul(100) / max_wait_secs.max(1)).min(100)
}

pub fn progress_bar(percent: u64) -> String {
    let filled = percent.min(100) / BAR_SEGMENTS;
    (0..BAR_SEGMENTS)
        .map(|segment| if segment < filled { '█' } else { '░' })
        .collect()
}

pub fn progress(elapsed_secs: u64, since_wake_secs: u64, max_wait_secs: u64) -> String {
    let percent = percent_of(elapsed_secs, max_wait_secs);
    MessageBuilder::new(format!("⏳ Monitoring: {} sec since command", elapsed_secs))
        .line(format!("Wake packet sent {} sec ago", since_wake_secs))
        .line(format!("[{}] {}%", progress_bar(percent), percent))
        .build()
}

pub fn booted(report: &BootReport) -> String {
    let mut msg = MessageBuilder::new("🎉 Server has booted!")
        .blank()
        .line("📊 Boot statistics:")
        .field("Total time", format!("{} sec", report.total_secs))
        .field("Wake→Boot", format!("{} sec", report.wake_to_boot_secs))
        .field("IP", report.host)
        .field("MAC", report.mac);
    if let Some(strategy) = report.strategy {
        msg = msg.field("Answered via", strategy);
    }
    msg.blank().line(report.speed().to_string()).build()
}

pub fn timed_out(elapsed_secs: u64, since_wake_secs: u64) -> String {
    MessageBuilder::new("⏰ Timeout!")
        .blank()
        .line(format!("Server did not boot within {} sec", elapsed_secs))
        .line(format!("Wake packet sent {} sec ago", since_wake_secs))
        .blank()
        .line("Possible issues:")
        .item("Wake-on-LAN not enabled in BIOS/UEFI")
        .item("Server stuck during boot")
        .item("Power issues")
        .item("Long POST check")
        .blank()
        .line("Try /wake again")
        .build()
}
