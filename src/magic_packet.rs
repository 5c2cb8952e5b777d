use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::net::UdpSocket;

use crate::error::TransmissionError;
use crate::target::{MacAddress, WakeTarget};

const SIX_FF: [u8; 6] = [0xFF; 6];
const MAC_REPETITIONS: usize = 16;
pub const PACKET_LEN: usize = SIX_FF.len() + MAC_REPETITIONS * 6;

/// The standard Wake-on-LAN payload: six `0xFF` bytes, then the MAC sixteen times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicPacket {
    bytes: Vec<u8>,
}

impl MagicPacket {
    pub fn new(mac: &MacAddress) -> Self {
        let mut bytes = Vec::with_capacity(PACKET_LEN);
        bytes.extend_from_slice(&SIX_FF);
        for _ in 0..MAC_REPETITIONS {
            bytes.extend_from_slice(mac.octets());
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// What came of one send attempt. `sent_at` is recorded whether or not the send worked.
#[derive(Debug)]
pub struct SendReceipt {
    pub sent_at: Instant,
    pub result: Result<(), TransmissionError>,
}

impl SendReceipt {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[async_trait]
pub trait PacketSender: Send + Sync {
    /// Fires one wake packet at the target's broadcast address. Never retries.
    async fn send(&self, target: &WakeTarget) -> SendReceipt;
}

/// Sends the wake packet as a single broadcast UDP datagram.
#[derive(Debug, Default)]
pub struct UdpPacketSender;

#[async_trait]
impl PacketSender for UdpPacketSender {
    async fn send(&self, target: &WakeTarget) -> SendReceipt {
        let packet = MagicPacket::new(&target.mac);
        let dest = SocketAddr::V4(SocketAddrV4::new(target.broadcast, target.port));
        debug!("Sending magic packet for {} to {}", target.mac, dest);
        let sent_at = Instant::now();
        let result = transmit(&packet, dest).await;
        match &result {
            Ok(_) => info!("Wake packet for {} sent to {}", target.mac, dest),
            Err(e) => error!("Wake packet for {} could not be sent: {:?}", target.mac, e),
        }
        SendReceipt { sent_at, result }
    }
}

async fn transmit(packet: &MagicPacket, dest: SocketAddr) -> Result<(), TransmissionError> {
    use TransmissionError as E;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|source| E::Bind { source })?;
    socket
        .set_broadcast(true)
        .map_err(|source| E::Broadcast { source })?;
    let written = socket
        .send_to(packet.as_bytes(), dest)
        .await
        .map_err(|source| E::Send { dest, source })?;
    if written != PACKET_LEN {
        return Err(E::ShortWrite {
            dest,
            written,
            expected: PACKET_LEN,
        });
    }
    Ok(())
}
