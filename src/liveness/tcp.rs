use std::net::SocketAddr;
use std::time::Duration;

use log::trace;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Whether a TCP handshake with `addr` completes within `limit`. A refused connection
/// does not count.
pub async fn accepts(addr: SocketAddr, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            trace!("TCP connect to {} failed: {}", addr, e);
            false
        }
        Err(_elapsed) => {
            trace!("TCP connect to {} timed out after {}ms", addr, limit.as_millis());
            false
        }
    }
}
