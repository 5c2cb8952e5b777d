use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::trace;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const MAX_RESPONSE_HEADER_BYTES: usize = 16 * 1024;
const READ_CHUNK_BYTES: usize = 1024;

/// Whether anything at `addr` answers an HTTP request with a status line within `limit`.
/// Error statuses count, only the application layer being up matters here.
pub async fn responds(addr: SocketAddr, limit: Duration) -> bool {
    match timeout(limit, fetch_status(addr)).await {
        Ok(Ok(code)) => {
            trace!("HTTP {} from {}", code, addr);
            true
        }
        Ok(Err(e)) => {
            trace!("HTTP request to {} failed: {:?}", addr, e);
            false
        }
        Err(_elapsed) => {
            trace!("HTTP request to {} timed out after {}ms", addr, limit.as_millis());
            false
        }
    }
}

async fn fetch_status(addr: SocketAddr) -> Result<u16> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("connecting to {}", addr))?;
    stream
        .write_all(request_for(addr).as_bytes())
        .await
        .context("writing request")?;

    let mut buffer = Vec::with_capacity(READ_CHUNK_BYTES);
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    loop {
        let read = stream.read(&mut chunk).await.context("reading response")?;
        if read == 0 {
            bail!("connection closed before a status line arrived");
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(code) = parse_status(&buffer)? {
            return Ok(code);
        }
        if buffer.len() > MAX_RESPONSE_HEADER_BYTES {
            bail!("no status line within {} bytes", MAX_RESPONSE_HEADER_BYTES);
        }
    }
}

fn request_for(addr: SocketAddr) -> String {
    format!(
        "GET / HTTP/1.1\r\nHost: {}\r\nUser-Agent: wake-crab/{}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
        addr,
        env!("CARGO_PKG_VERSION")
    )
}

/// `Ok(None)` means the status line is not complete yet.
fn parse_status(buffer: &[u8]) -> Result<Option<u16>> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(buffer) {
        Ok(_) => Ok(response.code),
        // the status line was fine, the host is clearly talking HTTP
        Err(httparse::Error::TooManyHeaders) => Ok(response.code),
        Err(e) => Err(anyhow!(e).context("parsing response")),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use assertor::*;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve_once(reply: &'static [u8]) -> Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(reply).await;
            }
        });
        Ok(addr)
    }

    #[tokio::test]
    async fn error_status_counts_as_alive() -> Result<()> {
        // given
        let addr = serve_once(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n").await?;

        // when
        let res = responds(addr, Duration::from_secs(2)).await;

        // then
        assert_that!(res).is_true();
        Ok(())
    }

    #[tokio::test]
    async fn garbage_reply_is_not_http() -> Result<()> {
        // given
        let addr = serve_once(b"SSH-2.0-OpenSSH_9.6\r\n").await?;

        // when
        let res = responds(addr, Duration::from_secs(2)).await;

        // then
        assert_that!(res).is_false();
        Ok(())
    }

    #[tokio::test]
    async fn silent_listener_times_out() -> Result<()> {
        // given
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        // when
        let res = responds(addr, Duration::from_millis(200)).await;

        // then
        assert_that!(res).is_false();
        drop(listener);
        Ok(())
    }

    #[test]
    fn partial_status_line_waits_for_more() -> Result<()> {
        assert_that!(parse_status(b"HTTP/1.1 20")?).is_none();
        assert_that!(parse_status(b"HTTP/1.1 204 No Content\r\n")?).is_equal_to(Some(204));
        Ok(())
    }

    #[test]
    fn request_names_host_and_closes() {
        let req = request_for("192.0.2.7:8080".parse().unwrap());
        assert!(req.starts_with("GET / HTTP/1.1\r\n"));
        assert!(req.contains("Host: 192.0.2.7:8080\r\n"));
        assert!(req.ends_with("Connection: close\r\n\r\n"));
    }
}
