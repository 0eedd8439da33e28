//! Local port allocation and readiness polling.

use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout_at};

use crate::error::BridgeError;

/// Interval between connection attempts while waiting for a listener.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Bind an ephemeral loopback port, release it, and return its number.
///
/// The port is free at return time only; the worker races everyone else for it.
pub fn find_open_port() -> Result<u16, BridgeError> {
    let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
        .map_err(BridgeError::ResourceExhausted)?;
    let port = listener
        .local_addr()
        .map_err(BridgeError::ResourceExhausted)?
        .port();
    drop(listener);
    Ok(port)
}

/// Poll `host:port` every [`POLL_INTERVAL`] until a TCP connection succeeds.
///
/// Returns `false` once `timeout` has elapsed. Dropping the future cancels the
/// wait immediately; no attempt outlives the deadline.
pub async fn wait_for_listener(host: &str, port: u16, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match timeout_at(deadline, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => return true,
            Ok(Err(e)) => {
                tracing::trace!(port, "Worker not accepting connections yet: {e}");
            }
            Err(_) => return false,
        }
        if Instant::now() + POLL_INTERVAL >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
