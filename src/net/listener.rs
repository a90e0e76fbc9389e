//! Shared TCP listener.
//!
//! # Responsibilities
//! - Bind the worker port with `SO_REUSEADDR`
//! - On Unix, also set `SO_REUSEPORT` so every worker binds the same port
//!   and the kernel spreads connections across them

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};

const BACKLOG: u32 = 1024;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to create socket for {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a listener that other worker processes can bind too.
pub fn bind_shared(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(|source| ListenerError::Socket { addr, source })?;

    socket
        .set_reuseaddr(true)
        .map_err(|source| ListenerError::Socket { addr, source })?;

    #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
    socket
        .set_reuseport(true)
        .map_err(|source| ListenerError::Socket { addr, source })?;

    socket
        .bind(addr)
        .map_err(|source| ListenerError::Bind { addr, source })?;

    let listener = socket
        .listen(BACKLOG)
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %addr, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind_shared("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_two_listeners_share_a_port() {
        let first = bind_shared("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = first.local_addr().unwrap();
        let second = bind_shared(addr).unwrap();
        assert_eq!(second.local_addr().unwrap(), addr);
    }
}
