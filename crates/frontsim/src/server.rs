//! Transport setup: bind, wait for the single consumer, shutdown signals.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors raised before a session starts.
#[derive(Debug)]
pub enum TransportError {
    /// The listening socket could not be created
    Bind { addr: String, source: io::Error },
    /// Waiting for a consumer failed for a reason other than shutdown
    Accept(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            Self::Accept(e) => write!(f, "Failed to accept client: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
            Self::Accept(e) => Some(e),
        }
    }
}

/// Bind the listening socket.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, TransportError> {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })
}

/// Wait for one consumer. `Ok(None)` means shutdown was requested first.
pub async fn accept_one(
    listener: &TcpListener,
    token: &CancellationToken,
) -> Result<Option<(TcpStream, SocketAddr)>, TransportError> {
    tokio::select! {
        _ = token.cancelled() => Ok(None),
        accepted = listener.accept() => {
            let (stream, peer) = accepted.map_err(TransportError::Accept)?;
            if let Err(e) = stream.set_nodelay(true) {
                warn!(error = %e, "Could not disable Nagle on client socket");
            }
            Ok(Some((stream, peer)))
        }
    }
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix.
pub async fn cancel_on_signal(token: CancellationToken) {
    if wait_for_signal().await {
        info!("Shutdown signal received");
        token.cancel();
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            return ctrl_c().await;
        }
    };
    tokio::select! {
        received = ctrl_c() => received,
        _ = term.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    ctrl_c().await
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Ctrl-C handler unavailable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_returns_none_on_cancel() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(accept_one(&listener, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_accept_returns_peer() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (_stream, peer) = accept_one(&listener, &token).await.unwrap().unwrap();
        let client = client.await.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_bind_failure_reports_address() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let err = bind("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
        assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
    }
}
