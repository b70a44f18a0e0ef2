// Connection handling module
// Serves one accepted TCP connection over HTTP/1.1

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use super::tracker::ConnectionGuard;
use crate::config::AppState;
use crate::handler;

/// Accept a connection, enforcing `performance.max_connections`
///
/// Returns `false` when the connection was refused.
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) -> bool {
    let max_conn = state.config.performance.max_connections;
    let Some(guard) = state.connections.try_track(max_conn) else {
        tracing::warn!(
            "Max connections reached: {}/{}. Connection from {peer_addr} rejected.",
            state.connections.active_count(),
            max_conn.unwrap_or_default(),
        );
        drop(stream);
        return false;
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY for {peer_addr}: {e}");
    }
    tracing::debug!("Accepted connection from {peer_addr}");
    tokio::spawn(serve_connection(stream, peer_addr, Arc::clone(state), guard));
    true
}

async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    _guard: ConnectionGuard,
) {
    let mut shutdown = state.connections.shutdown_receiver();
    let performance = &state.config.performance;

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(performance.keep_alive_timeout > 0);
    if performance.read_timeout > 0 {
        // Bounds header arrival only; picker long-polls keep the connection busy legitimately
        builder.header_read_timeout(Duration::from_secs(performance.read_timeout));
    }

    let service_state = Arc::clone(&state);
    let service = service_fn(move |req| {
        handler::handle_request(req, Arc::clone(&service_state), peer_addr)
    });

    // CONNECT tunnels take over the socket after the 200 response
    let conn = builder
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades();
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        Ok(()) = shutdown.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    if let Err(err) = result {
        if !err.is_incomplete_message() {
            tracing::debug!("Connection error from {peer_addr}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::LogBuffer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, server, peer)
    }

    fn state_with(max_connections: Option<u64>) -> Arc<AppState> {
        let mut config = Config::defaults().unwrap();
        config.performance.max_connections = max_connections;
        config.logging.access_log = false;
        config.documents.enabled = false;
        let store = Arc::new(crate::assets::MemoryAssetStore::new());
        Arc::new(AppState::with_store(config, store, LogBuffer::new(16, false)).unwrap())
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let state = state_with(Some(1));
        let _held = state.connections.track();
        let (_client, server, peer) = connected_pair().await;

        assert!(!accept_connection(server, peer, &state));
        assert_eq!(state.connections.active_count(), 1);
    }

    #[tokio::test]
    async fn test_serves_and_releases_slot() {
        let state = state_with(None);
        let (mut client, server, peer) = connected_pair().await;

        assert!(accept_connection(server, peer, &state));
        client
            .write_all(b"OPTIONS / HTTP/1.1\r\nHost: mypage.test\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 204"));

        assert!(state.connections.drain(Duration::from_secs(1)).await);
    }
}
