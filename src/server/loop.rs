// Server loop module
// Accepts connections until shutdown, then drains the ones still open

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;

/// Run the accept loop until `shutdown` resolves
///
/// Open connections are asked to finish their in-flight request, tunnels are
/// closed, and everything gets `performance.shutdown_grace` seconds before
/// the loop returns.
pub async fn run<S>(listener: TcpListener, state: Arc<AppState>, shutdown: S)
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state);
                    }
                    Err(e) => tracing::error!("Failed to accept connection: {e}"),
                }
            }
            () = &mut shutdown => break,
        }
    }

    drop(listener);
    let connections = &state.connections;
    connections.begin_shutdown();

    let remaining = connections.active_count();
    if remaining > 0 {
        tracing::info!("Waiting for {remaining} open connection(s) to close");
    }
    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    if !connections.drain(grace).await {
        tracing::warn!(
            "Shutdown grace period elapsed with {} connection(s) still open",
            connections.active_count()
        );
    }
    tracing::info!("Server stopped");
}
