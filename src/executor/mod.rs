use std::sync::Arc;

use tokio::net::TcpStream;

use crate::worker::{ProxyError, Worker};
use crate::Error;

/// Runs one accepted downstream connection to completion. Settings are
/// taken from the current program, so connections accepted after a reload
/// pick up the new values.
pub async fn execute(stream: TcpStream) {
    let p = crate::program();
    let (settings, mut shutdown_rx) = {
        let guard = p.read().await;
        (Arc::clone(&guard.settings), guard.shutdown_tx.subscribe())
    };
    let mut worker = Worker::new(stream, settings);
    tokio::select! {
        _ = shutdown_rx.recv() => {}
        result = worker.run() => match result {
            Ok(()) => {}
            Err(ProxyError::Downstream(Error::Closed)) => {
                #[cfg(debug_assertions)]
                log::info!("connection_closed");
            }
            #[cfg_attr(not(debug_assertions), allow(unused))]
            Err(ProxyError::Downstream(e)) => {
                #[cfg(debug_assertions)]
                log::warn!(error = e.to_string(); "proxy_downstream_error");
            }
            Err(ProxyError::Upstream(e)) => {
                log::error!(error = e.to_string(); "proxy_upstream_error");
            }
        },
    }
    worker.shutdown().await;
}
