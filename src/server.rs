//! Asset server: serves the content root to the workers over HTTP.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ServerError;

/// How long open connections get to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Static file server running on a background task.
pub struct AssetServer {
    addr: SocketAddr,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl AssetServer {
    /// Serve `root` on `127.0.0.1:port`. Port `0` picks a free port.
    pub async fn start(root: &Path, port: u16) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| ServerError::Bind { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { port, source })?;

        let app = Router::new()
            .fallback_service(ServeDir::new(root))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        info!(addr = %addr, root = %root.display(), "Asset server started");
        Ok(Self {
            addr,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL workers load content from.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait briefly for open ones.
    ///
    /// Only the first call does anything.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        if let Some(tx) = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = tx.send(());
        }
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(Ok(Ok(()))) => {
                info!(addr = %self.addr, "Asset server stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(ServerError::Serve(e.to_string())),
            Ok(Err(e)) => Err(ServerError::Serve(e.to_string())),
            Err(_) => {
                warn!(addr = %self.addr, "Asset server did not drain in time; aborting");
                handle.abort();
                Ok(())
            }
        }
    }
}

impl Drop for AssetServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().ok().and_then(|h| h.take()) {
            handle.abort();
        }
    }
}
