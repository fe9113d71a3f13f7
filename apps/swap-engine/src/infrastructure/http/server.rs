//! HTTP Server
//!
//! Binds the API router and serves it until the shutdown token fires.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

/// API server.
pub struct HttpServer {
    port: u16,
    router: Router,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a server for `router` on `port`.
    #[must_use]
    pub const fn new(port: u16, router: Router, cancel: CancellationToken) -> Self {
        Self {
            port,
            router,
            cancel,
        }
    }

    /// Bind and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the server stops with
    /// an error.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError::ServerFailed` if the server stops with an
    /// error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HttpServerError> {
        let port = listener.local_addr().map_or(self.port, |addr| addr.port());
        tracing::info!(port, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer").field("port", &self.port).finish()
    }
}
