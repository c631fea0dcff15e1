//! `SeqthinkServer`: HTTP + SSE server around one shared context.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use seqthink_rpc::context::ServerContext;
use seqthink_rpc::hub::BroadcastHub;
use seqthink_rpc::registry::MethodRegistry;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::http::{self, AppState};
use crate::shutdown::ShutdownCoordinator;

/// The HTTP-mode server.
pub struct SeqthinkServer {
    config: ServerConfig,
    registry: Arc<MethodRegistry>,
    ctx: Arc<ServerContext>,
    hub: Arc<BroadcastHub>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl SeqthinkServer {
    /// Create a server with a fresh context wired to a new hub.
    pub fn new(config: ServerConfig, registry: MethodRegistry) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.subscriber_buffer));
        let ctx = Arc::new(ServerContext::new(Some(Arc::clone(&hub))));
        Self {
            config,
            registry: Arc::new(registry),
            ctx,
            hub,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        http::router(AppState {
            registry: Arc::clone(&self.registry),
            ctx: Arc::clone(&self.ctx),
            hub: Arc::clone(&self.hub),
            shutdown: self.shutdown.token(),
            start_time: self.start_time,
        })
    }

    /// Bind the configured address and serve in a task tracked by the
    /// shutdown coordinator.
    ///
    /// Returns the bound address (useful with port `0`). The task ends once
    /// the coordinator fires and open connections drain.
    pub async fn listen(&self) -> Result<SocketAddr, ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local = listener.local_addr()?;

        let app = self.router();
        let token = self.shutdown.token();
        self.shutdown.spawn("http", async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "HTTP server failed");
            }
        });

        info!(%local, "listening");
        Ok(local)
    }

    /// Get the broadcast hub.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Get the server context.
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the method registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqthink_rpc::handlers::register_all;

    fn make_server() -> SeqthinkServer {
        let mut registry = MethodRegistry::new();
        register_all(&mut registry);
        SeqthinkServer::new(ServerConfig::default(), registry)
    }

    #[test]
    fn accessors() {
        let server = make_server();
        assert_eq!(server.config().port, 0);
        assert_eq!(server.hub().connection_count(), 0);
        assert_eq!(server.hub().capacity(), 10);
        assert!(!server.shutdown().is_shutting_down());
        assert!(server.registry().has_method("tools/call"));
        assert!(server.context().hub.is_some());
    }

    #[test]
    fn hub_capacity_from_config() {
        let config = ServerConfig {
            subscriber_buffer: 3,
            ..ServerConfig::default()
        };
        let server = SeqthinkServer::new(config, MethodRegistry::new());
        assert_eq!(server.hub().capacity(), 3);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops() {
        let server = make_server();
        let addr = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.shutdown().task_count(), 1);
        let report = server.shutdown().graceful_shutdown(None).await;
        assert_eq!(report.drained, vec!["http"]);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        let server = SeqthinkServer::new(config, MethodRegistry::new());
        let err = server.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
