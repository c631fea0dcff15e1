//! # seqthink
//!
//! Sequential thinking MCP server binary. Serves either stdio or
//! HTTP + SSE, never both.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use seqthink_rpc::context::ServerContext;
use seqthink_rpc::handlers::register_all;
use seqthink_rpc::registry::MethodRegistry;
use seqthink_server::shutdown::{ShutdownCoordinator, wait_for_signal};
use seqthink_server::{SeqthinkServer, ServerConfig, stdio};
use seqthink_settings::{LogFormat, RejectedOverride, SeqthinkSettings};

/// Sequential thinking MCP server.
#[derive(Parser, Debug)]
#[command(name = "seqthink", version, about = "Sequential thinking MCP server")]
struct Cli {
    /// Serve line-delimited JSON-RPC on stdin/stdout instead of HTTP.
    #[arg(long)]
    stdio: bool,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.seqthink/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load settings and apply command-line overrides on top.
    ///
    /// Also returns env overrides that were set but unusable.
    fn resolve_settings(&self) -> Result<(SeqthinkSettings, Vec<RejectedOverride>)> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(seqthink_settings::settings_path);
        let (mut settings, rejected) = seqthink_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok((settings, rejected))
    }
}

fn init_logging(settings: &SeqthinkSettings) {
    match settings.logging.format {
        LogFormat::Compact => seqthink_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => seqthink_core::logging::init_json_subscriber(&settings.logging.level),
    }
}

fn make_registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    register_all(&mut registry);
    registry
}

async fn run_stdio() -> Result<()> {
    let registry = make_registry();
    let ctx = ServerContext::new(None);
    let coordinator = ShutdownCoordinator::new();
    let token = coordinator.token();

    tokio::select! {
        served = stdio::run(&registry, &ctx, token) => {
            served.context("stdio transport failed")?;
        }
        () = wait_for_signal() => coordinator.shutdown(),
    }

    tracing::info!(sessions = ctx.sessions.count(), "shutdown complete");
    Ok(())
}

async fn run_http(settings: &SeqthinkSettings) -> Result<()> {
    let registry = make_registry();
    let method_count = registry.methods().len();
    let server = SeqthinkServer::new(ServerConfig::from(&settings.server), registry);

    let addr = server.listen().await.context("Failed to bind server")?;
    tracing::info!("MCP endpoint: http://{addr}/mcp ({method_count} RPC methods registered)");
    tracing::info!("SSE endpoint: http://{addr}/events");

    wait_for_signal().await;
    tracing::info!("shutting down...");
    let report = server.shutdown().graceful_shutdown(None).await;

    tracing::info!(
        drained = ?report.drained,
        aborted = ?report.aborted,
        sessions = server.context().sessions.count(),
        "shutdown complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (settings, rejected) = cli.resolve_settings()?;
    init_logging(&settings);
    for r in &rejected {
        tracing::warn!(key = r.key, value = %r.value, "invalid env override, ignoring");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting sequential thinking server");

    if cli.stdio {
        run_stdio().await
    } else {
        run_http(&settings).await
    }
}
