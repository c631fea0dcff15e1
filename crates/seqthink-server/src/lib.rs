//! # seqthink-server
//!
//! Transport adapters around the shared dispatch path.
//!
//! - Stdio: line-delimited requests on stdin, responses on stdout
//! - HTTP: `POST /mcp` request/response endpoint
//! - SSE: `GET /events` stream fed by the broadcast hub
//! - `GET /health` liveness endpoint
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod http;
pub mod server;
pub mod shutdown;
pub mod stdio;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::SeqthinkServer;
