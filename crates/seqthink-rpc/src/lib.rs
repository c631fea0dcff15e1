//! # seqthink-rpc
//!
//! JSON-RPC 2.0 surface of the sequential thinking server.
//!
//! - Wire types and the shared decode/encode path used by every transport
//! - Error taxonomy with numeric JSON-RPC codes
//! - [`registry::MethodRegistry`]: method name → handler table, with a
//!   separate table for one-way notifications
//! - [`context::ServerContext`]: explicitly owned state passed to every dispatch
//! - [`hub::BroadcastHub`]: bounded fan-out to event-stream subscribers
//! - Handlers for `initialize`, `tools/list`, `tools/call`, `ping`

#![deny(unsafe_code)]

pub mod codec;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod hub;
pub mod registry;
pub mod tool;
pub mod types;
