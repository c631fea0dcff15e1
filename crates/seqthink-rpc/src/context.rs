//! Server context passed to every RPC handler.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use seqthink_core::SessionRegistry;

use crate::hub::BroadcastHub;
use crate::types::{HubEvent, Implementation};

/// Protocol version assumed until a client completes the handshake.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// What the connected client told us during `initialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceContext {
    /// Workspace roots advertised by the client.
    pub roots: Vec<String>,
    /// Client name and version.
    pub client_info: Implementation,
    /// Negotiated protocol version.
    pub protocol_version: String,
}

impl Default for WorkspaceContext {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            client_info: Implementation::default(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.into(),
        }
    }
}

/// Shared state for all handlers of one server.
///
/// Two contexts never share sessions: each owns its own registry.
pub struct ServerContext {
    /// Sessions and their step histories.
    pub sessions: SessionRegistry,
    /// Event fan-out. `None` when no event stream is served (stdio mode).
    pub hub: Option<Arc<BroadcastHub>>,
    /// Name and version reported in `initialize`.
    pub server_info: Implementation,
    /// When the server started.
    pub server_start_time: Instant,
    workspace: RwLock<WorkspaceContext>,
}

impl ServerContext {
    /// Create a context, optionally wired to an event hub.
    pub fn new(hub: Option<Arc<BroadcastHub>>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            hub,
            server_info: Implementation {
                name: crate::tool::TOOL_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            server_start_time: Instant::now(),
            workspace: RwLock::new(WorkspaceContext::default()),
        }
    }

    /// Snapshot of the handshake details recorded so far.
    pub fn workspace(&self) -> WorkspaceContext {
        self.workspace.read().clone()
    }

    /// Record the handshake details. Replaces any previous handshake.
    pub fn record_handshake(&self, workspace: WorkspaceContext) {
        *self.workspace.write() = workspace;
    }

    /// Publish an event if a hub is attached. Returns the recipient count.
    pub fn publish(&self, event: &HubEvent) -> usize {
        self.hub.as_ref().map_or(0, |hub| hub.publish(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_before_handshake() {
        let ctx = ServerContext::new(None);
        let ws = ctx.workspace();
        assert_eq!(ws.protocol_version, DEFAULT_PROTOCOL_VERSION);
        assert!(ws.roots.is_empty());
        assert_eq!(ctx.server_info.name, "sequentialthinking");
    }

    #[test]
    fn publish_without_hub_is_noop() {
        let ctx = ServerContext::new(None);
        assert_eq!(ctx.publish(&HubEvent::new("x", None, None)), 0);
    }

    #[test]
    fn handshake_replaces_workspace() {
        let ctx = ServerContext::new(None);
        ctx.record_handshake(WorkspaceContext {
            roots: vec!["/a".into()],
            client_info: Implementation {
                name: "c".into(),
                version: "1".into(),
            },
            protocol_version: "2024-11-05".into(),
        });
        let ws = ctx.workspace();
        assert_eq!(ws.roots, vec!["/a".to_string()]);
        assert_eq!(ws.protocol_version, "2024-11-05");
        let v = serde_json::to_value(&ws).unwrap();
        assert_eq!(v["clientInfo"]["name"], "c");
        assert!(v.get("protocolVersion").is_some());
    }

    #[test]
    fn contexts_are_isolated() {
        let a = ServerContext::new(None);
        let b = ServerContext::new(None);
        let _ = a.sessions.active_or_create();
        assert_eq!(a.sessions.count(), 1);
        assert_eq!(b.sessions.count(), 0);
    }
}
