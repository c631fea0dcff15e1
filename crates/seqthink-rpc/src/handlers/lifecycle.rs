//! Lifecycle handlers: initialize, initialized, ping.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::context::{ServerContext, WorkspaceContext};
use crate::errors::RpcError;
use crate::handlers::{require_params, require_string_param};
use crate::registry::{MethodHandler, NotificationHandler};
use crate::types::{HubEvent, Implementation};

const INSTRUCTIONS: &str = "Welcome to the Sequential Thinking MCP Server! \
Use the 'sequentialthinking' tool to process your thoughts step by step.";

/// Protocol handshake.
pub struct InitializeHandler;

#[async_trait]
impl MethodHandler for InitializeHandler {
    #[instrument(skip(self, ctx), fields(method = "initialize"))]
    async fn handle(&self, params: Option<Value>, ctx: &ServerContext) -> Result<Value, RpcError> {
        let params = require_params(params.as_ref())?;
        let protocol_version = require_string_param(params, "protocolVersion")?.to_owned();
        let client = params.get("clientInfo").unwrap_or(&Value::Null);
        let client_info = Implementation {
            name: require_string_param(client, "name")
                .map_err(|_| RpcError::InvalidParams {
                    message: "Invalid params: missing required string 'clientInfo.name'".into(),
                })?
                .to_owned(),
            version: client
                .get("version")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        };
        let roots = workspace_roots(params);

        info!(
            client = %client_info.name,
            client_version = %client_info.version,
            protocol_version = %protocol_version,
            roots = roots.len(),
            "client initialized"
        );

        let _ = ctx.publish(&HubEvent::new(
            "initialize",
            None,
            Some(json!({ "clientInfo": client_info, "protocolVersion": protocol_version })),
        ));
        ctx.record_handshake(WorkspaceContext {
            roots,
            client_info,
            protocol_version: protocol_version.clone(),
        });

        Ok(json!({
            "protocolVersion": protocol_version,
            "serverInfo": ctx.server_info,
            "capabilities": {
                "logging": {},
                "tools": { "listChanged": true },
            },
            "instructions": INSTRUCTIONS,
        }))
    }
}

/// Roots listed under `capabilities.roots.roots`. Non-string entries are skipped.
fn workspace_roots(params: &Value) -> Vec<String> {
    params
        .pointer("/capabilities/roots/roots")
        .and_then(Value::as_array)
        .map(|roots| {
            roots
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// `notifications/initialized`: the client finished its side of the handshake.
pub struct InitializedNotification;

#[async_trait]
impl NotificationHandler for InitializedNotification {
    #[instrument(skip(self, ctx), fields(method = "notifications/initialized"))]
    async fn notify(&self, _params: Option<Value>, ctx: &ServerContext) {
        info!("client ready");
        let _ = ctx.publish(&HubEvent::new(
            "initialized",
            None,
            Some(json!({ "message": "Client initialized" })),
        ));
    }
}

/// Liveness check.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: &ServerContext) -> Result<Value, RpcError> {
        Ok(json!({}))
    }
}
