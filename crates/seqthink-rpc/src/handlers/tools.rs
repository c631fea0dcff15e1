//! Tool handlers: list, call.

use async_trait::async_trait;
use serde_json::{Value, json};
use seqthink_core::{StepArguments, format, render_box, validate};
use tracing::{debug, instrument, warn};

use crate::context::ServerContext;
use crate::errors::RpcError;
use crate::handlers::{require_params, require_string_param};
use crate::registry::MethodHandler;
use crate::tool::{TOOL_NAME, descriptor};
use crate::types::{Content, HubEvent, ToolCallResult};

/// List the tools this server provides.
pub struct ListToolsHandler;

#[async_trait]
impl MethodHandler for ListToolsHandler {
    #[instrument(skip(self, _ctx), fields(method = "tools/list"))]
    async fn handle(&self, _params: Option<Value>, _ctx: &ServerContext) -> Result<Value, RpcError> {
        Ok(json!({ "tools": [descriptor()] }))
    }
}

/// Submit one reasoning step.
///
/// Validation failures are soft: the response is a success envelope carrying
/// an error-flagged tool result, and no session state changes.
pub struct CallToolHandler;

#[async_trait]
impl MethodHandler for CallToolHandler {
    #[instrument(skip(self, params, ctx), fields(method = "tools/call"))]
    async fn handle(&self, params: Option<Value>, ctx: &ServerContext) -> Result<Value, RpcError> {
        let params = require_params(params.as_ref())?;
        let name = require_string_param(params, "name")?;
        if name != TOOL_NAME {
            return Err(RpcError::UnknownTool { name: name.into() });
        }

        let args = StepArguments::from_value(params.get("arguments").unwrap_or(&Value::Null));
        let result = match validate(&args) {
            Ok(payload) => {
                let session = ctx.sessions.active_or_create();
                let stats = session.record(payload.clone());
                let response = format(&payload, &stats);
                debug!("\n{}", render_box(&payload));

                let _ = ctx.publish(&HubEvent::new(
                    "thought",
                    Some(stats.session_id.to_string()),
                    Some(json!({ "formatted": response.display, "raw": payload })),
                ));

                let mut summary = to_value(&response.summary)?;
                if let Value::Object(map) = &mut summary {
                    let _ = map.insert("workspaceContext".into(), to_value(&ctx.workspace())?);
                }
                let summary = serde_json::to_string_pretty(&summary).map_err(internal)?;
                ToolCallResult::ok(vec![Content::text(summary), Content::text(response.display)])
            }
            Err(e) => {
                warn!(error = %e, "step rejected");
                ToolCallResult::failed(&e.to_string())
            }
        };

        to_value(&result)
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(internal)
}

fn internal(e: serde_json::Error) -> RpcError {
    RpcError::Internal {
        message: format!("Internal error: {e}"),
    }
}
