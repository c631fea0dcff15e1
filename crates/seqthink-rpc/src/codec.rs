//! Shared decode → dispatch → encode path used by every transport.

use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::context::ServerContext;
use crate::errors::{INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR};
use crate::registry::MethodRegistry;
use crate::types::{RpcRequest, RpcResponse};

/// Decode one wire message into a request.
///
/// On failure returns the error response to send back. When the message is
/// valid JSON but not a well-formed request, the `id` is recovered from it if
/// possible.
pub fn decode_request(raw: &str) -> Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "invalid JSON received");
        RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
    })?;

    if !value.is_object() {
        warn!("request is not a JSON object");
        return Err(RpcResponse::error(
            Value::Null,
            INVALID_REQUEST,
            "Invalid Request: expected a JSON object",
        ));
    }

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "malformed request");
        RpcResponse::error(id, PARSE_ERROR, format!("Parse error: {e}"))
    })
}

/// Encode a response as one line of JSON.
///
/// Encoding a response cannot normally fail. If it does, an internal error
/// response for the same id is produced instead, so the caller always has
/// something to write.
pub fn encode_response(response: &RpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "failed to serialize response");
        let fallback = RpcResponse::error(
            response.id.clone(),
            INTERNAL_ERROR,
            "Internal error: response encoding failed",
        );
        serde_json::to_string(&fallback).unwrap_or_else(|_| {
            format!(
                r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":{INTERNAL_ERROR},"message":"Internal error"}}}}"#
            )
        })
    })
}

/// Handle one raw message end to end.
///
/// Returns the encoded response, or `None` for notifications.
#[instrument(skip_all, fields(method))]
pub async fn handle_message(
    message: &str,
    registry: &MethodRegistry,
    ctx: &ServerContext,
) -> Option<String> {
    let request = match decode_request(message) {
        Ok(r) => r,
        Err(resp) => return Some(encode_response(&resp)),
    };

    let _ = tracing::Span::current().record("method", request.method.as_str());
    debug!(method = %request.method, id = ?request.id, "dispatching RPC");

    let response = registry.dispatch(request, ctx).await?;
    if response.is_error() {
        debug!(id = %response.id, "request failed");
    }
    Some(encode_response(&response))
}
