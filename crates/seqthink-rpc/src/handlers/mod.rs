//! Method handlers and shared parameter helpers.

pub mod lifecycle;
pub mod tools;

use serde_json::Value;

use crate::errors::RpcError;
use crate::registry::MethodRegistry;

/// Register every method and notification this server answers.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register("initialize", lifecycle::InitializeHandler);
    registry.register("ping", lifecycle::PingHandler);
    registry.register("tools/list", tools::ListToolsHandler);
    registry.register("tools/call", tools::CallToolHandler);
    registry.register_notification(
        &["notifications/initialized", "initialized"],
        lifecycle::InitializedNotification,
    );
}

/// Require the params object itself.
pub(crate) fn require_params(params: Option<&Value>) -> Result<&Value, RpcError> {
    params
        .filter(|p| p.is_object())
        .ok_or_else(|| RpcError::InvalidParams {
            message: "Invalid params: expected an object".into(),
        })
}

/// Require a string field of the params object.
pub(crate) fn require_string_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams {
            message: format!("Invalid params: missing required string '{key}'"),
        })
}
