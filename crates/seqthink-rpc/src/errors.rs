//! RPC error codes and error type.

use crate::types::RpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Request body is not valid JSON, or does not decode as a request.
pub const PARSE_ERROR: i32 = -32700;
/// Valid JSON that is not a request object.
pub const INVALID_REQUEST: i32 = -32600;
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid or missing parameters, including an unknown tool name.
pub const INVALID_PARAMS: i32 = -32602;
/// Unexpected internal error.
pub const INTERNAL_ERROR: i32 = -32603;

/// Protocol-level error returned by handlers.
///
/// Step validation failures are not represented here: they travel inside a
/// successful envelope as an error-flagged tool result.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// `tools/call` named a tool this server does not provide.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// The requested tool name.
        name: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl RpcError {
    /// Numeric JSON-RPC code for this variant.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidParams { .. } | Self::UnknownTool { .. } => INVALID_PARAMS,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => "invalid_params",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::Internal { .. } => "internal",
        }
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_params_code() {
        let err = RpcError::InvalidParams { message: "bad".into() };
        assert_eq!(err.code(), INVALID_PARAMS);
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn unknown_tool_shares_invalid_params_code() {
        let err = RpcError::UnknownTool { name: "nope".into() };
        assert_eq!(err.code(), INVALID_PARAMS);
        assert_ne!(err.code(), METHOD_NOT_FOUND);
        assert_eq!(err.to_string(), "Unknown tool: nope");
        assert_eq!(err.kind(), "unknown_tool");
    }

    #[test]
    fn internal_code() {
        let err = RpcError::Internal { message: "boom".into() };
        assert_eq!(err.code(), INTERNAL_ERROR);
    }

    #[test]
    fn to_error_body_without_data() {
        let err = RpcError::InvalidParams { message: "nope".into() };
        let body = err.to_error_body();
        assert_eq!(body.code, INVALID_PARAMS);
        assert_eq!(body.message, "nope");
        assert!(body.data.is_none());
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [PARSE_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND, INVALID_PARAMS, INTERNAL_ERROR];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
