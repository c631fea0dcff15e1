//! Method registry and async dispatch.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::context::ServerContext;
use crate::errors::{self, RpcError};
use crate::types::{RpcRequest, RpcResponse};

/// Trait implemented by every RPC method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &ServerContext) -> Result<Value, RpcError>;
}

/// Trait implemented by one-way notification handlers.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// React to the notification. Nothing is sent back.
    async fn notify(&self, params: Option<Value>, ctx: &ServerContext);
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    notifications: HashMap<String, Arc<dyn NotificationHandler>>,
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            notifications: HashMap::new(),
        }
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Register a notification handler under one or more method names.
    pub fn register_notification(
        &mut self,
        methods: &[&str],
        handler: impl NotificationHandler + 'static,
    ) {
        let handler: Arc<dyn NotificationHandler> = Arc::new(handler);
        for method in methods {
            let _ = self
                .notifications
                .insert((*method).to_owned(), Arc::clone(&handler));
        }
    }

    /// Dispatch a request to the appropriate handler.
    ///
    /// Returns `None` for notifications: registered notification methods, and
    /// any id-less `notifications/*` message. Other id-less requests are
    /// answered with a `null` id. Handler panics are contained and reported as
    /// internal errors for that request only.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &ServerContext) -> Option<RpcResponse> {
        let notification = request.is_notification();
        let method = request.method;
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        if let Some(handler) = self.notifications.get(&method) {
            handler.notify(request.params, ctx).await;
            return None;
        }
        if notification && method.starts_with("notifications/") {
            debug!(method, "ignoring unhandled notification");
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);

        let Some(handler) = self.handlers.get(&method) else {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "method_not_found").increment(1);
            warn!(method, "unknown RPC method");
            return Some(RpcResponse::error(
                id,
                errors::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ));
        };

        let start = std::time::Instant::now();
        let result = AssertUnwindSafe(handler.handle(request.params, ctx))
            .catch_unwind()
            .await;

        let response = match result {
            Ok(Ok(result)) => RpcResponse::success(id, result),
            Ok(Err(err)) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.kind()).increment(1);
                RpcResponse::from_body(id, err.to_error_body())
            }
            Err(_panic) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "panic").increment(1);
                error!(method, "RPC handler panicked");
                RpcResponse::error(
                    id,
                    errors::INTERNAL_ERROR,
                    format!("Internal error while handling '{method}'"),
                )
            }
        };

        histogram!("rpc_request_duration_seconds", "method" => method)
            .record(start.elapsed().as_secs_f64());

        Some(response)
    }

    /// List all registered request method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a request method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Check whether a notification method is registered.
    pub fn has_notification(&self, method: &str) -> bool {
        self.notifications.contains_key(method)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Test handler implementations ────────────────────────────────

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(&self, params: Option<Value>, _ctx: &ServerContext) -> Result<Value, RpcError> {
            Ok(params.unwrap_or(json!(null)))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl MethodHandler for FailHandler {
        async fn handle(&self, _params: Option<Value>, _ctx: &ServerContext) -> Result<Value, RpcError> {
            Err(RpcError::InvalidParams {
                message: "params required".into(),
            })
        }
    }

    struct PanicHandler;

    #[async_trait]
    impl MethodHandler for PanicHandler {
        async fn handle(&self, _params: Option<Value>, _ctx: &ServerContext) -> Result<Value, RpcError> {
            panic!("handler bug");
        }
    }

    #[derive(Clone, Default)]
    struct CountingNotification(Arc<AtomicUsize>);

    #[async_trait]
    impl NotificationHandler for CountingNotification {
        async fn notify(&self, _params: Option<Value>, _ctx: &ServerContext) {
            let _ = self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn register_and_dispatch_success() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);

        let resp = reg
            .dispatch(RpcRequest::new(1, "echo", Some(json!({"x": 1}))), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.id, json!(1));
        assert_eq!(resp.result.unwrap()["x"], 1);
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn dispatch_method_not_found() {
        let ctx = make_test_context();
        let reg = MethodRegistry::new();
        let resp = reg
            .dispatch(RpcRequest::new("a", "nope", None), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.id, json!("a"));
        let err = resp.error.unwrap();
        assert_eq!(err.code, errors::METHOD_NOT_FOUND);
        assert!(err.message.contains("nope"));
        assert_eq!(ctx.sessions.count(), 0);
        assert!(ctx.sessions.active().is_none());
    }

    #[tokio::test]
    async fn dispatch_handler_error() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("fail", FailHandler);
        let resp = reg
            .dispatch(RpcRequest::new(2, "fail", None), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, errors::INVALID_PARAMS);
        assert!(resp.result.is_none());
    }

    #[tokio::test]
    async fn dispatch_contains_panics() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("boom", PanicHandler);
        reg.register("echo", EchoHandler);

        let resp = reg
            .dispatch(RpcRequest::new(3, "boom", None), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, errors::INTERNAL_ERROR);

        let resp = reg
            .dispatch(RpcRequest::new(4, "echo", Some(json!(5))), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.result, Some(json!(5)));
    }

    #[tokio::test]
    async fn notification_runs_handler_without_response() {
        let ctx = make_test_context();
        let counter = CountingNotification::default();
        let mut reg = MethodRegistry::new();
        reg.register_notification(&["notifications/initialized", "initialized"], counter.clone());

        for method in ["notifications/initialized", "initialized"] {
            let out = reg
                .dispatch(RpcRequest::notification(method, None), &ctx)
                .await;
            assert!(out.is_none());
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_notification_is_ignored() {
        let ctx = make_test_context();
        let reg = MethodRegistry::new();
        let out = reg
            .dispatch(RpcRequest::notification("notifications/cancelled", None), &ctx)
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn idless_request_answered_with_null_id() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);

        let resp = reg
            .dispatch(RpcRequest::notification("echo", Some(json!(1))), &ctx)
            .await
            .unwrap();
        assert!(resp.id.is_null());
        assert_eq!(resp.result, Some(json!(1)));

        let resp = reg
            .dispatch(RpcRequest::notification("nope", None), &ctx)
            .await
            .unwrap();
        assert!(resp.id.is_null());
        assert_eq!(resp.error.unwrap().code, errors::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn explicit_null_id_gets_response() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);
        let resp = reg
            .dispatch(RpcRequest::new(Value::Null, "echo", None), &ctx)
            .await
            .unwrap();
        assert!(resp.id.is_null());
        assert_eq!(resp.result, Some(Value::Null));
    }

    #[test]
    fn methods_sorted() {
        let mut reg = MethodRegistry::new();
        reg.register("tools/list", EchoHandler);
        reg.register("initialize", EchoHandler);
        reg.register("ping", EchoHandler);
        assert_eq!(reg.methods(), vec!["initialize", "ping", "tools/list"]);
        assert!(reg.has_method("ping"));
        assert!(!reg.has_method("nope"));
        assert!(!reg.has_notification("ping"));
    }
}
