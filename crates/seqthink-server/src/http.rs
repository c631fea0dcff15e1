//! HTTP routes: `POST /mcp`, `GET /events`, `GET /health`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::{Stream, StreamExt, stream};
use seqthink_rpc::codec::{encode_response, handle_message};
use seqthink_rpc::context::ServerContext;
use seqthink_rpc::errors::PARSE_ERROR;
use seqthink_rpc::hub::{BroadcastHub, Subscription};
use seqthink_rpc::registry::MethodRegistry;
use seqthink_rpc::types::{HubEvent, RpcResponse};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::health::{self, HealthResponse};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// RPC method registry.
    pub registry: Arc<MethodRegistry>,
    /// Server context shared with the registry.
    pub ctx: Arc<ServerContext>,
    /// Event fan-out for `/events`.
    pub hub: Arc<BroadcastHub>,
    /// Ends open event streams on shutdown.
    pub shutdown: CancellationToken,
    /// When the server started.
    pub start_time: Instant,
}

/// Build the router with all routes and layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /mcp: one JSON-RPC message per request body.
///
/// A body that is not UTF-8 gets the same parse-error response as malformed
/// JSON.
async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let reply = match std::str::from_utf8(&body) {
        Ok(text) => handle_message(text, &state.registry, &state.ctx).await,
        Err(e) => {
            warn!(error = %e, "request body is not valid UTF-8");
            let resp = RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
            Some(encode_response(&resp))
        }
    };
    match reply {
        Some(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// GET /events: server-sent event stream of hub events.
///
/// The first frame is a `connected` event for this subscriber only. The
/// subscription is dropped, and thereby unregistered, when the client goes
/// away or the server shuts down.
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe();
    let welcome = HubEvent::new(
        "connected",
        None,
        Some(json!({
            "clientId": subscription.id(),
            "message": "Connected to Sequential Thinking MCP Server",
        })),
    );
    let welcome = Event::default().json_data(&welcome).unwrap_or_else(|e| {
        warn!(error = %e, "failed to encode welcome event");
        Event::default().comment("connected")
    });
    debug!(client_id = subscription.id(), "event stream opened");

    let events = stream::once(async move { welcome })
        .chain(relay(subscription))
        .take_until(state.shutdown.cancelled_owned())
        .map(Ok);

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

/// Queued hub events as SSE frames, until the subscriber is evicted.
fn relay(subscription: Subscription) -> impl Stream<Item = Event> {
    stream::unfold(subscription, |mut sub| async move {
        let message = sub.recv().await?;
        Some((Event::default().data(message.as_str()), sub))
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.ctx, &state.hub))
}
