//! `/health` endpoint: liveness plus a view of the active thinking session
//! and the event-stream subscribers.

use std::time::Instant;

use serde::Serialize;
use seqthink_rpc::context::ServerContext;
use seqthink_rpc::hub::{BroadcastHub, SubscriberStats};

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Current event-stream subscriber count.
    pub connections: usize,
    /// Number of sessions created so far.
    pub active_sessions: usize,
    /// Protocol version in effect.
    pub protocol_version: String,
    /// Client name from the last handshake, if one happened.
    pub client: Option<String>,
    /// The session new steps are recorded into, once one exists.
    pub session: Option<SessionHealth>,
    /// Every registered subscriber, oldest first.
    pub subscribers: Vec<SubscriberStats>,
}

/// Progress of the active session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHealth {
    /// Session key.
    pub id: String,
    /// Accepted steps so far.
    pub history_length: usize,
    /// Known branch ids, sorted.
    pub branches: Vec<String>,
    /// Step number of the latest accepted step.
    pub last_step: Option<u32>,
    /// Caller's current estimate of the total.
    pub total_steps: Option<u32>,
    /// Whether the caller said another step follows.
    pub continuation_needed: Option<bool>,
}

/// Build a health response from the live context and hub.
pub fn health_check(start_time: Instant, ctx: &ServerContext, hub: &BroadcastHub) -> HealthResponse {
    let session = ctx.sessions.active().map(|session| {
        let stats = session.stats();
        let latest = session.latest();
        SessionHealth {
            id: stats.session_id.to_string(),
            history_length: stats.history_length,
            branches: stats.branches,
            last_step: latest.as_ref().map(|p| p.step_number),
            total_steps: latest.as_ref().map(|p| p.total_steps),
            continuation_needed: latest.as_ref().map(|p| p.continuation_needed),
        }
    });
    let workspace = ctx.workspace();
    let client = Some(workspace.client_info.name).filter(|name| !name.is_empty());
    let subscribers = hub.subscribers();

    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        connections: subscribers.len(),
        active_sessions: ctx.sessions.count(),
        protocol_version: workspace.protocol_version,
        client,
        session,
        subscribers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fixture() -> (ServerContext, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::default());
        (ServerContext::new(Some(Arc::clone(&hub))), hub)
    }

    #[test]
    fn idle_server() {
        let (ctx, hub) = fixture();
        let resp = health_check(Instant::now(), &ctx, &hub);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
        assert_eq!(resp.active_sessions, 0);
        assert!(resp.session.is_none());
        assert!(resp.subscribers.is_empty());
    }

    #[test]
    fn uptime_increases() {
        let (ctx, hub) = fixture();
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, &ctx, &hub).uptime_secs >= 59);
    }

    #[test]
    fn reports_active_session_progress() {
        let (ctx, hub) = fixture();
        let session = ctx.sessions.active_or_create();
        let mut step = seqthink_core::StepPayload::new("a", 1, 3, true);
        let _ = session.record(step.clone());
        step.step_number = 2;
        step.branch_id = Some("alt".into());
        let _ = session.record(step);

        let resp = health_check(Instant::now(), &ctx, &hub);
        let s = resp.session.unwrap();
        assert_eq!(s.id, "session_1");
        assert_eq!(s.history_length, 2);
        assert_eq!(s.branches, vec!["alt".to_string()]);
        assert_eq!(s.last_step, Some(2));
        assert_eq!(s.total_steps, Some(3));
        assert_eq!(s.continuation_needed, Some(true));
    }

    #[test]
    fn reports_subscribers() {
        let (ctx, hub) = fixture();
        let sub = hub.subscribe();
        let resp = health_check(Instant::now(), &ctx, &hub);
        assert_eq!(resp.connections, 1);
        assert_eq!(resp.subscribers[0].client_id, sub.id());
    }

    #[test]
    fn serialization() {
        let (ctx, hub) = fixture();
        let _sub = hub.subscribe();
        let json = serde_json::to_value(health_check(Instant::now(), &ctx, &hub)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 1);
        assert_eq!(json["active_sessions"], 0);
        assert!(json["session"].is_null());
        assert_eq!(json["protocol_version"], "2025-03-26");
        assert!(json["client"].is_null());
        assert_eq!(json["subscribers"][0]["delivered"], 0);
        assert!(json["uptime_secs"].is_number());
    }
}
