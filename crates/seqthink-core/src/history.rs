//! Per-session step history and branch index.
//!
//! A [`Session`] guards its whole state behind one lock so an append to the
//! history and the matching branch bucket update are observed together.
//! Entries are never removed or rewritten.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::step::StepPayload;

/// Opaque session key assigned by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Key for the `n`th session created by a registry.
    fn numbered(n: u64) -> Self {
        Self(format!("session_{n}"))
    }

    /// Return the inner string as a slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a session taken under its lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    /// Session the snapshot belongs to.
    pub session_id: SessionId,
    /// Number of accepted steps.
    pub history_length: usize,
    /// Known branch ids, sorted.
    pub branches: Vec<String>,
}

#[derive(Default)]
struct SessionState {
    history: Vec<StepPayload>,
    branches: BTreeMap<String, Vec<u32>>,
}

/// One logical chain of steps.
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Session key.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Append an accepted step and return the resulting stats.
    ///
    /// A non-empty `branch_id` also appends the step number to that branch's
    /// bucket. Resubmitting a step number adds a second, independent entry.
    pub fn record(&self, payload: StepPayload) -> HistoryStats {
        let mut state = self.state.lock();
        if let Some(branch) = payload.branch_id.as_deref().filter(|b| !b.is_empty()) {
            state
                .branches
                .entry(branch.to_owned())
                .or_default()
                .push(payload.step_number);
        }
        debug!(
            session_id = %self.id,
            step = payload.step_number,
            total = payload.total_steps,
            "recording step"
        );
        state.history.push(payload);
        Self::snapshot(&self.id, &state)
    }

    /// Current stats without modifying anything.
    pub fn stats(&self) -> HistoryStats {
        Self::snapshot(&self.id, &self.state.lock())
    }

    /// Most recently accepted step.
    pub fn latest(&self) -> Option<StepPayload> {
        self.state.lock().history.last().cloned()
    }

    #[cfg(test)]
    fn history(&self) -> Vec<StepPayload> {
        self.state.lock().history.clone()
    }

    /// Step numbers recorded under a branch, in submission order.
    pub fn branch(&self, branch_id: &str) -> Option<Vec<u32>> {
        self.state.lock().branches.get(branch_id).cloned()
    }

    /// Number of accepted steps.
    pub fn len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Whether no step has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(id: &SessionId, state: &SessionState) -> HistoryStats {
        HistoryStats {
            session_id: id.clone(),
            history_length: state.history.len(),
            branches: state.branches.keys().cloned().collect(),
        }
    }
}

/// Hands out sessions for one server context.
///
/// Keys come from a monotonic counter, so rapid successive sessions never
/// collide. Submitted steps go to the active session, which is created on
/// first use.
pub struct SessionRegistry {
    next_id: AtomicU64,
    active: Mutex<Option<Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }
    }

    /// Return the active session, creating it if none exists yet.
    pub fn active_or_create(&self) -> Arc<Session> {
        let mut active = self.active.lock();
        if let Some(session) = active.as_ref() {
            return Arc::clone(session);
        }
        let session = self.create();
        *active = Some(Arc::clone(&session));
        session
    }

    /// The active session, if one was created.
    pub fn active(&self) -> Option<Arc<Session>> {
        self.active.lock().clone()
    }

    /// Number of sessions created so far.
    pub fn count(&self) -> usize {
        (self.next_id.load(Ordering::Relaxed) - 1) as usize
    }

    fn create(&self) -> Arc<Session> {
        let id = SessionId::numbered(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(session_id = %id, "session created");
        Arc::new(Session::new(id))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u32) -> StepPayload {
        StepPayload::new(format!("step {n}"), n, 5, true)
    }

    fn branched(n: u32, branch: &str) -> StepPayload {
        let mut p = step(n);
        p.branch_id = Some(branch.into());
        p.branch_from_step = Some(1);
        p
    }

    fn session() -> Arc<Session> {
        SessionRegistry::new().active_or_create()
    }

    #[test]
    fn history_preserves_submission_order() {
        let s = session();
        for n in [1, 2, 3, 2, 4] {
            let _ = s.record(step(n));
        }
        let numbers: Vec<u32> = s.history().iter().map(|p| p.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 2, 4]);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn record_returns_stats() {
        let s = session();
        let stats = s.record(step(1));
        assert_eq!(stats.history_length, 1);
        assert!(stats.branches.is_empty());
        assert_eq!(stats.session_id, *s.id());
    }

    #[test]
    fn branch_bucket_collects_step_numbers() {
        let s = session();
        let _ = s.record(step(1));
        let _ = s.record(branched(2, "alt"));
        let stats = s.record(branched(3, "alt"));
        assert_eq!(s.branch("alt"), Some(vec![2, 3]));
        assert_eq!(stats.branches, vec!["alt".to_string()]);
        assert_eq!(stats.history_length, 3);
    }

    #[test]
    fn branch_without_origin_is_still_indexed() {
        let s = session();
        let mut p = step(2);
        p.branch_id = Some("side".into());
        let _ = s.record(p);
        assert_eq!(s.branch("side"), Some(vec![2]));
    }

    #[test]
    fn empty_branch_id_not_indexed() {
        let s = session();
        let mut p = step(1);
        p.branch_id = Some(String::new());
        let stats = s.record(p);
        assert!(stats.branches.is_empty());
    }

    #[test]
    fn branches_reported_sorted() {
        let s = session();
        let _ = s.record(branched(2, "zeta"));
        let stats = s.record(branched(3, "alpha"));
        assert_eq!(stats.branches, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn registry_reuses_active_session() {
        let reg = SessionRegistry::new();
        assert!(reg.active().is_none());
        let a = reg.active_or_create();
        let b = reg.active_or_create();
        assert_eq!(a.id(), b.id());
        assert_eq!(reg.count(), 1);
        assert_eq!(a.id().as_str(), "session_1");
    }

    #[test]
    fn latest_is_last_accepted_step() {
        let s = session();
        assert!(s.latest().is_none());
        let _ = s.record(step(1));
        let _ = s.record(step(2));
        assert_eq!(s.latest().map(|p| p.step_number), Some(2));
    }

    #[test]
    fn separate_registries_are_isolated() {
        let a = SessionRegistry::new().active_or_create();
        let b = SessionRegistry::new().active_or_create();
        let _ = a.record(step(1));
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn concurrent_records_are_consistent() {
        let s = session();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for n in 1..=25 {
                        let _ = s.record(branched(n, &format!("b{t}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let stats = s.stats();
        assert_eq!(stats.history_length, 200);
        assert_eq!(stats.branches.len(), 8);
        for t in 0..8 {
            assert_eq!(s.branch(&format!("b{t}")).unwrap().len(), 25);
        }
    }
}
