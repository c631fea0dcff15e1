//! Response formatting for accepted steps.
//!
//! [`format`] is pure and total over validated payloads: it echoes the step's
//! sequence fields, attaches the session stats, and renders a display block
//! labelled as a plain step, a revision, or a branch.

use serde::Serialize;

use crate::history::{HistoryStats, SessionId};
use crate::step::{StepKind, StepPayload};

/// Marker appended when the caller signals the chain is finished.
pub const COMPLETION_MARKER: &str = "✅ Thinking process completed";
/// Marker appended while more steps are expected.
pub const CONTINUATION_MARKER: &str = "➡️ Continuing to next thought";
/// Advisory appended when `needsMoreThoughts` is set.
pub const NEEDS_MORE_NOTE: &str = "⚠️ Additional thoughts may be needed";

/// Machine-readable part of a step response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    /// Session the step was recorded in.
    pub session_id: SessionId,
    /// Echo of `thoughtNumber`.
    pub thought_number: u32,
    /// Echo of `totalThoughts`.
    pub total_thoughts: u32,
    /// Echo of `nextThoughtNeeded`.
    pub next_thought_needed: bool,
    /// Known branch ids.
    pub branches: Vec<String>,
    /// History length after recording.
    pub thought_history_length: usize,
}

/// Everything returned to the caller for one accepted step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponsePayload {
    /// Structured summary.
    pub summary: StepSummary,
    /// Decorated text block for display-oriented callers.
    pub display: String,
}

/// Build the response for a recorded step.
pub fn format(payload: &StepPayload, stats: &HistoryStats) -> ResponsePayload {
    let summary = StepSummary {
        session_id: stats.session_id.clone(),
        thought_number: payload.step_number,
        total_thoughts: payload.total_steps,
        next_thought_needed: payload.continuation_needed,
        branches: stats.branches.clone(),
        thought_history_length: stats.history_length,
    };

    let mut lines = vec![header(payload)];
    match payload.kind() {
        StepKind::Plain => {}
        StepKind::Revision { of } => lines.push(format!("Revision of Thought {of}")),
        StepKind::Branch { id, .. } if !id.is_empty() => lines.push(format!("Branch: {id}")),
        StepKind::Branch { from, .. } => {
            if let Some(from) = from {
                lines.push(format!("Branch from Thought {from}"));
            }
        }
    }
    lines.push(String::new());
    lines.push(payload.text.clone());
    lines.push(String::new());

    if payload.continuation_needed {
        lines.push(CONTINUATION_MARKER.to_owned());
    } else {
        lines.push(COMPLETION_MARKER.to_owned());
        if stats.history_length > 1 {
            lines.push(format!(
                "Summary: {} thoughts, {} branches",
                stats.history_length,
                stats.branches.len()
            ));
        }
    }
    if payload.needs_more_steps() {
        lines.push(NEEDS_MORE_NOTE.to_owned());
    }

    ResponsePayload {
        summary,
        display: lines.join("\n"),
    }
}

/// One-line label: icon, position, and context.
fn header(payload: &StepPayload) -> String {
    let position = format!("{}/{}", payload.step_number, payload.total_steps);
    match payload.kind() {
        StepKind::Plain => format!("💭 Thought {position}"),
        StepKind::Revision { of } => {
            format!("🔄 Thought {position} (revising thought {of})")
        }
        StepKind::Branch { from: Some(from), id } if !id.is_empty() => {
            format!("🌿 Thought {position} (from thought {from}, ID: {id})")
        }
        StepKind::Branch { from: Some(from), .. } => {
            format!("🌿 Thought {position} (from thought {from})")
        }
        StepKind::Branch { from: None, id } => format!("🌿 Thought {position} (ID: {id})"),
    }
}

/// Boxed rendering of a step for operator logs.
pub fn render_box(payload: &StepPayload) -> String {
    let header = header(payload);
    let body: Vec<&str> = payload.text.lines().collect();
    let width = body
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0);
    let border = "─".repeat(width + 2);
    let row = |s: &str| format!("│ {s}{} │", " ".repeat(width - s.chars().count()));

    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(format!("┌{border}┐"));
    out.push(row(&header));
    out.push(format!("├{border}┤"));
    out.extend(body.iter().map(|l| row(l)));
    out.push(format!("└{border}┘"));
    out.join("\n")
}
