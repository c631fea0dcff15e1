//! Step payload types and the single decode boundary for raw arguments.
//!
//! The wire uses the MCP tool field names (`thought`, `thoughtNumber`, ...).
//! [`StepArguments::from_map`] is the only place that inspects JSON types;
//! everything downstream works with typed fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One accepted reasoning step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPayload {
    /// Reasoning content. Never empty once validated.
    #[serde(rename = "thought")]
    pub text: String,
    /// 1-based position of this step.
    #[serde(rename = "thoughtNumber")]
    pub step_number: u32,
    /// Caller's current estimate of the total step count.
    #[serde(rename = "totalThoughts")]
    pub total_steps: u32,
    /// Whether the caller intends to submit another step.
    #[serde(rename = "nextThoughtNeeded")]
    pub continuation_needed: bool,
    /// Marks this step as a revision of an earlier one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_revision: Option<bool>,
    /// Step number being revised. Present whenever `is_revision` is true.
    #[serde(rename = "revisesThought", skip_serializing_if = "Option::is_none")]
    pub revises_step: Option<u32>,
    /// Step this one branches from.
    #[serde(rename = "branchFromThought", skip_serializing_if = "Option::is_none")]
    pub branch_from_step: Option<u32>,
    /// Caller-chosen branch identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    /// Caller realised more steps are needed than estimated.
    #[serde(rename = "needsMoreThoughts", skip_serializing_if = "Option::is_none")]
    pub needs_more_steps: Option<bool>,
}

/// How a step relates to the rest of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Ordinary forward step.
    Plain,
    /// Supersedes an earlier step.
    Revision {
        /// The step being revised.
        of: u32,
    },
    /// Continues an alternate branch.
    Branch {
        /// Originating step, when the caller supplied one.
        from: Option<u32>,
        /// Branch identifier.
        id: String,
    },
}

impl StepPayload {
    /// Build a plain step with no optional fields.
    pub fn new(
        text: impl Into<String>,
        step_number: u32,
        total_steps: u32,
        continuation_needed: bool,
    ) -> Self {
        Self {
            text: text.into(),
            step_number,
            total_steps,
            continuation_needed,
            is_revision: None,
            revises_step: None,
            branch_from_step: None,
            branch_id: None,
            needs_more_steps: None,
        }
    }

    /// `isRevision`, defaulting to false.
    pub fn is_revision(&self) -> bool {
        self.is_revision.unwrap_or(false)
    }

    /// `needsMoreThoughts`, defaulting to false.
    pub fn needs_more_steps(&self) -> bool {
        self.needs_more_steps.unwrap_or(false)
    }

    /// Classify the step. Revision wins over branch when both are set.
    pub fn kind(&self) -> StepKind {
        if self.is_revision() {
            if let Some(of) = self.revises_step {
                return StepKind::Revision { of };
            }
        }
        match (&self.branch_id, self.branch_from_step) {
            (Some(id), from) => StepKind::Branch {
                from,
                id: id.clone(),
            },
            (None, Some(from)) => StepKind::Branch {
                from: Some(from),
                id: String::new(),
            },
            (None, None) => StepKind::Plain,
        }
    }
}

/// A decoded argument slot.
///
/// Keeps "absent" apart from "present with the wrong JSON type" so the
/// validator can report the right rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg<T> {
    /// Key not present (or explicitly `null`).
    Missing,
    /// Key present but not decodable as `T`.
    Malformed,
    /// Decoded value.
    Value(T),
}

impl<T> Arg<T> {
    /// Borrow the decoded value, if any.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Missing | Self::Malformed => None,
        }
    }

    /// Whether the key was absent.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl<T> Default for Arg<T> {
    fn default() -> Self {
        Self::Missing
    }
}

impl<T> From<Option<T>> for Arg<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Self::Value)
    }
}

/// Typed view of a `tools/call` arguments object.
///
/// Integers are kept as `i64` so sign and range checks stay in the validator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepArguments {
    /// `thought`
    pub text: Arg<String>,
    /// `thoughtNumber`
    pub step_number: Arg<i64>,
    /// `totalThoughts`
    pub total_steps: Arg<i64>,
    /// `nextThoughtNeeded`
    pub continuation_needed: Arg<bool>,
    /// `isRevision`
    pub is_revision: Arg<bool>,
    /// `revisesThought`
    pub revises_step: Arg<i64>,
    /// `branchFromThought`
    pub branch_from_step: Arg<i64>,
    /// `branchId`
    pub branch_id: Arg<String>,
    /// `needsMoreThoughts`
    pub needs_more_steps: Arg<bool>,
}

const KNOWN_KEYS: [&str; 9] = [
    "thought",
    "thoughtNumber",
    "totalThoughts",
    "nextThoughtNeeded",
    "isRevision",
    "revisesThought",
    "branchFromThought",
    "branchId",
    "needsMoreThoughts",
];

impl StepArguments {
    /// Decode an arguments object. Unknown keys are ignored.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        for key in map.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            debug!(key = key.as_str(), "ignoring unknown step argument");
        }
        Self {
            text: string_arg(map, "thought"),
            step_number: integer_arg(map, "thoughtNumber"),
            total_steps: integer_arg(map, "totalThoughts"),
            continuation_needed: bool_arg(map, "nextThoughtNeeded"),
            is_revision: bool_arg(map, "isRevision"),
            revises_step: integer_arg(map, "revisesThought"),
            branch_from_step: integer_arg(map, "branchFromThought"),
            branch_id: string_arg(map, "branchId"),
            needs_more_steps: bool_arg(map, "needsMoreThoughts"),
        }
    }

    /// Decode any JSON value. Non-objects decode as an empty argument set.
    pub fn from_value(value: &Value) -> Self {
        value.as_object().map(Self::from_map).unwrap_or_default()
    }
}

impl From<&StepPayload> for StepArguments {
    fn from(p: &StepPayload) -> Self {
        Self {
            text: Arg::Value(p.text.clone()),
            step_number: Arg::Value(i64::from(p.step_number)),
            total_steps: Arg::Value(i64::from(p.total_steps)),
            continuation_needed: Arg::Value(p.continuation_needed),
            is_revision: p.is_revision.into(),
            revises_step: p.revises_step.map(i64::from).into(),
            branch_from_step: p.branch_from_step.map(i64::from).into(),
            branch_id: p.branch_id.clone().into(),
            needs_more_steps: p.needs_more_steps.into(),
        }
    }
}

fn slot<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn string_arg(map: &Map<String, Value>, key: &str) -> Arg<String> {
    match slot(map, key) {
        None => Arg::Missing,
        Some(Value::String(s)) => Arg::Value(s.clone()),
        Some(_) => Arg::Malformed,
    }
}

fn bool_arg(map: &Map<String, Value>, key: &str) -> Arg<bool> {
    match slot(map, key) {
        None => Arg::Missing,
        Some(Value::Bool(b)) => Arg::Value(*b),
        Some(_) => Arg::Malformed,
    }
}

/// Accepts JSON integers and integral floats (`3.0`), which some clients emit.
fn integer_arg(map: &Map<String, Value>, key: &str) -> Arg<i64> {
    let Some(value) = slot(map, key) else {
        return Arg::Missing;
    };
    let Some(n) = value.as_number() else {
        return Arg::Malformed;
    };
    if let Some(i) = n.as_i64() {
        return Arg::Value(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Arg::Value(f as i64)
        }
        _ => Arg::Malformed,
    }
}
