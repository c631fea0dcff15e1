//! Descriptor of the single tool this server exposes.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Serialize;

/// Name of the step-submission tool.
pub const TOOL_NAME: &str = "sequentialthinking";

const DESCRIPTION: &str = "\
Record one step of a structured, revisable chain of reasoning.

Each call submits a numbered thought. Thoughts may build on earlier ones, \
revise them, or branch off into alternative lines of reasoning.

Use it for:
- breaking a complex problem into steps
- planning where the approach may change along the way
- analysis whose full scope is unclear at the start
- keeping context across a multi-step solution

Fields:
- thought: the current reasoning step (analysis, revision, question, hypothesis, verification)
- nextThoughtNeeded: true while more steps are expected
- thoughtNumber: position of this step, starting at 1
- totalThoughts: current estimate of the number of steps; raise or lower it as you go
- isRevision: this step reconsiders an earlier one
- revisesThought: with isRevision, the step being reconsidered
- branchFromThought: the step this branch starts from
- branchId: name of the branch this step belongs to
- needsMoreThoughts: set when thoughtNumber has to go past totalThoughts

Guidance:
1. Start with an estimate of totalThoughts and adjust it when it proves wrong.
2. Revise or question earlier steps freely, and mark revisions and branches.
3. A thoughtNumber above totalThoughts is rejected unless needsMoreThoughts is true.
4. Form a hypothesis, verify it against the earlier steps, and repeat until satisfied.
5. Set nextThoughtNeeded to false only once a satisfactory answer is reached.";

/// Tool entry returned by `tools/list`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: &'static str,
    /// Usage guidance shown to the caller.
    pub description: &'static str,
    /// JSON schema of the arguments.
    pub input_schema: InputSchema,
}

/// Object schema of the tool arguments.
#[derive(Clone, Debug, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    schema_type: &'static str,
    properties: BTreeMap<&'static str, Property>,
    required: [&'static str; 4],
}

/// Schema of one argument.
#[derive(Clone, Debug, Serialize)]
pub struct Property {
    #[serde(rename = "type")]
    property_type: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<u32>,
}

impl Property {
    fn new(property_type: &'static str, description: &'static str) -> Self {
        Self {
            property_type,
            description,
            minimum: None,
        }
    }

    fn positive(description: &'static str) -> Self {
        Self {
            minimum: Some(1),
            ..Self::new("integer", description)
        }
    }
}

/// The descriptor, built once so every `tools/list` serializes identically.
pub fn descriptor() -> &'static ToolDescriptor {
    static DESCRIPTOR: OnceLock<ToolDescriptor> = OnceLock::new();
    DESCRIPTOR.get_or_init(|| ToolDescriptor {
        name: TOOL_NAME,
        description: DESCRIPTION,
        input_schema: InputSchema {
            schema_type: "object",
            properties: BTreeMap::from([
                ("thought", Property::new("string", "Your current thinking step")),
                (
                    "nextThoughtNeeded",
                    Property::new("boolean", "Whether another thought step is needed"),
                ),
                ("thoughtNumber", Property::positive("Current thought number")),
                ("totalThoughts", Property::positive("Estimated total thoughts needed")),
                (
                    "isRevision",
                    Property::new("boolean", "Whether this revises previous thinking"),
                ),
                ("revisesThought", Property::positive("Which thought is being reconsidered")),
                ("branchFromThought", Property::positive("Branching point thought number")),
                ("branchId", Property::new("string", "Branch identifier")),
                ("needsMoreThoughts", Property::new("boolean", "If more thoughts are needed")),
            ]),
            required: ["thought", "nextThoughtNeeded", "thoughtNumber", "totalThoughts"],
        },
    })
}
