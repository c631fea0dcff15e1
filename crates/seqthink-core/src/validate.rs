//! Step validation.
//!
//! Rules are checked in a fixed order and the first failure wins:
//!
//! 1. `thought` is a non-empty string
//! 2. `thoughtNumber` is a positive integer
//! 3. `totalThoughts` is a positive integer
//! 4. `nextThoughtNeeded` is a boolean
//! 5. optional fields, when present, carry the right type and range
//! 6. `isRevision == true` requires a positive `revisesThought`
//! 7. `thoughtNumber <= totalThoughts` unless `needsMoreThoughts == true`
//!
//! Rule 7 is strict: the step is rejected, `totalThoughts` is never raised.
//! An empty `branchId` is treated as absent.

use thiserror::Error;

use crate::step::{Arg, StepArguments, StepPayload};

/// Why a step was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Rule 1.
    #[error("invalid thought: must be a non-empty string")]
    EmptyText,
    /// Rule 2.
    #[error("invalid thoughtNumber: must be a positive integer")]
    StepNumber,
    /// Rule 3.
    #[error("invalid totalThoughts: must be a positive integer")]
    TotalSteps,
    /// Rule 4.
    #[error("invalid nextThoughtNeeded: must be a boolean")]
    ContinuationFlag,
    /// `isRevision` present but not a boolean.
    #[error("invalid isRevision: must be a boolean")]
    RevisionFlag,
    /// `needsMoreThoughts` present but not a boolean.
    #[error("invalid needsMoreThoughts: must be a boolean")]
    NeedsMoreFlag,
    /// `branchId` present but not a string.
    #[error("invalid branchId: must be a string")]
    BranchId,
    /// `branchFromThought` present but not a positive integer.
    #[error("invalid branchFromThought: must be a positive integer")]
    BranchFromStep,
    /// Rule 6, or `revisesThought` present but not a positive integer.
    #[error("invalid revisesThought: must be a positive integer when isRevision is true")]
    RevisesStep,
    /// Rule 7.
    #[error(
        "thoughtNumber {step} exceeds totalThoughts {total}; raise totalThoughts or set needsMoreThoughts"
    )]
    StepExceedsTotal {
        /// Submitted step number.
        step: u32,
        /// Submitted total.
        total: u32,
    },
}

/// Validate decoded arguments. Pure; never touches session state.
pub fn validate(args: &StepArguments) -> Result<StepPayload, ValidationError> {
    let text = match &args.text {
        Arg::Value(t) if !t.is_empty() => t.clone(),
        _ => return Err(ValidationError::EmptyText),
    };
    let step_number = required_positive(&args.step_number, ValidationError::StepNumber)?;
    let total_steps = required_positive(&args.total_steps, ValidationError::TotalSteps)?;
    let Arg::Value(continuation_needed) = args.continuation_needed else {
        return Err(ValidationError::ContinuationFlag);
    };

    let is_revision = optional(&args.is_revision, ValidationError::RevisionFlag)?;
    let needs_more_steps = optional(&args.needs_more_steps, ValidationError::NeedsMoreFlag)?;
    let branch_id = optional(&args.branch_id, ValidationError::BranchId)?
        .filter(|id| !id.is_empty());
    let branch_from_step = optional_positive(&args.branch_from_step, ValidationError::BranchFromStep)?;
    let revises_step = optional_positive(&args.revises_step, ValidationError::RevisesStep)?;

    if is_revision == Some(true) && revises_step.is_none() {
        return Err(ValidationError::RevisesStep);
    }

    if step_number > total_steps && needs_more_steps != Some(true) {
        return Err(ValidationError::StepExceedsTotal {
            step: step_number,
            total: total_steps,
        });
    }

    Ok(StepPayload {
        text,
        step_number,
        total_steps,
        continuation_needed,
        is_revision,
        revises_step,
        branch_from_step,
        branch_id,
        needs_more_steps,
    })
}

fn positive(n: i64) -> Option<u32> {
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn required_positive(arg: &Arg<i64>, err: ValidationError) -> Result<u32, ValidationError> {
    arg.as_value().copied().and_then(positive).ok_or(err)
}

fn optional_positive(arg: &Arg<i64>, err: ValidationError) -> Result<Option<u32>, ValidationError> {
    match arg {
        Arg::Missing => Ok(None),
        Arg::Malformed => Err(err),
        Arg::Value(n) => positive(*n).map(Some).ok_or(err),
    }
}

fn optional<T: Clone>(arg: &Arg<T>, err: ValidationError) -> Result<Option<T>, ValidationError> {
    match arg {
        Arg::Missing => Ok(None),
        Arg::Malformed => Err(err),
        Arg::Value(v) => Ok(Some(v.clone())),
    }
}
