//! # seqthink-core
//!
//! Domain layer of the sequential thinking server.
//!
//! - **Steps**: [`StepPayload`] (the accepted shape) and [`StepArguments`]
//!   (the typed result of decoding a raw `arguments` object)
//! - **Validation**: [`validate`] turns arguments into a payload or a
//!   [`ValidationError`] naming the first rule that failed
//! - **History**: [`Session`] keeps the append-only step log and branch index,
//!   [`SessionRegistry`] owns sessions for one server context
//! - **Formatting**: [`format`] builds the summary and display text returned
//!   to callers
//! - **Logging**: [`logging::init_subscriber`] installs the stderr subscriber

#![deny(unsafe_code)]

pub mod format;
pub mod history;
pub mod logging;
pub mod step;
pub mod validate;

pub use format::{ResponsePayload, StepSummary, format, render_box};
pub use history::{HistoryStats, Session, SessionId, SessionRegistry};
pub use step::{Arg, StepArguments, StepKind, StepPayload};
pub use validate::{ValidationError, validate};
