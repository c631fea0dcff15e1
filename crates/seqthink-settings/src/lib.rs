//! # seqthink-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SeqthinkSettings::default()`]
//! 2. **User file**: `~/.seqthink/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `PORT` and `SEQTHINK_*` overrides
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    RejectedOverride, apply_overrides, deep_merge, load_settings_from_path, settings_path,
};
pub use types::{LogFormat, LoggingSettings, SeqthinkSettings, ServerSettings};
