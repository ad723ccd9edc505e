// src/config/mod.rs

//! Command lists, execution options and the build-config file.
//!
//! - [`model`] holds the typed command/target structures.
//! - [`validate`] is the shape gate every command list passes through.
//! - [`options`] resolves working directory and environment.
//! - [`loader`] reads `Spawnpipe.toml`.

pub mod loader;
pub mod model;
pub mod options;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{CommandList, CommandSpec, ConfigFile, RawConfigFile, RawTarget, Target};
pub use options::{merge_options, resolve_options, ExecutionOptions};
pub use validate::{validate_commands, validation_failure, CommandShapeError};
