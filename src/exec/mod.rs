// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`pipeline`] spawns and wires a chain of commands.
//! - [`stage`] supervises individual stages and forwards their streams.
//! - [`spawner`] provides the `ProcessSpawner` trait and the production
//!   `TokioSpawner`.
//! - [`sink`] holds the shared stdout/stderr sinks.

pub mod pipeline;
pub mod sink;
pub mod spawner;
pub mod stage;

pub use pipeline::{spawn_and_pipe, Pipeline, PipelineHandle};
pub use sink::{SharedSink, Sinks};
pub use spawner::{ProcessHandle, ProcessSpawner, SpawnRequest, TokioSpawner};
pub use stage::{KillSwitch, StageBoard, StageStatus};
