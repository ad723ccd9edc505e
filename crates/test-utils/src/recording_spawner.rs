use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

use spawnpipe::exec::{ProcessHandle, ProcessSpawner, SpawnRequest, TokioSpawner};

/// A spawner that:
/// - records every executable it was asked to start, in order
/// - refuses executables listed in `deny` with `PermissionDenied`
/// - starts everything else for real through `TokioSpawner`.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpawner {
    spawned: Arc<Mutex<Vec<String>>>,
    deny: HashSet<String>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(mut self, executable: &str) -> Self {
        self.deny.insert(executable.to_string());
        self
    }

    pub fn spawned(&self) -> Vec<String> {
        self.spawned.lock().unwrap().clone()
    }
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn(&self, request: SpawnRequest<'_>) -> io::Result<ProcessHandle> {
        let name = request.command.executable.clone();
        self.spawned.lock().unwrap().push(name.clone());

        if self.deny.contains(&name) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("spawning `{name}` denied by test"),
            ));
        }

        TokioSpawner.spawn(request)
    }
}
