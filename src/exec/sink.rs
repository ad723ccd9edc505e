// src/exec/sink.rs

//! Output and error sinks a pipeline writes into.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable, lock-protected async byte sink.
///
/// Several forwarders (one per stage stderr, plus diagnostics) write into the
/// same sink; each `write_all` holds the lock for the whole chunk so lines
/// from different stages never interleave mid-line.
#[derive(Clone)]
pub struct SharedSink {
    inner: Arc<Mutex<BoxedWriter>>,
}

impl SharedSink {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// This process's standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// This process's standard error.
    pub fn stderr() -> Self {
        Self::new(tokio::io::stderr())
    }

    pub async fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await
    }

    /// Write `line`, appending a newline if it does not end with one.
    pub async fn write_line(&self, line: &str) -> io::Result<()> {
        if line.ends_with('\n') {
            self.write_all(line.as_bytes()).await
        } else {
            let mut buf = String::with_capacity(line.len() + 1);
            buf.push_str(line);
            buf.push('\n');
            self.write_all(buf.as_bytes()).await
        }
    }
}

impl fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSink").finish_non_exhaustive()
    }
}

/// Where the last stage's stdout and every stage's stderr end up.
#[derive(Debug, Clone)]
pub struct Sinks {
    pub stdout: SharedSink,
    pub stderr: SharedSink,
}

impl Sinks {
    pub fn new(stdout: SharedSink, stderr: SharedSink) -> Self {
        Self { stdout, stderr }
    }
}

impl Default for Sinks {
    fn default() -> Self {
        Self::new(SharedSink::stdout(), SharedSink::stderr())
    }
}
