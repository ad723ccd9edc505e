use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use spawnpipe::exec::{SharedSink, Sinks};
use tokio::io::AsyncWrite;

/// In-memory `AsyncWrite` whose contents can be inspected from the test.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn shared(&self) -> SharedSink {
        SharedSink::new(self.clone())
    }
}

impl AsyncWrite for CaptureSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Captured stdout/stderr pair plus the `Sinks` that write into them.
pub struct CapturedSinks {
    pub stdout: CaptureSink,
    pub stderr: CaptureSink,
}

impl CapturedSinks {
    pub fn new() -> Self {
        Self {
            stdout: CaptureSink::new(),
            stderr: CaptureSink::new(),
        }
    }

    pub fn sinks(&self) -> Sinks {
        Sinks::new(self.stdout.shared(), self.stderr.shared())
    }
}

impl Default for CapturedSinks {
    fn default() -> Self {
        Self::new()
    }
}
