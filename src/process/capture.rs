//! Capped incremental capture of child process output streams.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Output captured from a child process, possibly partial.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    stdout: String,
    stderr: String,
    truncated: bool,
}

impl CapturedOutput {
    /// Creates a captured output value.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, truncated: bool) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            truncated,
        }
    }

    /// Returns captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Returns captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Returns whether either stream exceeded the capture limit.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Shared buffer filled by a reader task while the process runs.
#[derive(Debug, Clone)]
pub(crate) struct StreamBuffer {
    state: Arc<Mutex<BufferState>>,
    limit: usize,
}

#[derive(Debug, Default)]
struct BufferState {
    bytes: Vec<u8>,
    truncated: bool,
}

impl StreamBuffer {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BufferState::default())),
            limit,
        }
    }

    fn append(&self, chunk: &[u8]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = self.limit.saturating_sub(state.bytes.len());
        let kept = chunk.len().min(remaining);
        state
            .bytes
            .extend_from_slice(chunk.get(..kept).unwrap_or_default());
        if kept < chunk.len() {
            state.truncated = true;
        }
    }

    fn snapshot(&self) -> (String, bool) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (
            String::from_utf8_lossy(&state.bytes).into_owned(),
            state.truncated,
        )
    }
}

/// Builds a [`CapturedOutput`] from the current contents of both buffers.
pub(crate) fn collect(stdout: &StreamBuffer, stderr: &StreamBuffer) -> CapturedOutput {
    let (stdout_text, stdout_truncated) = stdout.snapshot();
    let (stderr_text, stderr_truncated) = stderr.snapshot();
    CapturedOutput::new(stdout_text, stderr_text, stdout_truncated || stderr_truncated)
}

/// Drains `reader` into `buffer` until end of stream.
///
/// Bytes past the buffer limit are read and discarded so the child never
/// blocks on a full pipe.
pub(crate) async fn drain_into<R>(mut reader: R, buffer: StreamBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => buffer.append(chunk.get(..read).unwrap_or_default()),
            Err(err) => {
                debug!(error = %err, "output stream read failed");
                break;
            }
        }
    }
}
