//! Output capture
//!
//! Combined stdout/stderr of a step is appended to a buffer that never holds
//! more than its limit in characters. Once the limit is exceeded the oldest
//! characters are dropped, so the most recent diagnostics survive.

use openrisk_core::domain::pipeline::OUTPUT_TAIL_CHARS;
use std::sync::{Arc, Mutex};

/// Character-bounded tail of a text stream
#[derive(Debug, Clone)]
pub struct TailBuffer {
    buf: String,
    chars: usize,
    limit: usize,
}

impl TailBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            chars: 0,
            limit,
        }
    }

    pub fn push_str(&mut self, chunk: &str) {
        self.buf.push_str(chunk);
        self.chars += chunk.chars().count();

        if self.chars > self.limit {
            let excess = self.chars - self.limit;
            let cut = self
                .buf
                .char_indices()
                .nth(excess)
                .map(|(idx, _)| idx)
                .unwrap_or(self.buf.len());
            self.buf.drain(..cut);
            self.chars = self.limit;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn char_len(&self) -> usize {
        self.chars
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for TailBuffer {
    fn default() -> Self {
        Self::new(OUTPUT_TAIL_CHARS)
    }
}

/// A [`TailBuffer`] shared between the stdout and stderr readers of one process
#[derive(Debug, Clone, Default)]
pub struct SharedTailBuffer {
    inner: Arc<Mutex<TailBuffer>>,
}

impl SharedTailBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TailBuffer::new(limit))),
        }
    }

    pub fn push_str(&self, chunk: &str) {
        let mut buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push_str(chunk);
    }

    /// Copies the current contents out
    pub fn snapshot(&self) -> String {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buffer.as_str().to_string()
    }
}
