//! Response sink decorator that keeps a copy of everything written.
//!
//! [`CapturingWriter`] sits between a backend and the real client sink.
//! Bytes and status updates pass straight through; the writer keeps its own
//! copy so the recorder can inspect the finished response afterwards.
//! Flushes are forwarded so streamed responses still reach the client
//! incrementally.

use std::io;

/// Destination for an HTTP response body and status.
pub trait ResponseSink {
    /// Write part of the body, returning how many bytes were accepted.
    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Set the response status code.
    fn write_status(&mut self, status: u16);

    /// Flush capability, for sinks that support incremental delivery.
    fn flusher(&mut self) -> Option<&mut dyn FlushSink> {
        None
    }
}

/// Optional capability of a [`ResponseSink`]: push buffered bytes to the
/// client now.
pub trait FlushSink {
    fn flush(&mut self) -> io::Result<()>;
}

/// Status reported when the backend never sets one explicitly.
pub const DEFAULT_STATUS: u16 = 200;

/// Pass-through [`ResponseSink`] that buffers the body and tracks the last
/// status set.
#[derive(Debug)]
pub struct CapturingWriter<S> {
    inner: S,
    body: Vec<u8>,
    status: u16,
}

impl<S: ResponseSink> CapturingWriter<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            body: Vec::new(),
            status: DEFAULT_STATUS,
        }
    }

    /// Body bytes written so far, exactly as the inner sink accepted them.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text (lossy UTF-8).
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The most recently set status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ResponseSink> ResponseSink for CapturingWriter<S> {
    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write_body(buf)?;
        self.body.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn write_status(&mut self, status: u16) {
        self.status = status;
        self.inner.write_status(status);
    }

    fn flusher(&mut self) -> Option<&mut dyn FlushSink> {
        Some(self)
    }
}

impl<S: ResponseSink> FlushSink for CapturingWriter<S> {
    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flusher() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }
}
