//! Line buffering for chunked response bodies.
//!
//! Network reads arrive at arbitrary byte boundaries; a read can end in the
//! middle of a line or in the middle of a UTF-8 sequence. `LineBuffer` is
//! the explicit state machine that turns those reads into complete lines:
//! accumulate, split on `\n`, keep the trailing remainder for the next
//! read. The final partial line (a body that does not end in a newline) is
//! recovered with [`LineBuffer::finish`].

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes; returns every line completed by it.
    ///
    /// Trailing `\r` is stripped so CRLF bodies parse the same as LF ones.
    /// Lines are decoded lossily: an invalid byte corrupts one line, not
    /// the stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush whatever remains after the stream ends.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}
