//! Output sinks for streamed tool output
//!
//! Every invocation streams stdout and stderr chunks to an append-only sink
//! as they arrive. Sinks are shared with reader tasks, so `append` takes
//! `&self`.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc;

/// Append-only destination for streamed tool output
pub trait OutputSink: Send + Sync {
    fn append(&self, chunk: &str);
}

/// Collects everything appended into an in-memory buffer
///
/// Used by output-capturing invocations.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Mutex<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenation of all chunks appended so far
    pub fn contents(&self) -> String {
        self.buf.lock().expect("buffer sink lock").clone()
    }
}

impl OutputSink for BufferSink {
    fn append(&self, chunk: &str) {
        self.buf.lock().expect("buffer sink lock").push_str(chunk);
    }
}

/// Forwards chunks over an unbounded channel to an event-loop consumer
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn append(&self, chunk: &str) {
        // Receiver gone means nobody is displaying this stream anymore.
        let _ = self.tx.send(chunk.to_string());
    }
}

/// Writes chunks straight to stdout (CLI display)
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&self, chunk: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn append(&self, _chunk: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_accumulates_in_order() {
        let sink = BufferSink::new();
        sink.append("hello ");
        sink.append("world");
        assert_eq!(sink.contents(), "hello world");
    }

    #[test]
    fn test_channel_sink_forwards_chunks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        sink.append("boot: ok");
        assert_eq!(rx.try_recv().unwrap(), "boot: ok");
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink::new(tx);
        // Must not panic
        sink.append("dropped");
    }

    #[test]
    fn test_null_sink_discards() {
        NullSink.append("anything");
    }
}
