//! Live progress output
//!
//! The runner emits exactly one line per settled probe. Routing those
//! lines through a trait keeps the runner testable and lets quiet mode
//! drop them without touching probe logic.

use std::sync::Mutex;

/// Destination for live progress lines
pub trait OutputSink: Send + Sync {
    /// Emit one settled-probe line
    fn line(&self, text: &str);
}

/// Prints lines to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&self, text: &str) {
        println!("{}", text);
    }
}

/// Drops all lines, for quiet mode
#[derive(Debug, Default)]
pub struct SilentSink;

impl OutputSink for SilentSink {
    fn line(&self, _text: &str) {}
}

/// Collects lines in memory, for tests
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out everything emitted so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutputSink for BufferSink {
    fn line(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_collects_in_order() {
        let sink = BufferSink::new();
        sink.line("first");
        sink.line("second");
        assert_eq!(sink.lines(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_silent_sink_drops_everything() {
        let sink = SilentSink;
        sink.line("ignored");
    }
}
