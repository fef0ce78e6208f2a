//! The collection log: an ordered record of what each collection step did.
//!
//! Every archive write reports its outcome through a [`LogSink`]. The run
//! owns one [`CollectionLog`] and writes it as the final archive entry, using
//! [`NullSink`] for that write so the log never describes itself.

use std::fmt;

use log::{debug, info, warn};

/// Leading tag of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Ok,
    /// A failure, with the exit code of the command when one applies.
    Fail(Option<i32>),
    Info,
    Skip,
    /// The run aborted; only ever written by fatal recovery.
    Fatal,
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTag::Ok => f.write_str("OK"),
            LogTag::Fail(Some(code)) => write!(f, "FAIL({})", code),
            LogTag::Fail(None) => f.write_str("FAIL"),
            LogTag::Info => f.write_str("INFO"),
            LogTag::Skip => f.write_str("SKIP"),
            LogTag::Fatal => f.write_str("FATAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub tag: LogTag,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad the rendered tag, not the enum
        write!(f, "{:<9} {}", self.tag.to_string(), self.message)
    }
}

/// Destination for outcome lines.
pub trait LogSink {
    fn record(&mut self, tag: LogTag, message: String);

    fn ok(&mut self, message: String) {
        self.record(LogTag::Ok, message);
    }

    fn fail(&mut self, code: Option<i32>, message: String) {
        self.record(LogTag::Fail(code), message);
    }

    fn info(&mut self, message: String) {
        self.record(LogTag::Info, message);
    }

    fn skip(&mut self, message: String) {
        self.record(LogTag::Skip, message);
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn record(&mut self, _tag: LogTag, _message: String) {}
}

/// Append-only, in-memory collection log.
#[derive(Debug, Default, Clone)]
pub struct CollectionLog {
    lines: Vec<LogLine>,
}

impl CollectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn count(&self, predicate: impl Fn(&LogTag) -> bool) -> usize {
        self.lines.iter().filter(|line| predicate(&line.tag)).count()
    }

    /// Render as the text of the `collection.log` entry.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(&line.to_string());
            text.push('\n');
        }
        text
    }

    /// Render, followed by a fatal line describing why the run stopped.
    pub fn render_with_fatal(&self, error: &dyn fmt::Display) -> String {
        let mut text = self.render();
        let fatal = LogLine {
            tag: LogTag::Fatal,
            message: format!("collection aborted: {}", error),
        };
        text.push_str(&fatal.to_string());
        text.push('\n');
        text
    }
}

impl LogSink for CollectionLog {
    fn record(&mut self, tag: LogTag, message: String) {
        match tag {
            LogTag::Fail(_) | LogTag::Fatal => warn!("{} {}", tag, message),
            LogTag::Ok => info!("{} {}", tag, message),
            LogTag::Info | LogTag::Skip => debug!("{} {}", tag, message),
        }
        self.lines.push(LogLine { tag, message });
    }
}
