use std::fmt;
use std::sync::{Arc, Mutex};

/// Server-side log sink handed to the store, the clone service and the
/// endpoint layer at startup.
pub trait ServerLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str, cause: &dyn fmt::Display);
}

pub type SharedLog = Arc<dyn ServerLog>;

/// Forwards to `tracing`. Informational lines are dropped unless `detailed`
/// is on; errors are always emitted.
#[derive(Debug, Clone, Copy)]
pub struct TracingLog {
    detailed: bool,
}

impl TracingLog {
    pub fn new(detailed: bool) -> Self {
        Self { detailed }
    }

    pub fn detailed(&self) -> bool {
        self.detailed
    }
}

impl ServerLog for TracingLog {
    fn info(&self, message: &str) {
        if self.detailed {
            tracing::info!(target: "codelink", "{message}");
        }
    }

    fn error(&self, message: &str, cause: &dyn fmt::Display) {
        tracing::error!(target: "codelink", cause = %cause, "{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Info(String),
    Error { message: String, cause: String },
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                LogLine::Error { message, cause } => Some((message, cause)),
                LogLine::Info(_) => None,
            })
            .collect()
    }

    fn push(&self, line: LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}

impl ServerLog for MemoryLog {
    fn info(&self, message: &str) {
        self.push(LogLine::Info(message.to_owned()));
    }

    fn error(&self, message: &str, cause: &dyn fmt::Display) {
        self.push(LogLine::Error {
            message: message.to_owned(),
            cause: cause.to_string(),
        });
    }
}
