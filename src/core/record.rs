//! The unit of work queued between producers and the consumer

use crate::core::log_level::LogLevel;

/// One log entry captured at the emit call site, rendered and routed to the
/// sinks either directly or through the queue. Records move by value through
/// queue slots; dropping one after fan-out releases it.
#[derive(Debug)]
pub struct LogRecord {
    /// Unix seconds (UTC) at emit time.
    pub unix: i64,
    pub level: LogLevel,
    /// Caller's source file, reduced to its final path segment.
    pub file: &'static str,
    pub line: u32,
    pub message: String,
}

impl LogRecord {
    pub fn new(unix: i64, level: LogLevel, file: &'static str, line: u32, message: String) -> Self {
        Self {
            unix,
            level,
            file,
            line,
            message,
        }
    }
}

/// Strip the directory prefix from a compiler-provided path, keeping the
/// final segment. Windows-style separators appear in cross-compiled builds.
pub fn short_file(path: &'static str) -> &'static str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
