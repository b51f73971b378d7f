//! Console sink

use super::{format_entry, HeaderFormatter, Sink};
use crate::core::datetime::DateTime;
use crate::core::error::Result;
use crate::core::log_level::LogLevel;
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

/// Sink writing formatted lines to an arbitrary byte stream, stdout by
/// default. Holds its own calendar snapshot so bursts within one second
/// stamp without re-decomposing.
pub struct ConsoleSink {
    inner: Mutex<ConsoleInner>,
}

struct ConsoleInner {
    target: Box<dyn Write + Send>,
    time: DateTime,
    header: Option<HeaderFormatter>,
    use_colors: bool,
}

impl ConsoleSink {
    /// Wrap an arbitrary target; colors are off since the target may not be
    /// a terminal.
    pub fn new(target: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(ConsoleInner {
                target,
                time: DateTime::new(),
                header: None,
                use_colors: false,
            }),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout())).with_colors(true)
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr())).with_colors(true)
    }

    #[must_use]
    pub fn with_colors(self, use_colors: bool) -> Self {
        self.inner.lock().use_colors = use_colors;
        self
    }
}

impl Sink for ConsoleSink {
    fn write(&self, unix: i64, level: LogLevel, file: &str, line: u32, message: &str) -> Result<()> {
        let inner = &mut *self.inner.lock();
        inner.time.flush_to(unix);
        let buf = if inner.use_colors {
            let label = level.to_str().color(level.color_code()).to_string();
            format_entry(inner.header.as_ref(), &label, file, line, &inner.time, message)
        } else {
            format_entry(inner.header.as_ref(), level.to_str(), file, line, &inner.time, message)
        };
        inner.target.write_all(buf.as_bytes())?;
        Ok(())
    }

    fn set_header_formatter(&self, formatter: HeaderFormatter) {
        self.inner.lock().header = Some(formatter);
    }

    fn close(&self) -> Result<()> {
        self.inner.lock().target.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
