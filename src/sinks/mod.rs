//! Sink implementations and the shared line-formatting path

pub mod console;
pub mod rotating_file;

pub use console::ConsoleSink;
pub use rotating_file::RotatingFileSink;

use crate::core::buffer::{self, Buffer, PooledBuffer};
use crate::core::datetime::DateTime;
use crate::core::error::Result;
use crate::core::log_level::LogLevel;
use std::sync::Arc;

/// Caller-supplied header renderer: `(buf, level_label, file, line, dt)`.
/// Appends the header (everything before the message) to `buf`.
pub type HeaderFormatter = Arc<dyn Fn(&mut Buffer, &str, &str, u32, &DateTime) + Send + Sync>;

/// A destination that renders and writes formatted log lines.
///
/// Sinks guard their own output state internally, so a logger can fan a
/// record out from the async consumer while another thread flushes or closes
/// the same sink.
pub trait Sink: Send + Sync {
    /// Render `[header] message\n` for the entry and deliver the bytes.
    fn write(&self, unix: i64, level: LogLevel, file: &str, line: u32, message: &str)
        -> Result<()>;

    /// Replace the default header with a caller-supplied renderer.
    fn set_header_formatter(&self, formatter: HeaderFormatter);

    /// Release the underlying byte stream. Must be idempotent; a later write
    /// on a file-backed sink reopens lazily.
    fn close(&self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Default header: `[LEVEL yyyy/mm/dd HH:MM:SS file:line]`.
pub(crate) fn default_header(buf: &mut Buffer, level: &str, file: &str, line: u32, dt: &DateTime) {
    buf.append_byte(b'[');
    buf.append_str(level);
    buf.append_byte(b' ');
    buf.append_uint(dt.year().max(0) as u64, 4);
    buf.append_byte(b'/');
    buf.append_uint(u64::from(dt.month()), 2);
    buf.append_byte(b'/');
    buf.append_uint(u64::from(dt.day()), 2);
    buf.append_byte(b' ');
    buf.append_uint(u64::from(dt.hour()), 2);
    buf.append_byte(b':');
    buf.append_uint(u64::from(dt.min()), 2);
    buf.append_byte(b':');
    buf.append_uint(u64::from(dt.sec()), 2);
    buf.append_byte(b' ');
    buf.append_str(file);
    buf.append_byte(b':');
    buf.append_uint(u64::from(line), 0);
    buf.append_byte(b']');
}

/// Assemble a complete line into a pooled buffer: header, one space, the
/// message, and a trailing newline.
pub(crate) fn format_entry(
    header: Option<&HeaderFormatter>,
    level_label: &str,
    file: &str,
    line: u32,
    dt: &DateTime,
    message: &str,
) -> PooledBuffer {
    let mut buf = buffer::acquire(40 + file.len() + message.len());
    match header {
        Some(custom) => custom(&mut buf, level_label, file, line, dt),
        None => default_header(&mut buf, level_label, file, line, dt),
    }
    buf.append_byte(b' ');
    buf.append_str(message);
    buf.append_byte(b'\n');
    buf
}
