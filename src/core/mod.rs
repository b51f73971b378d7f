//! Core logger types and building blocks

pub mod buffer;
pub mod datetime;
pub mod error;
pub mod log_level;
pub mod logger;
pub mod queue;
pub mod record;

pub use buffer::{Buffer, PooledBuffer, BUFFER_QUANTUM, POOL_TIERS};
pub use datetime::{date_clock, local_offset, unix_now, ClockTime, DateTime};
pub use error::{LoggerError, Result};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use queue::SegmentedQueue;
pub use record::LogRecord;
