//! # seglog
//!
//! An embeddable leveled logging engine: producers on any thread emit
//! messages; the engine timestamps, formats, and routes them to one or more
//! sinks, optionally decoupling producers from I/O with a background
//! consumer fed by a segmented queue.
//!
//! ## Features
//!
//! - **Allocation-free hot path**: formatting goes through a tiered buffer
//!   pool, not per-entry heap allocation
//! - **Async or sync**: a single background consumer drains a segmented
//!   blocking queue; `wait()` drains everything before returning
//! - **Time-templated file rotation**: file paths derived from `%Y`/`%m`/…
//!   templates on every write
//! - **Panic capture**: protected calls turn recovered faults into
//!   formatted reports instead of crashing

pub mod capture;
pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::capture::try_catch;
    pub use crate::core::{
        Buffer, DateTime, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerError, Result,
        SegmentedQueue,
    };
    pub use crate::sinks::{ConsoleSink, HeaderFormatter, RotatingFileSink, Sink};
}

pub use capture::try_catch;
pub use core::{
    Buffer, DateTime, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerError, Result,
    SegmentedQueue,
};
pub use sinks::{ConsoleSink, HeaderFormatter, RotatingFileSink, Sink};
