//! Logging macros for ergonomic message formatting.
//!
//! These are the formatted emit variants: the leveled methods on
//! [`Logger`](crate::Logger) take a finished string, the macros format one
//! in place, like `println!`.
//!
//! # Examples
//!
//! ```
//! use seglog::prelude::*;
//! use seglog::info;
//!
//! let logger = Logger::new();
//!
//! info!(logger, "server started");
//!
//! let port = 8080;
//! info!(logger, "listening on port {}", port);
//! ```

/// Log a message at an explicit level with automatic formatting.
///
/// # Examples
///
/// ```
/// # use seglog::prelude::*;
/// # let logger = Logger::new();
/// use seglog::log;
/// log!(logger, LogLevel::Info, "simple message");
/// log!(logger, LogLevel::Error, "error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use seglog::prelude::*;
/// # let logger = Logger::new();
/// use seglog::info;
/// info!(logger, "processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
