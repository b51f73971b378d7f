//! Main logger implementation

use super::{
    datetime::unix_now,
    log_level::LogLevel,
    queue::SegmentedQueue,
    record::{short_file, LogRecord},
};
use crate::capture;
use crate::sinks::{HeaderFormatter, Sink};
use parking_lot::{Mutex, RwLock};
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

type SinkList = Arc<RwLock<Vec<Box<dyn Sink>>>>;

/// Leveled logger fanning entries out to an ordered list of sinks, either
/// synchronously at the call site or through a background consumer.
///
/// All methods take `&self`; share one instance across producer threads as
/// `Arc<Logger>`. Reconfiguration (`set_level`, `add_sink`) is intended for
/// setup and teardown, not while producers are actively logging.
pub struct Logger {
    level: RwLock<LogLevel>,
    sinks: SinkList,
    /// Created on the first switch to async and reused across restarts.
    queue: OnceLock<Arc<SegmentedQueue<LogRecord>>>,
    async_mode: AtomicBool,
    running: AtomicBool,
    consumer: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Logger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: RwLock::new(LogLevel::Info),
            sinks: Arc::new(RwLock::new(Vec::new())),
            queue: OnceLock::new(),
            async_mode: AtomicBool::new(false),
            running: AtomicBool::new(false),
            consumer: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn add_sink(&self, sink: Box<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    /// Install `formatter` on every registered sink.
    pub fn set_header_formatter(&self, formatter: HeaderFormatter) {
        for sink in self.sinks.read().iter() {
            sink.set_header_formatter(Arc::clone(&formatter));
        }
    }

    /// Switch between queued delivery through the background consumer and
    /// direct synchronous writes. Turning async off drains and stops the
    /// consumer via [`wait`].
    ///
    /// [`wait`]: Logger::wait
    pub fn set_async(&self, async_mode: bool) {
        self.async_mode.store(async_mode, Ordering::Release);
        if async_mode {
            self.start();
        } else {
            self.wait();
        }
    }

    fn start(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let queue = Arc::clone(
            self.queue
                .get_or_init(|| Arc::new(SegmentedQueue::new())),
        );
        queue.open();
        let sinks = Arc::clone(&self.sinks);
        let handle = thread::Builder::new()
            .name("seglog-consumer".to_string())
            .spawn(move || consume(queue, sinks))
            .expect("failed to spawn log consumer thread");
        *self.consumer.lock() = Some(handle);
    }

    /// Drain and stop the background consumer, then close all sinks.
    ///
    /// Every record pushed before the queue closed is delivered before this
    /// returns. Idempotent: repeated calls, or a call on a logger that was
    /// never async, only re-close the sinks, which sinks tolerate.
    pub fn wait(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Some(queue) = self.queue.get() {
                queue.close();
            }
            if let Some(handle) = self.consumer.lock().take() {
                if handle.join().is_err() {
                    eprintln!("seglog: consumer thread terminated abnormally");
                }
            }
        }
        self.close_sinks();
    }

    fn close_sinks(&self) {
        for sink in self.sinks.read().iter() {
            if let Err(err) = sink.close() {
                eprintln!("seglog: sink '{}' close failed: {}", sink.name(), err);
            }
        }
    }

    /// Emit `message` at `level`. Below the threshold this is a no-op with
    /// no side effects; otherwise the caller's file and line are recorded
    /// with the entry.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if level < *self.level.read() {
            return;
        }
        let caller = Location::caller();
        let record = LogRecord::new(
            unix_now(),
            level,
            short_file(caller.file()),
            caller.line(),
            message.into(),
        );
        self.dispatch(record);
    }

    fn dispatch(&self, record: LogRecord) {
        if self.async_mode.load(Ordering::Acquire) && self.running.load(Ordering::Acquire) {
            if let Some(queue) = self.queue.get() {
                match queue.push(record) {
                    Ok(()) => return,
                    // Lost the race with wait(): the queue closed between the
                    // running check and the push. Deliver directly instead of
                    // dropping.
                    Err(rejected) => {
                        fan_out(&self.sinks, &rejected);
                        return;
                    }
                }
            }
        }
        fan_out(&self.sinks, &record);
    }

    /// Run `body`, absorbing any panic; a captured fault is reported through
    /// this logger at `Fatal` level. Returns `None` when a fault occurred.
    pub fn protect<R>(&self, body: impl FnOnce() -> R) -> Option<R> {
        capture::try_catch(body, |report, _| {
            self.log(LogLevel::Fatal, report.to_string());
        })
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Deterministic drain; shutdown does not rely on anything running
        // after the owner lets go of the logger.
        self.wait();
    }
}

/// Write one record to every sink in registration order. Sink failures are
/// reported and never propagate into the logging path.
fn fan_out(sinks: &SinkList, record: &LogRecord) {
    for sink in sinks.read().iter() {
        if let Err(err) = sink.write(
            record.unix,
            record.level,
            record.file,
            record.line,
            &record.message,
        ) {
            eprintln!("seglog: sink '{}' write failed: {}", sink.name(), err);
        }
    }
}

/// Background consumer: drain the queue, fanning each record to all sinks,
/// until the queue reports closed-and-drained. A panic inside a sink is
/// captured and reported; the loop re-enters so remaining records still
/// drain.
fn consume(queue: Arc<SegmentedQueue<LogRecord>>, sinks: SinkList) {
    loop {
        let finished = capture::try_catch(
            || loop {
                let (record, closed) = queue.pop_blocking();
                match record {
                    Some(record) => fan_out(&sinks, &record),
                    None => {
                        debug_assert!(closed);
                        return;
                    }
                }
            },
            |report, _| eprintln!("{report}"),
        );
        if finished.is_some() {
            break;
        }
    }
}

/// Fluent construction for [`Logger`].
///
/// # Example
/// ```
/// use seglog::prelude::*;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .sink(ConsoleSink::stdout())
///     .async_mode(true)
///     .build();
/// logger.info("ready");
/// logger.wait();
/// ```
pub struct LoggerBuilder {
    level: LogLevel,
    sinks: Vec<Box<dyn Sink>>,
    async_mode: bool,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            sinks: Vec::new(),
            async_mode: false,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    pub fn build(self) -> Logger {
        let logger = Logger::new();
        logger.set_level(self.level);
        for sink in self.sinks {
            logger.add_sink(sink);
        }
        if self.async_mode {
            logger.set_async(true);
        }
        logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use std::sync::atomic::AtomicUsize;

    /// Sink that counts writes; used to observe filtering and fan-out.
    struct CountingSink {
        writes: Arc<AtomicUsize>,
    }

    impl Sink for CountingSink {
        fn write(&self, _unix: i64, _level: LogLevel, _file: &str, _line: u32, _msg: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn set_header_formatter(&self, _formatter: HeaderFormatter) {}

        fn close(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_level_filtering() {
        let writes = Arc::new(AtomicUsize::new(0));
        let logger = Logger::builder()
            .level(LogLevel::Warn)
            .sink(CountingSink {
                writes: Arc::clone(&writes),
            })
            .build();

        logger.debug("dropped");
        logger.info("dropped");
        assert_eq!(writes.load(Ordering::Relaxed), 0);

        logger.warn("kept");
        logger.error("kept");
        logger.fatal("kept");
        assert_eq!(writes.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_off_silences_everything() {
        let writes = Arc::new(AtomicUsize::new(0));
        let logger = Logger::builder()
            .level(LogLevel::Off)
            .sink(CountingSink {
                writes: Arc::clone(&writes),
            })
            .build();
        logger.fatal("dropped");
        assert_eq!(writes.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_wait_twice_on_idle_logger() {
        let logger = Logger::new();
        logger.wait();
        logger.wait();
    }

    #[test]
    fn test_async_restart() {
        let writes = Arc::new(AtomicUsize::new(0));
        let logger = Logger::builder()
            .sink(CountingSink {
                writes: Arc::clone(&writes),
            })
            .async_mode(true)
            .build();

        logger.info("one");
        logger.wait();
        assert_eq!(writes.load(Ordering::Relaxed), 1);

        // The queue reopens on restart.
        logger.set_async(true);
        logger.info("two");
        logger.wait();
        assert_eq!(writes.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_sync_fallback_after_wait() {
        let writes = Arc::new(AtomicUsize::new(0));
        let logger = Logger::builder()
            .sink(CountingSink {
                writes: Arc::clone(&writes),
            })
            .async_mode(true)
            .build();
        logger.wait();
        // Queue is closed and the consumer is gone, but nothing is dropped.
        logger.info("direct");
        assert_eq!(writes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_protect_reports_fatal() {
        let writes = Arc::new(AtomicUsize::new(0));
        let logger = Logger::builder()
            .level(LogLevel::Fatal)
            .sink(CountingSink {
                writes: Arc::clone(&writes),
            })
            .build();
        let out: Option<()> = logger.protect(|| panic!("x"));
        assert_eq!(out, None);
        assert_eq!(writes.load(Ordering::Relaxed), 1);
    }
}
