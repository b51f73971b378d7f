//! Basic synchronous logging to the console.
//!
//! Run with: cargo run --example basic_usage

use seglog::prelude::*;
use seglog::{error, info, warn};

fn main() {
    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .sink(ConsoleSink::stdout())
        .build();

    logger.debug("debug message with call-site capture");
    logger.info("application started");

    let port = 8080;
    info!(logger, "listening on port {}", port);
    warn!(logger, "cache miss rate {}%", 12);
    error!(logger, "upstream returned {}", 502);

    // Protected call: the panic is absorbed and reported at Fatal level.
    let result: Option<u32> = logger.protect(|| {
        if port == 8080 {
            panic!("demo fault");
        }
        7
    });
    info!(logger, "protected call returned {:?}", result);

    logger.wait();
}
