//! Time-templated file rotation.
//!
//! Run with: cargo run --example file_logging

use seglog::info;
use seglog::prelude::*;

fn main() {
    // One file per hour under logs/, directories created on demand.
    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .sink(ConsoleSink::stdout())
        .sink(RotatingFileSink::new("logs/app.%Y-%m-%d-%H.log"))
        .async_mode(true)
        .build();

    info!(logger, "this line lands on the console and in logs/");
    for i in 0..5 {
        info!(logger, "entry {}", i);
    }

    logger.wait();
    println!("done; inspect the logs/ directory");
}
