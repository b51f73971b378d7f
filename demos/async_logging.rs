//! Asynchronous logging: producers enqueue, one consumer writes.
//!
//! Run with: cargo run --example async_logging

use seglog::info;
use seglog::prelude::*;
use std::sync::Arc;

fn main() {
    let logger = Arc::new(
        Logger::builder()
            .level(LogLevel::Info)
            .sink(ConsoleSink::stdout())
            .async_mode(true)
            .build(),
    );

    let mut handles = Vec::new();
    for worker in 0..4 {
        let logger = Arc::clone(&logger);
        handles.push(std::thread::spawn(move || {
            for i in 0..10 {
                info!(logger, "worker {} tick {}", worker, i);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Drain the queue and close the sinks; nothing is lost.
    logger.wait();
}
