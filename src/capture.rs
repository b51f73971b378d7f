//! Panic capture: recovered faults become formatted reports
//!
//! [`try_catch`] runs a closure and absorbs any panic, turning it into a
//! report of the form
//! `exception panic: <message> from <file>:<line>(<function>)` followed by
//! the raw backtrace text. The fault is never re-raised.
//!
//! Location comes from two tiers: a process-global panic hook (installed
//! once, active only for threads currently inside a protected call) records
//! the panic site and a backtrace at panic time; when no snapshot is
//! available the protected call's own caller location is used.

use crate::core::buffer;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;

static HOOK_INIT: Once = Once::new();

thread_local! {
    static PROTECT_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSnapshot>> = const { RefCell::new(None) };
}

struct PanicSnapshot {
    file: String,
    line: u32,
    backtrace: String,
}

fn install_hook() {
    HOOK_INIT.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if PROTECT_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let snapshot = PanicSnapshot {
                file: info
                    .location()
                    .map(|loc| loc.file().to_string())
                    .unwrap_or_default(),
                line: info.location().map(Location::line).unwrap_or(0),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(snapshot));
        }));
    });
}

/// Normalize a panic payload into a message, wrapping unrecognized payload
/// types instead of failing the capture.
fn payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Recover the faulting function name from backtrace text: the frame right
/// below the innermost `panicking` machinery frame.
fn faulting_function(backtrace: &str) -> Option<String> {
    let mut symbols = Vec::new();
    for line in backtrace.lines() {
        let trimmed = line.trim_start();
        // Frame lines look like "4: path::to::function"; location lines
        // start with "at ".
        let Some((index, symbol)) = trimmed.split_once(": ") else {
            continue;
        };
        if index.bytes().all(|b| b.is_ascii_digit()) && !index.is_empty() {
            symbols.push(symbol.trim().to_string());
        }
    }
    let marker = symbols.iter().rposition(|sym| {
        sym.starts_with("core::panicking::panic")
            || sym.starts_with("std::panicking::begin_panic")
            || sym == "rust_begin_unwind"
    })?;
    symbols.get(marker + 1).cloned()
}

fn build_report(message: &str, file: &str, line: u32, function: &str, stack: &str) -> String {
    let mut buf = buffer::acquire(160 + stack.len() + function.len());
    buf.append_str("exception panic: ");
    buf.append_str(message);
    buf.append_str(" from ");
    buf.append_str(file);
    buf.append_byte(b':');
    buf.append_uint(u64::from(line), 0);
    buf.append_byte(b'(');
    buf.append_str(function);
    buf.append_str(")\n");
    buf.append_str(stack);
    String::from_utf8_lossy(buf.as_bytes()).into_owned()
}

/// Run `body`, absorbing any panic. On success returns `Some(value)`; on a
/// captured fault, formats a report and invokes `on_caught(report, message)`
/// before returning `None`. The panic is never re-raised.
#[track_caller]
pub fn try_catch<R>(body: impl FnOnce() -> R, on_caught: impl FnOnce(&str, &str)) -> Option<R> {
    let fallback = Location::caller();
    install_hook();

    PROTECT_DEPTH.with(|d| d.set(d.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    PROTECT_DEPTH.with(|d| d.set(d.get() - 1));

    match result {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = payload_message(payload.as_ref());
            let snapshot = LAST_PANIC.with(|slot| slot.borrow_mut().take());
            let (file, line, stack) = match snapshot {
                Some(snap) => (snap.file, snap.line, snap.backtrace),
                None => (fallback.file().to_string(), fallback.line(), String::new()),
            };
            let function =
                faulting_function(&stack).unwrap_or_else(|| "<unknown>".to_string());
            let report = build_report(&message, &file, line, &function, &stack);
            on_caught(&report, &message);
            None
        }
    }
}
