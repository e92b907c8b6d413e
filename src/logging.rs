//! Process-wide diagnostic tracing toggle
//!
//! When enabled, every driver entry point emits a `tracing` debug event that
//! names the operation and the thread executing it. The toggle has no
//! behavioral effect; it only gates these entry events. Installing a
//! subscriber is left to the application.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

/// Turn per-operation entry tracing on or off for the whole process
pub fn enable_debug_logging(enable: bool) {
    DEBUG_LOGGING.store(enable, Ordering::Relaxed);
    debug!("debug logging {}", if enable { "enabled" } else { "disabled" });
}

/// Whether per-operation entry tracing is on
pub fn debug_logging_enabled() -> bool {
    DEBUG_LOGGING.load(Ordering::Relaxed)
}

pub(crate) fn trace_entry(operation: &str) {
    if debug_logging_enabled() {
        let thread = std::thread::current();
        debug!(
            thread_id = ?thread.id(),
            thread_name = thread.name().unwrap_or("<unnamed>"),
            "{}",
            operation
        );
    }
}
