//! Thinframe Engine - process-wide services
//!
//! Holds the global logger and the fatal-exit path used by entry points.
//! Renderers are NOT stored here: every `RendererContext` is an owned value,
//! so several of them can coexist without sharing state.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::Error;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Exit status used when a fatal error terminates the process
pub const FATAL_EXIT_CODE: i32 = 1;

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Process-wide engine services
pub struct Engine;

impl Engine {
    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, network logger, etc.)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use thinframe_engine::thinframe::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without file:line (used by engine_info!, engine_warn!, etc.)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with file:line information (used by engine_error!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }

    // ===== FATAL PATH =====

    /// Message logged before a fatal exit
    pub fn fatal_message(error: &Error) -> String {
        format!("Fatal: {}. Terminating.", error)
    }

    /// Log a fatal error and terminate the process with `FATAL_EXIT_CODE`
    ///
    /// Only entry points call this. Library code returns errors and lets the
    /// caller decide, using `Error::is_fatal()`.
    pub fn fatal(source: &str, error: &Error) -> ! {
        Self::log(LogSeverity::Error, source, Self::fatal_message(error));
        std::process::exit(FATAL_EXIT_CODE)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
