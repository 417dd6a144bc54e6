#![deny(missing_docs)]
//! Shared logging utilities for the extraction pipeline workspace.
//!
//! This crate provides the `pipeline_*` logging macros used across the
//! codebase, a per-thread job tag that is prefixed to every message, and a
//! minimal test initializer for the global logger.

use std::cell::Cell;

thread_local! {
    /// Processing job the current thread is working on, if any.
    static JOB_TAG: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Tags log lines emitted from the current thread with a processing job id.
///
/// Pass `None` once the job is finished or discarded.
pub fn set_job_tag(job_id: Option<u64>) {
    JOB_TAG.with(|v| v.set(job_id));
}

/// Returns the processing job id the current thread is tagged with.
pub fn job_tag() -> Option<u64> {
    JOB_TAG.with(|v| v.get())
}

#[doc(hidden)]
pub fn tag_prefix() -> String {
    match job_tag() {
        Some(job_id) => format!("[job {job_id}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! pipeline_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
