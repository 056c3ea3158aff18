//! Stage-level logging switches.
//!
//! Classifier stages that log, and the analyze operation, declare a module-level
//! `ENABLE_LOGS` flag, so one stage's output can be silenced without touching
//! `RUST_LOG`. Stage counts go to info, per-window and per-point decisions to
//! debug, skipped devices and quality flags to warn, a failed commit to error.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("Processing {} devices", groups.len());
//! log_debug!("{} window {}..{}: {}", device_id, start, end, label.as_str());
//! ```

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional debug logging.
/// Stage internals (per-window decisions) go here so they stay quiet at the
/// default Info level.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
