//! Unified logging support for hle-syscalls
//!
//! This module provides a unified logging interface so call sites do not need
//! `#[cfg(feature = "log")]` attributes. Without the `log` feature the macros
//! still type-check their arguments and compile to nothing.

/// Unified trace-level logging
#[macro_export]
macro_rules! sys_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)*);
    }}
}

/// Unified debug-level logging
#[macro_export]
macro_rules! sys_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        log::debug!($($arg)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)*);
    }}
}

/// Unified info-level logging
#[macro_export]
macro_rules! sys_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        log::info!($($arg)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)*);
    }}
}

/// Unified warn-level logging
#[macro_export]
macro_rules! sys_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        log::warn!($($arg)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)*);
    }}
}

/// Unified error-level logging
#[macro_export]
macro_rules! sys_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        log::error!($($arg)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)*);
    }}
}

/// Reports a broken caller contract.
///
/// Logged at error level in every build; debug builds also panic so the
/// offending call site shows up in tests.
#[macro_export]
macro_rules! hle_assert {
    ($cond:expr, $($arg:tt)*) => {{
        if !$cond {
            $crate::sys_error!($($arg)*);
            debug_assert!($cond, $($arg)*);
        }
    }}
}
