//! Simple to ``stderr`` logger.
//!
//! The ``trace``, ``debug`` and ``info`` levels only emit when the ``debug``
//! feature is enabled; ``warn`` and ``error`` always emit.

/// Timestamp related functions.
///
/// This module is used by the exported macros in external crates; so this has
/// to be public in scope.
#[cfg(feature = "debug")]
pub mod timestamp {
    use chrono::Utc;

    /// Generate the current timestamp.
    pub fn now() -> String {
        Utc::now().to_rfc3339()
    }
}

#[macro_export]
macro_rules! trace {
    ($base:tt) => {{
        #[cfg(feature="debug")]
        eprintln!("{} \x1b[1m\x1b[38:5:240mTRACE\x1b[39m | \x1b[22m\x1b[38:5:240m{}\x1b[39m", $crate::timestamp::now(), $base);
    }};
    ($base:tt, $($arg:tt)*) => {{
        #[cfg(feature="debug")]
        eprintln!(concat!("{} ", "\x1b[1m\x1b[38:5:240mTRACE\x1b[39m | \x1b[22m\x1b[38:5:240m", $base, "\x1b[39m"), $crate::timestamp::now(), $($arg)*);
    }};
}

#[macro_export]
macro_rules! debug {
    ($base:tt) => {{
        #[cfg(feature="debug")]
        eprintln!("{} \x1b[1m\x1b[38:5:245mDEBUG\x1b[39m | \x1b[22m\x1b[38:5:245m{}\x1b[39m", $crate::timestamp::now(), $base);
    }};
    ($base:tt, $($arg:tt)*) => {{
        #[cfg(feature="debug")]
        eprintln!(concat!("{} ", "\x1b[1m\x1b[38:5:245mDEBUG\x1b[39m | \x1b[22m\x1b[38:5:245m", $base, "\x1b[39m"), $crate::timestamp::now(), $($arg)*);
    }};
}

#[macro_export]
macro_rules! info {
    ($base:tt) => {{
        #[cfg(feature="debug")]
        eprintln!("{} \x1b[1m\x1b[38:5:15mINFO\x1b[39m  | \x1b[22m\x1b[38:5:7m{}\x1b[39m", $crate::timestamp::now(), $base);
    }};
    ($base:tt, $($arg:tt)*) => {{
        #[cfg(feature="debug")]
        eprintln!(concat!("{} ", "\x1b[1m\x1b[38:5:15mINFO\x1b[39m  | \x1b[22m\x1b[38:5:7m", $base, "\x1b[39m"), $crate::timestamp::now(), $($arg)*);
    }};
}

#[macro_export]
macro_rules! warn {
    ($base:tt) => {{
        eprintln!("\x1b[1m\x1b[38:5:11mWARN\x1b[39m  | \x1b[22m\x1b[38:5:228m{}\x1b[39m", $base);
    }};
    ($base:tt, $($arg:tt)*) => {{
        eprintln!(concat!("\x1b[1m\x1b[38:5:11mWARN\x1b[39m  | \x1b[22m\x1b[38:5:228m", $base, "\x1b[39m"), $($arg)*);
    }};
}

#[macro_export]
macro_rules! error {
    ($base:tt) => {{
        eprintln!("\x1b[1m\x1b[38:5:9mERROR\x1b[39m | \x1b[22m\x1b[38:5:160m{}\x1b[39m", $base);
    }};
    ($base:tt, $($arg:tt)*) => {{
        eprintln!(concat!("\x1b[1m\x1b[38:5:9mERROR\x1b[39m | \x1b[22m\x1b[38:5:160m", $base, "\x1b[39m"), $($arg)*);
    }};
}
