//! # Diagnostics
//!
//! Thin wrappers around `defmt`'s logging macros. On the real target these
//! forward straight to `defmt`, transported over RTT by `defmt-rtt` and
//! decoded host-side by a probe. Off-target (host unit tests) they compile
//! to nothing: `defmt`'s macros require a `#[defmt::global_logger]`, which
//! only `defmt-rtt` provides, and that logger only links against real
//! hardware. Gating on `target_arch` keeps the scheduler's pure logic
//! testable on the host without dragging a logger into the test binary.

#[cfg(target_arch = "arm")]
macro_rules! log_error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[cfg(not(target_arch = "arm"))]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}

#[cfg(target_arch = "arm")]
macro_rules! log_debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(not(target_arch = "arm"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(target_arch = "arm")]
macro_rules! log_trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

#[cfg(not(target_arch = "arm"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_trace;
