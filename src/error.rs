//! # Error model
//!
//! The scheduler cannot fail once started; every failure mode is confined
//! to bootstrap. This mirrors the kernel's own failure semantics: no
//! retries, no propagation from interrupt context back into task code.

/// Reasons [`crate::kernel::scheduler_start`] can fail to start the
/// scheduler. Returned, never panicked on — bootstrap failure is a
/// reportable condition, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The task table (idle task included) exceeds [`crate::config::MAX_TASKS`].
    TooManyTasks,
    /// The architecture port rejected tick-source initialization.
    TickInitFailed,
    /// The architecture port rejected context-switch initialization.
    CtxSwitchInitFailed,
}

#[cfg(target_arch = "arm")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::TooManyTasks => defmt::write!(fmt, "TooManyTasks"),
            Error::TickInitFailed => defmt::write!(fmt, "TickInitFailed"),
            Error::CtxSwitchInitFailed => defmt::write!(fmt, "CtxSwitchInitFailed"),
        }
    }
}
