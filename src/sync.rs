//! # Synchronization primitives
//!
//! Interrupt-safe critical-section abstraction. The scheduler's state
//! vectors are shared between task context and two interrupt contexts;
//! [`critical_section`] is the single path callers use to mask the tick
//! interrupt around a multi-field edit, so the borrow checker only ever
//! has to reason about one mutable path into the scheduler singleton.
//!
//! Off-target (host unit tests) there is no real interrupt to mask and
//! no `critical-section` backend registered for the host triple, so this
//! degrades to a plain call — tests are single-threaded with respect to
//! the scheduler under test.

/// Execute a closure with interrupts disabled, restoring the previous
/// state on exit.
///
/// Only `yield`/`sleep` (task context) need this — the tick and
/// context-switch interrupt handlers are already mutually serialized by
/// hardware priority and don't call this.
#[cfg(target_arch = "arm")]
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    cortex_m::interrupt::free(|_| f())
}

#[cfg(not(target_arch = "arm"))]
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}
