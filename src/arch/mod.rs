//! # Architecture abstraction layer
//!
//! Provides the hardware boundary the scheduler consumes: tick source,
//! context-switch trigger, and stack-frame synthesis. Pure mechanism; no
//! scheduling policy lives here.
//!
//! [`count_leading_zeros`] is the one piece of "mechanism" with zero
//! hardware dependency — `u32::leading_zeros` already compiles to the
//! Cortex-M `clz` instruction via LLVM, so there is nothing architecture
//! port gains by indirecting it, and keeping it a free function lets the
//! scheduler's task-selection logic run identically on the host.
//!
//! Everything else is behind [`ArchPort`], implemented once for real by
//! [`cortex_m33::Cortex_M33`] and, for the test suite, by
//! [`host::HostArch`] — `cargo test` cannot execute naked Cortex-M asm, so
//! the scheduler is generic over the port instead of hard-wired to it.

use crate::error::Error;
use crate::task::TaskEntry;

#[cfg(target_arch = "arm")]
pub mod cortex_m33;

#[cfg(not(target_arch = "arm"))]
pub mod host;

#[cfg(target_arch = "arm")]
pub use cortex_m33::Cortex_M33;

#[cfg(not(target_arch = "arm"))]
pub use host::HostArch;

/// Count leading zero bits; 32 when the input is zero. Used to pick the
/// lowest-numbered set bit in a task-state bitmask (MSB = task 0).
#[inline]
pub fn count_leading_zeros(mask: u32) -> u32 {
    mask.leading_zeros()
}

/// Wait for the next interrupt. Used by the idle task's loop body.
#[cfg(target_arch = "arm")]
#[inline]
pub fn idle_wait() {
    cortex_m::asm::wfi();
}

#[cfg(not(target_arch = "arm"))]
#[inline]
pub fn idle_wait() {
    core::hint::spin_loop();
}

/// Used by the task-return trap sink; never returns.
#[cfg(target_arch = "arm")]
#[inline]
pub fn halt_forever() {
    cortex_m::asm::wfi();
}

#[cfg(not(target_arch = "arm"))]
#[inline]
pub fn halt_forever() {
    core::hint::spin_loop();
}

/// Instruction- and data-synchronization barriers, issued once after
/// bootstrap programs the tick/context-switch priorities, per §5.
#[cfg(target_arch = "arm")]
#[inline]
pub fn sync_barriers() {
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

#[cfg(not(target_arch = "arm"))]
#[inline]
pub fn sync_barriers() {}

/// Ownership token required to start the scheduler, matching the
/// precondition that the tick source (SysTick) is available and not
/// already claimed. On the host this is an inert placeholder since there
/// are no real peripherals to own.
#[cfg(target_arch = "arm")]
pub type CorePeripherals = cortex_m::Peripherals;

#[cfg(not(target_arch = "arm"))]
pub struct CorePeripherals;

/// Callback the architecture port invokes from tick-interrupt context.
pub type TickCallback = fn();

/// Capability interface a board support port must implement for the
/// scheduler to run on it.
pub trait ArchPort {
    /// Pre-populate `stack_top`'s region so that restoring this frame
    /// starts executing `entry(arg1, arg2, arg3)`. Returns the resulting
    /// stack pointer.
    ///
    /// # Safety
    /// `stack_top` must point one-past-the-end of a region at least
    /// `stack_size` bytes, exclusively owned by the caller.
    unsafe fn task_stack_init(
        stack_top: *mut u8,
        stack_size: usize,
        entry: TaskEntry,
        arg1: usize,
        arg2: usize,
        arg3: usize,
    ) -> *mut u32;

    /// Install a periodic tick at `ms` milliseconds, invoking `callback`
    /// from tick-interrupt context.
    fn tick_init(ms: u32, callback: TickCallback) -> Result<(), Error>;

    /// Monotonic tick count since boot.
    fn tick_get() -> u64;

    /// Blocking delay without yielding, for diagnostics/bring-up use.
    fn busy_sleep(us: u32);

    /// Configure the context-switch software interrupt at a priority
    /// strictly lower than the tick interrupt.
    fn ctxswitch_init() -> Result<(), Error>;

    /// Request a context switch at the earliest opportunity.
    fn ctxswitch_trigger();

    /// Switch onto `sp` and branch into Thread mode, never returning.
    /// Used exactly once, by bootstrap, to launch task 0.
    ///
    /// # Safety
    /// `sp` must be a stack pointer produced by `task_stack_init`.
    unsafe fn start_first_task(sp: *mut u32) -> !;
}
