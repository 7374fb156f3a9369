//! # Host test double
//!
//! Implements [`ArchPort`] with inert stand-ins so the scheduler (generic
//! over the port) can be instantiated and unit tested on the host target,
//! where naked Cortex-M asm and the SysTick/NVIC registers don't exist.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::ArchPort;
use crate::error::Error;
use crate::task::TaskEntry;

/// A test-only, in-process stand-in for the real Cortex-M33 port.
pub struct HostArch;

/// Monotonic tick counter backing [`HostArch::tick_get`]. Scheduler logic
/// under test drives ticks explicitly via [`HostArch::set_tick`] rather
/// than relying on this counter, since tests run concurrently on a shared
/// process and a single global counter would make them interfere with
/// each other.
static TICK: AtomicU64 = AtomicU64::new(0);

impl HostArch {
    /// Test helper: pin the value `tick_get` returns.
    pub fn set_tick(value: u64) {
        TICK.store(value, Ordering::Relaxed);
    }
}

impl ArchPort for HostArch {
    unsafe fn task_stack_init(
        stack_top: *mut u8,
        stack_size: usize,
        entry: TaskEntry,
        arg1: usize,
        arg2: usize,
        arg3: usize,
    ) -> *mut u32 {
        // No real register frame to synthesize off-target; write a
        // recognizable word so tests can assert initialization ran at
        // all, and keep the arguments alive in case a test wants to
        // invoke `entry` directly.
        let _ = (entry, arg1, arg2, arg3);
        let aligned_top = (stack_top as usize) & !0x07;
        let frame = (aligned_top - 16 * core::mem::size_of::<u32>()) as *mut u32;
        debug_assert!(stack_size >= 16 * core::mem::size_of::<u32>());
        frame
    }

    fn tick_init(_ms: u32, _callback: super::TickCallback) -> Result<(), Error> {
        Ok(())
    }

    fn tick_get() -> u64 {
        TICK.load(Ordering::Relaxed)
    }

    fn busy_sleep(_us: u32) {}

    fn ctxswitch_init() -> Result<(), Error> {
        Ok(())
    }

    fn ctxswitch_trigger() {}

    unsafe fn start_first_task(_sp: *mut u32) -> ! {
        unreachable!("start_first_task is never exercised on the host")
    }
}
