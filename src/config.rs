//! # Kernel configuration
//!
//! Compile-time constants governing task limits, stack sizing, and the
//! scheduler tick rate. All limits are fixed at compile time — no dynamic
//! allocation.

/// Maximum number of tasks the system can manage, idle task included.
/// This bounds the static task-control array; registering more than this
/// many tasks (counting the auto-appended idle task) is rejected at
/// bootstrap.
pub const MAX_TASKS: usize = 32;

/// Maximum number of application-defined tasks. One slot of `MAX_TASKS`
/// is always reserved for the idle task.
pub const MAX_USER_TASKS: usize = MAX_TASKS - 1;

/// SysTick frequency in Hz. Determines scheduler tick granularity; the
/// bootstrap path programs the tick source with a matching 1 ms period.
pub const TICK_HZ: u32 = 1000;

/// Per-task stack size in bytes for application tasks. Must be large
/// enough for the deepest call chain plus the hardware exception frame
/// (32 bytes) and the software-saved context (32 bytes for R4-R11).
pub const TASK_STACK_SIZE: usize = 1024;

/// Stack size in bytes for the idle task. Its body is a `wfi` loop with
/// no call depth to speak of, so it gets a much smaller region than
/// application tasks.
pub const IDLE_STACK_SIZE: usize = 256;

/// System clock frequency in Hz, used to compute the SysTick reload
/// value for a 1 ms tick.
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Reserved `wakeup_time` value meaning "this task is not sleeping".
pub const SLEEP_SENTINEL: u64 = u64::MAX;
