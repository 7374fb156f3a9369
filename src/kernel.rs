//! # Kernel
//!
//! Top-level bootstrap and the public application-facing API:
//! `scheduler_start`, `r#yield`, `sleep`. Owns the global scheduler
//! singleton and the concurrency discipline around it — the bitmask
//! state machine in [`crate::scheduler`] itself has no knowledge of
//! interrupts or critical sections.
//!
//! ## Startup sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         └─► kernel::scheduler_start(TASKS, peripherals)
//!               ├─► Scheduler::init()          (per-task stack frames)
//!               ├─► ctxswitch_init()            (PendSV priority)
//!               ├─► tick_init(1ms, on_tick)     (SysTick priority + start)
//!               ├─► dsb/isb
//!               └─► start_first_task()          (never returns)
//! ```

use crate::arch::{ArchPort, CorePeripherals};
use crate::config::TICK_HZ;
use crate::diag::log_error;
use crate::error::Error;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::TaskDescriptor;

#[cfg(target_arch = "arm")]
type Port = crate::arch::Cortex_M33;
#[cfg(not(target_arch = "arm"))]
type Port = crate::arch::HostArch;

/// Global scheduler instance. Lives for the program's lifetime once
/// `scheduler_start` installs it; there is exactly one, matching the
/// single-core model.
static mut SCHEDULER: Scheduler<Port> = Scheduler::new(&[]);

/// Raw pointer to the global scheduler, used by interrupt handlers that
/// cannot hold a checked borrow across the task/ISR boundary.
static mut SCHEDULER_PTR: *mut Scheduler<Port> = core::ptr::null_mut();

/// # Safety
/// Only valid after [`scheduler_start`] has installed the pointer.
pub(crate) unsafe fn scheduler_ptr() -> *mut Scheduler<Port> {
    SCHEDULER_PTR
}

/// Starts the scheduler. Does not return on success — the function only
/// returns if bootstrap validation fails.
///
/// # Safety
/// Must be called exactly once, from `main`, with ownership of the core
/// peripherals, before any task runs.
pub fn scheduler_start(tasks: &'static [TaskDescriptor], core_peripherals: CorePeripherals) -> Error {
    let _ = core_peripherals;

    // SAFETY: single call site, before any interrupt that could touch
    // SCHEDULER has been enabled.
    unsafe {
        SCHEDULER = Scheduler::new(tasks);
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
    }

    let init_result = unsafe { (*scheduler_ptr()).init() };
    if let Err(e) = init_result {
        log_error!("scheduler_start: {}", e);
        return e;
    }

    if let Err(e) = Port::ctxswitch_init() {
        log_error!("scheduler_start: {}", e);
        return e;
    }

    let ms_per_tick = 1000 / TICK_HZ;
    if let Err(e) = Port::tick_init(ms_per_tick, tick_callback) {
        log_error!("scheduler_start: {}", e);
        return e;
    }

    crate::arch::sync_barriers();

    let first_sp = unsafe { (*scheduler_ptr()).sp_of(0) };
    unsafe { Port::start_first_task(first_sp) }
}

#[cfg(target_arch = "arm")]
fn tick_callback() {
    crate::arch::cortex_m33::on_tick();
}

#[cfg(not(target_arch = "arm"))]
fn tick_callback() {}

/// Voluntarily relinquish the CPU. May or may not context-switch;
/// returns once this task is next dispatched.
///
/// The trigger is raised from inside the same critical section that sets
/// `NEXT` — if it were raised after, a tick interrupting the gap could
/// overwrite `NEXT` with its own preemption decision before PendSV ever
/// consumed this one.
pub fn r#yield() {
    sync::critical_section(|| {
        let switched = unsafe { (*scheduler_ptr()).yield_now() };
        if switched.is_some() {
            Port::ctxswitch_trigger();
        }
    });
}

/// Sleep for at least `ms` milliseconds (worst case `ms` plus one tick).
pub fn sleep(ms: u32) {
    let wake_at = Port::tick_get() + ms as u64;
    sync::critical_section(|| {
        let switched = unsafe { (*scheduler_ptr()).sleep_current(wake_at) };
        if switched.is_some() {
            Port::ctxswitch_trigger();
        }
    });
}
