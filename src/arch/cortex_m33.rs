//! # Cortex-M33 port
//!
//! Hardware-specific code for single-core ARMv8-M Mainline. Implements
//! context switching via PendSV, SysTick tick generation, and the
//! interrupt-priority handshake between the two.
//!
//! ## Context switch mechanism
//!
//! Cortex-M splits the stack in two: MSP (main stack, used by the kernel
//! and exception handlers before PSP is adopted) and PSP (process stack,
//! used by tasks in Thread mode). On exception entry the hardware
//! automatically stacks `{r0-r3, r12, lr, pc, xpsr}` onto the active
//! stack; PendSV manually saves and restores `{r4-r11}`, completing the
//! full register file.
//!
//! ## Interrupt priorities
//!
//! SysTick is programmed strictly higher priority than PendSV (lower
//! numeric value), so the tick can always preempt an in-progress context
//! switch, and a context switch can never interleave with itself.

use core::arch::asm;
use core::sync::atomic::{AtomicPtr, Ordering};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SCB;

use crate::arch::{ArchPort, TickCallback};
use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::diag::{log_debug, log_trace};
use crate::error::Error;
use crate::task::TaskEntry;

/// SysTick priority. Numerically lower is higher priority on Cortex-M;
/// this sits above PendSV so the tick always wins contention between the
/// two.
const SYSTICK_PRIORITY: u8 = 0xF0;

/// PendSV priority: the lowest in the system, per §5 — the context
/// switch must never preempt application interrupts and must always
/// yield to the tick.
const PENDSV_PRIORITY: u8 = 0xFF;

/// Tick callback stashed by `tick_init`, invoked from `SysTick`.
static TICK_CALLBACK: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

pub struct Cortex_M33;

impl ArchPort for Cortex_M33 {
    unsafe fn task_stack_init(
        stack_top: *mut u8,
        stack_size: usize,
        entry: TaskEntry,
        arg1: usize,
        arg2: usize,
        arg3: usize,
    ) -> *mut u32 {
        debug_assert!(stack_size >= 16 * core::mem::size_of::<u32>());
        let top = stack_top as usize & !0x07;
        let frame_ptr = (top - 16 * core::mem::size_of::<u32>()) as *mut u32;

        // Software-saved context (R4-R11), bottom of the frame.
        for i in 0..8 {
            *frame_ptr.add(i) = 0;
        }

        // Hardware-stacked exception frame.
        *frame_ptr.add(8) = arg1 as u32; // R0
        *frame_ptr.add(9) = arg2 as u32; // R1
        *frame_ptr.add(10) = arg3 as u32; // R2
        *frame_ptr.add(11) = 0; // R3
        *frame_ptr.add(12) = 0; // R12
        *frame_ptr.add(13) = crate::task::task_exit as usize as u32; // LR
        *frame_ptr.add(14) = entry as usize as u32; // PC
        *frame_ptr.add(15) = 0x0100_0000; // xPSR, Thumb bit set

        frame_ptr
    }

    fn tick_init(ms: u32, callback: TickCallback) -> Result<(), Error> {
        if ms == 0 {
            return Err(Error::TickInitFailed);
        }
        TICK_CALLBACK.store(callback as *mut (), Ordering::Release);
        // SAFETY: SysTick is exclusively owned by the kernel after
        // bootstrap; cortex_m::Peripherals::take() upholds that.
        let mut syst = unsafe { cortex_m::Peripherals::steal().SYST };
        let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
        syst.set_reload(reload);
        syst.clear_current();
        syst.set_clock_source(SystClkSource::Core);
        set_priorities();
        syst.enable_counter();
        syst.enable_interrupt();
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        Ok(())
    }

    fn tick_get() -> u64 {
        TICKS.load(Ordering::Relaxed)
    }

    fn busy_sleep(us: u32) {
        // Calibrated against SYSTEM_CLOCK_HZ assuming ~4 cycles/iteration;
        // adequate for diagnostic bring-up delays, not precision timing.
        let cycles = (SYSTEM_CLOCK_HZ / 1_000_000) * us;
        cortex_m::asm::delay(cycles.max(1));
    }

    fn ctxswitch_init() -> Result<(), Error> {
        // Priorities are set together with the tick in `tick_init` so the
        // "strictly lower than tick" relationship is established before
        // either interrupt can fire. Calling this independently (without
        // `tick_init` having run) would race a possibly-unset SysTick
        // priority, so require that ordering at the call site instead of
        // re-deriving it here.
        set_priorities();
        Ok(())
    }

    fn ctxswitch_trigger() {
        SCB::set_pendsv();
    }

    unsafe fn start_first_task(sp: *mut u32) -> ! {
        asm!(
            "adds r0, #32",
            "msr psp, r0",
            "movs r0, #2",
            "msr control, r0",
            "isb",
            "pop {{r0-r3, r12}}",
            "pop {{r4}}",
            "pop {{r5}}",
            "pop {{r6}}",
            "cpsie i",
            "bx r5",
            in("r0") sp,
            options(noreturn)
        );
    }
}

static TICKS: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(0);

fn set_priorities() {
    unsafe {
        let mut scb = cortex_m::Peripherals::steal().SCB;
        scb.set_priority(cortex_m::peripheral::scb::SystemHandler::SysTick, SYSTICK_PRIORITY);
        scb.set_priority(cortex_m::peripheral::scb::SystemHandler::PendSV, PENDSV_PRIORITY);
    }
}

/// PendSV exception handler — performs the context switch.
///
/// # Safety
/// Naked; called directly by the NVIC and must follow the exact
/// ARMv8-M exception entry/exit convention.
#[no_mangle]
#[naked]
pub unsafe extern "C" fn PendSV() {
    asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}",
        "bl {dispatch}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save_context = sym micros_save_context,
        dispatch = sym micros_dispatch,
        options(noreturn)
    );
}

/// Stores the interrupted stack pointer into the current task's slot and
/// moves `RUNNING` to `EJECTED`. Called from naked `PendSV` asm.
///
/// # Safety
/// Called from assembly with interrupts already serialized by exception
/// priority; the scheduler pointer must have been installed by bootstrap.
#[no_mangle]
unsafe extern "C" fn micros_save_context(psp: *mut u32) {
    (*crate::kernel::scheduler_ptr()).save_current_sp(psp);
}

/// Performs the masked `NEXT -> RUNNING` edit and returns the new stack
/// pointer. Called from naked `PendSV` asm.
///
/// # Safety
/// Called from assembly context.
#[no_mangle]
unsafe extern "C" fn micros_dispatch() -> *mut u32 {
    cortex_m::interrupt::free(|_| (*crate::kernel::scheduler_ptr()).dispatch_next())
}

/// SysTick exception handler — the scheduler's tick entry point.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    log_trace!("tick");
    let callback = TICK_CALLBACK.load(Ordering::Acquire);
    if !callback.is_null() {
        let callback: TickCallback = core::mem::transmute(callback);
        callback();
    }
}

/// Invoked by [`crate::kernel::scheduler_start`] as the tick callback;
/// advances the scheduler and, if it decided to switch, raises PendSV.
pub fn on_tick() {
    let now = Cortex_M33::tick_get();
    let switched = unsafe { (*crate::kernel::scheduler_ptr()).tick(now) };
    if switched {
        log_debug!("preempting");
        Cortex_M33::ctxswitch_trigger();
    }
}
