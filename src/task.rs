//! # Task model
//!
//! A task is split into two halves, matching who owns what:
//!
//! - [`TaskDescriptor`] is the immutable-at-runtime half, produced entirely
//!   at build time by [`crate::task_define`] and [`crate::tasks_init`]. It
//!   lives in `.rodata` as part of a `'static` slice.
//! - [`TaskControl`] is the mutable half — `sp` and `wakeup_time` — held in
//!   a parallel, index-aligned array owned exclusively by the scheduler.
//!
//! Application code constructs descriptors via the macros; it never
//! touches `TaskControl` directly.

use crate::config::SLEEP_SENTINEL;

/// A task entry point. Opaque arguments are passed as `usize` rather than
/// raw pointers so `task_define!` can build a `TaskDescriptor` as a plain
/// `const` value without casting pointers in a `static` initializer.
pub type TaskEntry = extern "C" fn(usize, usize, usize) -> !;

/// Immutable, build-time task record.
#[derive(Clone, Copy)]
pub struct TaskDescriptor {
    pub entry: TaskEntry,
    pub arg1: usize,
    pub arg2: usize,
    pub arg3: usize,
    /// Larger is higher priority; 0 is reserved for the idle task.
    pub priority: u8,
    pub stack_size: usize,
    /// One-past-the-end of this task's stack region (stacks grow down).
    pub stack_top: *mut u8,
}

// Descriptors are read-only after link time and only ever read from a
// single core; the raw pointer field is the sole reason `Sync` isn't
// automatic.
unsafe impl Sync for TaskDescriptor {}

impl TaskDescriptor {
    pub const fn new(
        entry: TaskEntry,
        arg1: usize,
        arg2: usize,
        arg3: usize,
        priority: u8,
        stack_size: usize,
        stack_top: *mut u8,
    ) -> Self {
        Self {
            entry,
            arg1,
            arg2,
            arg3,
            priority,
            stack_size,
            stack_top,
        }
    }
}

/// Mutable per-task scheduler bookkeeping, index-aligned with the
/// `TaskDescriptor` table the scheduler was built from.
#[derive(Clone, Copy)]
pub struct TaskControl {
    /// Saved stack pointer when not running; undefined while `RUNNING`.
    pub sp: *mut u32,
    /// Tick value at which a sleeping task becomes eligible, or
    /// [`SLEEP_SENTINEL`] when the task isn't sleeping.
    pub wakeup_time: u64,
}

unsafe impl Sync for TaskControl {}
unsafe impl Send for TaskControl {}

impl TaskControl {
    pub const EMPTY: Self = Self {
        sp: core::ptr::null_mut(),
        wakeup_time: SLEEP_SENTINEL,
    };
}

/// Declares one task: its entry point, arguments, priority, and a
/// dedicated static stack. Expands to a module named `$name` exposing
/// `DESCRIPTOR: TaskDescriptor`.
#[macro_export]
macro_rules! task_define {
    ($name:ident, $entry:expr, $arg1:expr, $arg2:expr, $arg3:expr, $priority:expr, $stack_size:expr) => {
        #[allow(non_snake_case)]
        pub mod $name {
            #[repr(align(8))]
            struct Stack([u8; $stack_size]);

            static mut STACK: Stack = Stack([0; $stack_size]);

            pub static DESCRIPTOR: $crate::task::TaskDescriptor = {
                // SAFETY: taking the address of a `static mut` is a valid
                // constant expression; no reference to it is ever formed.
                let base = unsafe { core::ptr::addr_of_mut!(STACK.0) } as *mut u8;
                let stack_top = unsafe { base.add($stack_size) };
                $crate::task::TaskDescriptor::new(
                    $entry,
                    $arg1,
                    $arg2,
                    $arg3,
                    $priority,
                    $stack_size,
                    stack_top,
                )
            };
        }
    };
}

/// Declares the task table, appending the idle task automatically. The
/// idle task may be overridden with `; idle = path::to::module`, provided
/// the replacement preserves priority 0 and the never-returns contract.
#[macro_export]
macro_rules! tasks_init {
    ( $( $task:path ),+ $(,)? ) => {
        $crate::tasks_init!( $( $task ),+ ; idle = $crate::task::idle );
    };
    ( $( $task:path ),+ $(,)? ; idle = $idle:path ) => {
        pub static TASKS: &[$crate::task::TaskDescriptor] = &[
            $( $task::DESCRIPTOR, )+
            $idle::DESCRIPTOR,
        ];
    };
}

/// Fallback link-register target for a task whose `entry` returns despite
/// the `-> !` contract at the ABI boundary (the function pointer is type
/// erased for C-ABI compatibility with `task_define!`, so the type system
/// alone can't prevent it). Traps forever per the documented failure
/// semantics: the task's stack frame is already consumed, so there is
/// nothing to recover.
pub extern "C" fn task_exit() -> ! {
    loop {
        crate::arch::halt_forever();
    }
}

/// The mandatory, lowest-priority task. Always `READY` when not
/// `RUNNING`; its body waits for the next interrupt.
pub mod idle {
    use super::TaskDescriptor;
    use crate::config::IDLE_STACK_SIZE;

    #[repr(align(8))]
    struct Stack([u8; IDLE_STACK_SIZE]);

    static mut STACK: Stack = Stack([0; IDLE_STACK_SIZE]);

    pub static DESCRIPTOR: TaskDescriptor = {
        let base = unsafe { core::ptr::addr_of_mut!(STACK.0) } as *mut u8;
        let stack_top = unsafe { base.add(IDLE_STACK_SIZE) };
        TaskDescriptor::new(entry, 0, 0, 0, 0, IDLE_STACK_SIZE, stack_top)
    };

    pub extern "C" fn entry(_a1: usize, _a2: usize, _a3: usize) -> ! {
        loop {
            crate::arch::idle_wait();
        }
    }
}
