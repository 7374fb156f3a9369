//! # Demo firmware
//!
//! Three tasks at distinct priorities plus the implicit idle task,
//! demonstrating priority-preemptive scheduling and sleep/wake:
//!
//! | Task | Priority | Behavior |
//! |------|----------|----------|
//! | `high_prio_task` | 3 | Sleeps most of the time, preempts on wake |
//! | `worker_task` | 2 | Does a slice of work, yields cooperatively |
//! | `background_task` | 1 | Busy loop, runs only when nothing else is ready |
//!
//! `high_prio_task` sleeps for 200 ticks at a time; every time it wakes
//! it preempts whichever of `worker_task`/`background_task`/idle is
//! running, does a short burst, and sleeps again.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt_rtt as _;
use panic_probe as _;

use micros::{kernel, task_define, tasks_init};

task_define!(high_prio, high_prio_task, 0, 0, 0, 3, 1024);
task_define!(worker, worker_task, 0, 0, 0, 2, 1024);
task_define!(background, background_task, 0, 0, 0, 1, 1024);

tasks_init!(high_prio, worker, background);

extern "C" fn high_prio_task(_a1: usize, _a2: usize, _a3: usize) -> ! {
    loop {
        let mut _work: u32 = 0;
        for _ in 0..1000 {
            _work = _work.wrapping_add(1);
        }
        kernel::sleep(200);
    }
}

extern "C" fn worker_task(_a1: usize, _a2: usize, _a3: usize) -> ! {
    loop {
        let mut _work: u32 = 0;
        for _ in 0..5000 {
            _work = _work.wrapping_add(1);
        }
        kernel::r#yield();
    }
}

extern "C" fn background_task(_a1: usize, _a2: usize, _a3: usize) -> ! {
    let mut _counter: u32 = 0;
    loop {
        _counter = _counter.wrapping_add(1);
    }
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    let err = kernel::scheduler_start(TASKS, cp);
    defmt::error!("scheduler_start returned: {}", err);
    loop {
        cortex_m::asm::wfi();
    }
}
