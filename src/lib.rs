//! # micros
//!
//! A preemptive, priority-based cooperative micro-kernel for a
//! single-core ARMv8-M (Cortex-M33) microcontroller. It multiplexes up
//! to 32 statically declared tasks onto one CPU using a periodic tick
//! interrupt and a deferred context-switch interrupt (PendSV).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                   │
//! │      scheduler_start() · r#yield() · sleep()             │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Task model        │  Sync primitives  │
//! │  scheduler.rs│   task.rs           │  sync.rs          │
//! │  ─ tick()    │   ─ TaskDescriptor  │  ─ critical_section│
//! │  ─ yield_now │   ─ TaskControl     │                   │
//! │  ─ sleep()   │                     │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │            Arch port (arch/cortex_m33.rs)                │
//! │    PendSV · SysTick · Context switch · Stack init        │
//! ├────────────────────────────────────────────────────────┤
//! │          ARMv8-M Mainline hardware (Cortex-M33)           │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Task state machine
//!
//! Each task is in exactly one of `READY`, `PENDING`, `RUNNING`, or
//! `EJECTED`; `NEXT` is an overlay marking a chosen successor awaiting
//! context switch. State is encoded as five 32-bit bitmasks, bit
//! `31 - task_number` per task, so count-leading-zeros selects the
//! lowest-numbered member of a mask in O(1) — see [`scheduler`].
//!
//! ## Memory model
//!
//! - No heap, no `alloc`: every task's stack and control block is a
//!   `'static` value produced by [`task_define!`] / [`tasks_init!`].
//! - Critical sections (`cortex_m::interrupt::free`) guard the only
//!   field task context writes that the tick interrupt can also touch.
//!
//! `#[cfg(test)]` unit tests exercise the scheduler's bitmask logic on
//! the host — the naked PendSV/SysTick handlers in [`arch::cortex_m33`]
//! only build for `target_arch = "arm"` and are outside the host test
//! surface; run `cargo test --lib`.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod diag;
pub mod error;
pub mod kernel;
pub mod scheduler;
pub mod sync;
pub mod task;
