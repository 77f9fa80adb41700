#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Bare-metal preemptive round-robin threads for ARMv7-M.
//!
//! A fixed set of threads, declared statically, takes turns on a single
//! Cortex-M3/M4/M7 core. Each SysTick interrupt selects the next thread on
//! the ring and pends PendSV; PendSV saves r4-r11 of the outgoing thread,
//! swaps the process stack pointer and restores r4-r11 of the incoming one.
//! Nothing is allocated, threads have no priorities and never block.
//!
//! # Features
//!
//! - `handlers`: export the `SysTick` and `PendSV` exception handlers (default)
//! - `semihosting`: console sink over ARM semihosting
//! - `std-shim`: host-side exception model for testing off-target
//!
//! # Quick Start
//!
//! ```ignore
//! use rr_threads::{arch, ThreadStack, ThreadTable, TickConfig, SCHEDULER};
//!
//! static THREADS: ThreadTable<2> = ThreadTable::new();
//! static STACK_A: ThreadStack<256> = ThreadStack::new();
//! static STACK_B: ThreadStack<256> = ThreadStack::new();
//!
//! fn worker_a() -> ! { loop { /* thread work */ } }
//! fn worker_b() -> ! { loop { /* thread work */ } }
//!
//! fn main() -> ! {
//!     let mut cp = cortex_m::Peripherals::take().unwrap();
//!     let a = THREADS.spawn(&STACK_A, worker_a).unwrap();
//!     THREADS.spawn(&STACK_B, worker_b).unwrap();
//!     THREADS.link_in_order().unwrap();
//!
//!     rr_threads::configure_tick(&mut cp.SYST, &mut cp.SCB, &TickConfig::new(12_000_000, 1_000))
//!         .unwrap();
//!     SCHEDULER.start::<arch::DefaultArch, 2>(&THREADS, a).unwrap();
//!     arch::idle()
//! }
//! ```

pub mod arch;
pub mod config;
pub mod errors;
pub mod mem;
pub mod sched;
pub mod thread;

#[cfg(test)]
extern crate alloc;

#[cfg(test)]
mod tests;

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{idle, Arch, DefaultArch};

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use arch::armv7m::configure_tick;

// Configuration
pub use config::TickConfig;

// Scheduler
pub use sched::{Scheduler, ThreadTable, SCHEDULER};

// Threads
pub use thread::{initialize_thread, ContextFrame, ThreadDescriptor, ThreadId};

// Memory
pub use mem::ThreadStack;

// Errors
pub use errors::{ScheduleError, SpawnError, ThreadError, ThreadResult, TimerError};

/// Thread currently running on the global scheduler.
///
/// Called from thread code this names the caller; it is `None` before the
/// first context switch.
#[inline]
pub fn current_thread() -> Option<ThreadId> {
    SCHEDULER.current_thread()
}
