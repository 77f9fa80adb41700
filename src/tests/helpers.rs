//! Test helper utilities and common functionality.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::arch::sim::{Machine, SimArch};
use crate::mem::ThreadStack;
use crate::sched::{Scheduler, ThreadTable};
use crate::thread::ThreadId;

/// Words per test stack.
pub(crate) const TEST_STACK_WORDS: usize = 128;

pub(crate) fn leak_table<const N: usize>() -> &'static ThreadTable<N> {
    Box::leak(Box::new(ThreadTable::new()))
}

pub(crate) fn leak_stack<const W: usize>() -> &'static ThreadStack<W> {
    Box::leak(Box::new(ThreadStack::new()))
}

pub(crate) fn worker_a() -> ! {
    loop {
        let _ = core::hint::black_box(0xA_u32);
    }
}

pub(crate) fn worker_b() -> ! {
    loop {
        let _ = core::hint::black_box(0xB_u32);
    }
}

pub(crate) fn worker_c() -> ! {
    loop {
        let _ = core::hint::black_box(0xC_u32);
    }
}

pub(crate) const WORKERS: [fn() -> !; 3] = [worker_a, worker_b, worker_c];

/// A thread table, a scheduler and a machine to run them on.
pub(crate) struct Rig<const N: usize> {
    pub(crate) table: &'static ThreadTable<N>,
    pub(crate) stacks: Vec<&'static ThreadStack<TEST_STACK_WORDS>>,
    pub(crate) ids: Vec<ThreadId>,
    pub(crate) sched: Scheduler,
    pub(crate) machine: Machine,
}

impl<const N: usize> Rig<N> {
    /// `count` threads spawned in order, not linked.
    pub(crate) fn spawned(count: usize) -> Self {
        let table = leak_table::<N>();
        let mut stacks = Vec::new();
        let mut ids = Vec::new();
        for i in 0..count {
            let stack = leak_stack::<TEST_STACK_WORDS>();
            let id = table
                .spawn(stack, WORKERS[i % WORKERS.len()])
                .expect("Failed to spawn thread");
            stacks.push(stack);
            ids.push(id);
        }
        Self {
            table,
            stacks,
            ids,
            sched: Scheduler::new(),
            machine: Machine::new(),
        }
    }

    /// `count` threads linked 0 -> 1 -> ... -> count-1 -> 0.
    pub(crate) fn ring(count: usize) -> Self {
        let rig = Self::spawned(count);
        rig.table.link_in_order().expect("Failed to link ring");
        rig
    }

    /// Start the scheduler at `first`, leaving the first switch armed.
    pub(crate) fn start(&mut self, first: ThreadId) {
        self.sched
            .start::<SimArch, N>(self.table, first)
            .expect("Failed to start scheduler");
    }

    /// Start at `first` and take the first switch, as happens on hardware
    /// when interrupts are already enabled.
    pub(crate) fn launch(&mut self, first: ThreadId) {
        self.start(first);
        assert!(self.machine.service_pending_switch(&self.sched));
    }

    pub(crate) fn tick(&mut self) {
        self.machine.systick(&self.sched);
    }

    pub(crate) fn current(&self) -> Option<ThreadId> {
        self.sched.current_thread()
    }
}

/// Simple linear congruential generator for property testing.
pub(crate) struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    pub(crate) fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + (self.next_u64() % (max - min))
    }
}
