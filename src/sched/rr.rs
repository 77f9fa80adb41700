//! Round-robin scheduling pointers, tick dispatch and the switch bookkeeping.
//!
//! # Synchronization
//!
//! `current` and `pending_next` are shared between the tick handler, the
//! context switch handler and (read-only) thread code. There is no lock.
//! Exclusion comes from exception priorities on a single core:
//!
//! - the tick handler is the only writer of `pending_next` once started, and
//!   runs to completion before the switch handler can begin;
//! - the switch handler is the only writer of `current`, and cannot be
//!   re-entered: a switch requested while one runs is taken afterwards;
//! - both pointers are word-sized, so no reader ever sees a torn value.

use portable_atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};

use super::table::ThreadTable;
use crate::arch::Arch;
use crate::errors::{ScheduleError, ThreadResult};
use crate::kprintln;
use crate::thread::{ThreadDescriptor, ThreadId};

/// The scheduler instance driven by the exception handlers.
pub static SCHEDULER: Scheduler = Scheduler::new();

/// Byte offset of `current`, read directly by the PendSV handler.
pub(crate) const CURRENT_OFFSET: usize = core::mem::offset_of!(Scheduler, current);

/// Process-wide scheduling state.
#[repr(C)]
pub struct Scheduler {
    /// Descriptor whose context is live. Null until the first switch.
    current: AtomicPtr<ThreadDescriptor>,
    /// Descriptor the next switch loads.
    pending_next: AtomicPtr<ThreadDescriptor>,
    /// First descriptor of the started table; `next` indices resolve against it.
    ring_base: AtomicPtr<ThreadDescriptor>,
    /// Slot count of the started table.
    ring_capacity: AtomicUsize,
    started: AtomicBool,
}

impl Scheduler {
    /// A scheduler that has not been started.
    pub const fn new() -> Self {
        Self {
            current: AtomicPtr::new(core::ptr::null_mut()),
            pending_next: AtomicPtr::new(core::ptr::null_mut()),
            ring_base: AtomicPtr::new(core::ptr::null_mut()),
            ring_capacity: AtomicUsize::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// Seal `table` and arm the first switch into `first`.
    ///
    /// Validates that the ring through `first` closes, then publishes it
    /// and requests the context switch with interrupts masked. If interrupts
    /// were enabled on entry they are unmasked again, the switch is taken
    /// right away and this call does not return to its caller; otherwise it
    /// is taken as soon as interrupts are enabled. The interrupted context is
    /// abandoned, so follow this with [`idle`](crate::arch::idle).
    pub fn start<A: Arch, const N: usize>(
        &self,
        table: &'static ThreadTable<N>,
        first: ThreadId,
    ) -> ThreadResult<()> {
        if self.is_started() {
            return Err(ScheduleError::AlreadyStarted.into());
        }
        let ring_len = table.ring_len(first)?;
        if !table.seal() {
            return Err(ScheduleError::AlreadyStarted.into());
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScheduleError::AlreadyStarted.into());
        }

        // A tick must not observe a half-published ring.
        let unmask = A::interrupts_enabled();
        A::disable_interrupts();
        self.ring_base.store(table.base_ptr(), Ordering::Release);
        self.ring_capacity.store(N, Ordering::Release);
        self.pending_next
            .store(table.descriptor_ptr(first), Ordering::Release);

        kprintln!(
            "[sched] starting round-robin: {} of {} threads on the ring, first = {}",
            ring_len,
            table.len(),
            first
        );

        A::request_context_switch();
        if unmask {
            A::enable_interrupts();
        }
        Ok(())
    }

    /// Periodic tick: select the successor of `current` and arm the switch.
    ///
    /// Touches only `pending_next`. A second tick before the switch is taken
    /// recomputes the same successor and re-arms the same request.
    pub fn on_tick<A: Arch>(&self) {
        let current = self.current.load(Ordering::Acquire);
        if current.is_null() {
            // First switch armed by `start` but not taken yet: keep its target.
            if self.pending_next.load(Ordering::Acquire).is_null() {
                return;
            }
        } else {
            let base = self.ring_base.load(Ordering::Acquire);
            // `next` was validated by `start` and the table is sealed.
            let next = unsafe { base.add((*current).next_index()) };
            self.pending_next.store(next, Ordering::Release);
        }
        A::request_context_switch();
    }

    /// Record where the outgoing thread stopped and return where the
    /// incoming one resumes.
    ///
    /// Called by the switch handler with the outgoing stack pointer after
    /// r4-r11 have been pushed. Makes `pending_next` current.
    ///
    /// # Safety
    ///
    /// Only the context switch handler may call this, after `start`. When
    /// `current` is non-null, `saved_sp` must point at a full context frame
    /// on the current thread's stack.
    pub unsafe fn switch_context(&self, saved_sp: *mut u32) -> *mut u32 {
        let current = self.current.load(Ordering::Acquire);
        if let Some(current) = unsafe { current.as_ref() } {
            current.set_saved_stack_pointer(saved_sp);
        }

        let next = self.pending_next.load(Ordering::Acquire);
        self.current.store(next, Ordering::Release);
        unsafe { (*next).saved_stack_pointer() }
    }

    /// Thread whose context is live, or `None` before the first switch.
    pub fn current_thread(&self) -> Option<ThreadId> {
        self.slot_of(self.current.load(Ordering::Acquire))
    }

    /// Thread the next switch will load, if one is armed.
    pub fn pending_thread(&self) -> Option<ThreadId> {
        self.slot_of(self.pending_next.load(Ordering::Acquire))
    }

    /// Table slot of `descriptor`, if it lies inside the started table.
    fn slot_of(&self, descriptor: *mut ThreadDescriptor) -> Option<ThreadId> {
        if descriptor.is_null() {
            return None;
        }
        let base = self.ring_base.load(Ordering::Acquire) as usize;
        let offset = (descriptor as usize).checked_sub(base)?;
        let size = core::mem::size_of::<ThreadDescriptor>();
        let index = offset / size;
        if offset % size != 0 || index >= self.ring_capacity.load(Ordering::Acquire) {
            return None;
        }
        Some(ThreadId::new(index))
    }

    /// Whether `start` has succeeded.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub(crate) fn current_descriptor(&self) -> *mut ThreadDescriptor {
        self.current.load(Ordering::Acquire)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
