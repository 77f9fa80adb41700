//! Fixed-capacity table of thread descriptors.
//!
//! Threads are identified by their slot index and linked into a ring by
//! index, so no descriptor ever refers to memory outside the table. The
//! table is filled and linked during setup, then sealed by
//! `Scheduler::start`; after that the ring topology never changes.

use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::MIN_STACK_WORDS;
use crate::errors::{ScheduleError, SpawnError, ThreadResult};
use crate::kprintln;
use crate::mem::ThreadStack;
use crate::thread::{initialize_thread, ThreadDescriptor, ThreadId};

/// Statically allocated set of up to `N` threads.
///
/// ```ignore
/// static THREADS: ThreadTable<3> = ThreadTable::new();
/// ```
pub struct ThreadTable<const N: usize> {
    descriptors: [ThreadDescriptor; N],
    registered: AtomicUsize,
    sealed: AtomicBool,
}

impl<const N: usize> ThreadTable<N> {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            descriptors: [const { ThreadDescriptor::new() }; N],
            registered: AtomicUsize::new(0),
            sealed: AtomicBool::new(false),
        }
    }

    /// Maximum number of threads.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of registered threads.
    pub fn len(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }

    /// Whether no thread has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a scheduler has taken this table.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Descriptor of a registered thread.
    pub fn descriptor(&self, id: ThreadId) -> Option<&ThreadDescriptor> {
        if id.index() < self.len() {
            Some(&self.descriptors[id.index()])
        } else {
            None
        }
    }

    /// Register a thread that starts at `entry` on `stack`.
    ///
    /// The stack is painted, claimed for good, and receives the initial
    /// context frame. The new thread is not linked into the ring yet.
    pub fn spawn<const W: usize>(
        &self,
        stack: &'static ThreadStack<W>,
        entry: fn() -> !,
    ) -> ThreadResult<ThreadId> {
        if self.is_sealed() {
            return Err(SpawnError::AlreadyStarted.into());
        }
        if W < MIN_STACK_WORDS {
            return Err(SpawnError::StackTooSmall {
                words: W,
                min: MIN_STACK_WORDS,
            }
            .into());
        }
        if !stack.is_aligned() {
            return Err(SpawnError::StackMisaligned(stack.top() as usize).into());
        }
        if self.len() >= N {
            return Err(SpawnError::TableFull.into());
        }
        if !stack.claim() {
            return Err(SpawnError::StackInUse.into());
        }

        let index = self
            .registered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < N).then_some(n + 1))
            .map_err(|_| SpawnError::TableFull)?;
        let id = ThreadId::new(index);

        stack.paint();
        unsafe { initialize_thread(&self.descriptors[index], stack.as_mut_ptr(), W, entry) };

        kprintln!(
            "[sched] thread {} ready: stack {:#x}..{:#x}, entry {:#x}",
            id,
            stack.as_mut_ptr() as usize,
            stack.top() as usize,
            entry as usize
        );
        Ok(id)
    }

    /// Make `to` run after `from`.
    pub fn link(&self, from: ThreadId, to: ThreadId) -> ThreadResult<()> {
        if self.is_sealed() {
            return Err(ScheduleError::AlreadyStarted.into());
        }
        let from_desc = self
            .descriptor(from)
            .ok_or(ScheduleError::InvalidThread(from))?;
        if self.descriptor(to).is_none() {
            return Err(ScheduleError::InvalidThread(to).into());
        }
        from_desc.set_next(to);
        Ok(())
    }

    /// Link every registered thread in registration order, last back to first.
    pub fn link_in_order(&self) -> ThreadResult<()> {
        let len = self.len();
        if len == 0 {
            return Err(ScheduleError::EmptyRing.into());
        }
        for i in 0..len {
            self.link(ThreadId::new(i), ThreadId::new((i + 1) % len))?;
        }
        Ok(())
    }

    /// Walk the ring from `first` and return how many threads it holds.
    ///
    /// Fails unless following `next` from `first` comes back to `first`
    /// through registered, linked threads only.
    pub fn ring_len(&self, first: ThreadId) -> ThreadResult<usize> {
        let len = self.len();
        if len == 0 {
            return Err(ScheduleError::EmptyRing.into());
        }
        if self.descriptor(first).is_none() {
            return Err(ScheduleError::InvalidThread(first).into());
        }

        let mut id = first;
        for steps in 1..=len {
            let next = self.descriptors[id.index()]
                .next()
                .ok_or(ScheduleError::NotLinked(id))?;
            if next.index() >= len {
                return Err(ScheduleError::InvalidThread(next).into());
            }
            if next == first {
                return Ok(steps);
            }
            id = next;
        }
        Err(ScheduleError::BrokenRing(first).into())
    }

    /// Freeze the ring. Returns `false` if already sealed.
    pub(crate) fn seal(&self) -> bool {
        self.sealed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn base_ptr(&self) -> *mut ThreadDescriptor {
        self.descriptors.as_ptr().cast_mut()
    }

    pub(crate) fn descriptor_ptr(&self, id: ThreadId) -> *mut ThreadDescriptor {
        (&self.descriptors[id.index()] as *const ThreadDescriptor).cast_mut()
    }
}

impl<const N: usize> Default for ThreadTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
