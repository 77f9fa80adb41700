//! Thread descriptors and initial context construction.
//!
//! A thread is nothing more than a saved stack pointer and the index of the
//! thread that runs after it. Everything else about a suspended thread lives
//! on its own stack, in the layout described by [`ContextFrame`].

use portable_atomic::{AtomicPtr, AtomicUsize, Ordering};

pub mod frame;

pub use frame::{initialize_thread, ContextFrame, HardwareFrame, SoftwareFrame};

/// Marker stored in `next` until the calling environment links the thread.
pub(crate) const UNLINKED: usize = usize::MAX;

/// Identifier of a thread: its slot in the owning `ThreadTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(usize);

impl ThreadId {
    /// Create a thread ID from a table slot index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot index inside the owning table.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schedulable thread.
#[derive(Debug)]
pub struct ThreadDescriptor {
    /// Lowest word of the context frame saved on this thread's stack.
    saved_sp: AtomicPtr<u32>,
    /// Table index of the successor, or `UNLINKED`.
    next: AtomicUsize,
}

impl ThreadDescriptor {
    /// An uninitialized, unlinked descriptor.
    pub const fn new() -> Self {
        Self {
            saved_sp: AtomicPtr::new(core::ptr::null_mut()),
            next: AtomicUsize::new(UNLINKED),
        }
    }

    /// Where the thread resumes from. Null until `initialize_thread` ran.
    pub fn saved_stack_pointer(&self) -> *mut u32 {
        self.saved_sp.load(Ordering::Acquire)
    }

    pub(crate) fn set_saved_stack_pointer(&self, sp: *mut u32) {
        self.saved_sp.store(sp, Ordering::Release);
    }

    /// Successor on the ring, if linked.
    pub fn next(&self) -> Option<ThreadId> {
        match self.next_index() {
            UNLINKED => None,
            index => Some(ThreadId(index)),
        }
    }

    pub(crate) fn next_index(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    pub(crate) fn set_next(&self, next: ThreadId) {
        self.next.store(next.0, Ordering::Release);
    }

    /// Whether a context frame has been built for this descriptor.
    pub fn is_initialized(&self) -> bool {
        !self.saved_stack_pointer().is_null()
    }
}

impl Default for ThreadDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
