//! Statically allocated thread stacks.

use core::cell::UnsafeCell;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::STACK_ALIGN;

/// Fill pattern written over a stack before its first frame is built.
pub const STACK_PAINT: u32 = 0xDEAD_BEEF;

/// A thread stack of `WORDS` 32-bit words.
///
/// Declare one `static` per thread and hand it to `ThreadTable::spawn`,
/// which claims it for the lifetime of the program. Use an even `WORDS` so
/// the top of the stack stays 8-byte aligned.
///
/// ```ignore
/// static STACK_A: ThreadStack<256> = ThreadStack::new();
/// ```
#[repr(C, align(8))]
pub struct ThreadStack<const WORDS: usize> {
    memory: UnsafeCell<[u32; WORDS]>,
    claimed: AtomicBool,
}

// Only the owning thread and the context switch handler touch the memory,
// never at the same time.
unsafe impl<const WORDS: usize> Sync for ThreadStack<WORDS> {}

impl<const WORDS: usize> ThreadStack<WORDS> {
    /// A zeroed, unclaimed stack.
    pub const fn new() -> Self {
        Self {
            memory: UnsafeCell::new([0; WORDS]),
            claimed: AtomicBool::new(false),
        }
    }

    /// Capacity in words.
    pub const fn capacity(&self) -> usize {
        WORDS
    }

    /// Lowest word of the region.
    pub fn as_mut_ptr(&self) -> *mut u32 {
        self.memory.get().cast::<u32>()
    }

    /// One past the highest word; the initial stack pointer.
    pub fn top(&self) -> *mut u32 {
        self.as_mut_ptr().wrapping_add(WORDS)
    }

    /// Whether the top satisfies the exception-entry alignment.
    pub fn is_aligned(&self) -> bool {
        (self.top() as usize) % STACK_ALIGN == 0
    }

    /// Take ownership for a thread. Returns `false` if already claimed.
    pub(crate) fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether a thread owns this stack.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Overwrite the whole region with [`STACK_PAINT`].
    ///
    /// Must only be called before the stack's thread is scheduled.
    pub(crate) fn paint(&self) {
        let base = self.as_mut_ptr();
        for i in 0..WORDS {
            unsafe { base.add(i).write_volatile(STACK_PAINT) };
        }
    }

    /// Words at the low end that still hold the paint pattern.
    ///
    /// A value near zero means the thread came close to overflowing.
    pub fn untouched_words(&self) -> usize {
        let base = self.as_mut_ptr();
        (0..WORDS)
            .take_while(|&i| unsafe { base.add(i).read_volatile() } == STACK_PAINT)
            .count()
    }
}

impl<const WORDS: usize> Default for ThreadStack<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}
