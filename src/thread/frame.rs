//! Saved context frame layout and the stack builder.
//!
//! On exception entry an ARMv7-M core pushes eight words onto the active
//! stack (the hardware segment). The context switch handler pushes r4-r11
//! below them (the software segment). A suspended thread's stack therefore
//! ends, from its saved stack pointer upwards, in exactly one [`ContextFrame`].

use super::ThreadDescriptor;
use crate::config::{CONTEXT_FRAME_WORDS, INITIAL_XPSR};

/// Callee-saved registers, pushed and popped by the switch handler.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
}

/// Basic exception frame, stacked and unstacked by the core itself.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// Full saved context, in ascending address order.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFrame {
    pub software: SoftwareFrame,
    pub hardware: HardwareFrame,
}

const _: () = assert!(core::mem::size_of::<ContextFrame>() == CONTEXT_FRAME_WORDS * 4);
const _: () = assert!(core::mem::offset_of!(ContextFrame, hardware) == 32);

impl ContextFrame {
    /// Read the frame that starts at `sp`.
    ///
    /// # Safety
    ///
    /// `sp` must point at `CONTEXT_FRAME_WORDS` readable, word-aligned words.
    pub unsafe fn read(sp: *const u32) -> Self {
        unsafe { sp.cast::<ContextFrame>().read() }
    }
}

/// Address loaded into the PC slot for `entry`.
///
/// Bit 0 of a Thumb function pointer is an interworking marker; the return
/// address of an exception frame must be halfword aligned, with the Thumb
/// state carried by xPSR.T instead.
pub fn entry_address(entry: fn() -> !) -> u32 {
    (entry as usize as u32) & !1
}

#[inline(always)]
unsafe fn push(sp: &mut *mut u32, word: u32) {
    unsafe {
        *sp = sp.sub(1);
        sp.write(word);
    }
}

/// Build the initial context of a thread that has never run.
///
/// Fabricates, at the top of `stack_region`, the frame a preempted thread
/// would leave behind if it had been interrupted just before the first
/// instruction of `entry_function`, with every general purpose register zero.
/// The lowest address of that frame becomes the descriptor's saved stack
/// pointer.
///
/// # Safety
///
/// - `stack_region` must be valid for writes of `stack_capacity` words and
///   not be in use by anything else, including another thread.
/// - `stack_capacity` must be at least `CONTEXT_FRAME_WORDS`, and
///   `stack_region + stack_capacity` should be 8-byte aligned.
/// - `descriptor` must not be the scheduler's `current` or `pending_next`.
pub unsafe fn initialize_thread(
    descriptor: &ThreadDescriptor,
    stack_region: *mut u32,
    stack_capacity: usize,
    entry_function: fn() -> !,
) {
    let mut sp = unsafe { stack_region.add(stack_capacity) };

    unsafe {
        // Hardware segment, highest word first.
        push(&mut sp, INITIAL_XPSR);
        push(&mut sp, entry_address(entry_function));
        push(&mut sp, 0); // lr: no caller to return to
        push(&mut sp, 0); // r12
        push(&mut sp, 0); // r3
        push(&mut sp, 0); // r2
        push(&mut sp, 0); // r1
        push(&mut sp, 0); // r0

        // Software segment: r11 down to r4.
        for _ in 0..8 {
            push(&mut sp, 0);
        }
    }

    descriptor.set_saved_stack_pointer(sp);
}
