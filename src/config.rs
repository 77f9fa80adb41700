//! Compile-time constants and the tick timer configuration.

use crate::errors::{ThreadResult, TimerError};

/// Initial xPSR for a fabricated frame: only the EPSR Thumb bit is set.
pub const INITIAL_XPSR: u32 = 0x0100_0000;

/// EXC_RETURN: return to Thread mode, use PSP, basic (non-FP) frame.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// CONTROL value written before returning to a thread: nPRIV set, threads run unprivileged.
pub const CONTROL_UNPRIVILEGED: u32 = 0b01;

/// Words the core pushes on exception entry (r0-r3, r12, lr, pc, xPSR).
pub const HW_FRAME_WORDS: usize = 8;

/// Words the switch handler pushes itself (r4-r11).
pub const SW_FRAME_WORDS: usize = 8;

/// Total words of a saved context.
pub const CONTEXT_FRAME_WORDS: usize = HW_FRAME_WORDS + SW_FRAME_WORDS;

/// Smallest stack `ThreadTable::spawn` accepts: one context frame plus room
/// for a nested exception frame and a little thread-local usage.
pub const MIN_STACK_WORDS: usize = CONTEXT_FRAME_WORDS + HW_FRAME_WORDS + 16;

/// Required alignment of a stack top (AAPCS, exception entry).
pub const STACK_ALIGN: usize = 8;

/// Largest value the 24-bit SysTick reload register holds.
pub const SYST_MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Periodic tick configuration.
///
/// Lower priority values are more urgent on Cortex-M. The tick must be
/// strictly more urgent than the context switch so that `pending_next` is
/// written before the switch handler can read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    /// Core clock feeding SysTick, in Hz
    pub core_clock_hz: u32,
    /// Time slice rate, in Hz
    pub tick_hz: u32,
    /// SysTick exception priority
    pub tick_priority: u8,
    /// PendSV exception priority
    pub switch_priority: u8,
    /// Priority bits implemented by the NVIC (4 on most Cortex-M4 parts)
    pub priority_bits: u8,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            core_clock_hz: 12_000_000,
            tick_hz: 1_000,
            tick_priority: 0x00,
            switch_priority: 0xFF,
            priority_bits: 4,
        }
    }
}

impl TickConfig {
    /// Config for the given core clock and tick rate, default priorities.
    pub const fn new(core_clock_hz: u32, tick_hz: u32) -> Self {
        Self {
            core_clock_hz,
            tick_hz,
            tick_priority: 0x00,
            switch_priority: 0xFF,
            priority_bits: 4,
        }
    }

    /// SysTick reload value for this tick rate.
    pub fn reload(&self) -> ThreadResult<u32> {
        if self.tick_hz == 0 || self.tick_hz > self.core_clock_hz {
            return Err(TimerError::InvalidTickRate(self.tick_hz).into());
        }
        let reload = self.core_clock_hz / self.tick_hz - 1;
        if reload == 0 || reload > SYST_MAX_RELOAD {
            return Err(TimerError::ReloadOutOfRange(reload).into());
        }
        Ok(reload)
    }

    /// Priority as the hardware sees it, after dropping unimplemented low bits.
    pub fn effective_priority(&self, priority: u8) -> u8 {
        priority >> (8 - self.priority_bits.clamp(1, 8))
    }

    /// Check every field; returns the reload value on success.
    pub fn validate(&self) -> ThreadResult<u32> {
        if self.priority_bits == 0 || self.priority_bits > 8 {
            return Err(TimerError::InvalidPriorityBits(self.priority_bits).into());
        }
        if self.effective_priority(self.tick_priority)
            >= self.effective_priority(self.switch_priority)
        {
            return Err(TimerError::PriorityInversion {
                tick: self.tick_priority,
                switch: self.switch_priority,
            }
            .into());
        }
        self.reload()
    }
}
