//! Error types for the setup-time API.
//!
//! The scheduling core itself never fails: `on_tick` and the context switch
//! have no error paths. Everything here is reported before the scheduler
//! starts, while the calling environment is still building its thread table
//! and programming the tick timer.

#![allow(clippy::uninlined_format_args)]

use core::fmt;

use crate::thread::ThreadId;

/// Result type for setup operations.
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Top-level error for all setup operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadError {
    /// Thread registration errors
    Spawn(SpawnError),
    /// Ring linkage and start-up errors
    Schedule(ScheduleError),
    /// Tick timer configuration errors
    Timer(TimerError),
}

/// Errors that can occur while registering a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Every slot of the thread table is in use
    TableFull,
    /// Stack cannot hold a context frame plus headroom
    StackTooSmall {
        /// Capacity that was offered, in words
        words: usize,
        /// Minimum accepted capacity, in words
        min: usize,
    },
    /// Stack top is not 8-byte aligned
    StackMisaligned(usize),
    /// Stack was already handed to another thread
    StackInUse,
    /// The table has been sealed by `Scheduler::start`
    AlreadyStarted,
}

/// Errors related to the thread ring and scheduler start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// No thread has been registered
    EmptyRing,
    /// Thread id does not name a registered thread
    InvalidThread(ThreadId),
    /// Thread on the ring has no successor
    NotLinked(ThreadId),
    /// Walking the ring from this thread never returns to it
    BrokenRing(ThreadId),
    /// Scheduler or table already started
    AlreadyStarted,
}

/// Tick timer configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Tick rate is zero or faster than the core clock
    InvalidTickRate(u32),
    /// Reload value does not fit the 24-bit SysTick counter
    ReloadOutOfRange(u32),
    /// Tick priority does not preempt the context switch priority
    PriorityInversion {
        /// Configured SysTick priority
        tick: u8,
        /// Configured PendSV priority
        switch: u8,
    },
    /// Priority bit count outside 1..=8
    InvalidPriorityBits(u8),
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadError::Spawn(e) => write!(f, "Thread spawn error: {}", e),
            ThreadError::Schedule(e) => write!(f, "Scheduling error: {}", e),
            ThreadError::Timer(e) => write!(f, "Timer error: {}", e),
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::TableFull => write!(f, "Thread table is full"),
            SpawnError::StackTooSmall { words, min } => {
                write!(f, "Stack too small: {} words, need at least {}", words, min)
            }
            SpawnError::StackMisaligned(addr) => {
                write!(f, "Stack top {:#x} is not 8-byte aligned", addr)
            }
            SpawnError::StackInUse => write!(f, "Stack already belongs to another thread"),
            SpawnError::AlreadyStarted => write!(f, "Scheduler already started"),
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::EmptyRing => write!(f, "No threads registered"),
            ScheduleError::InvalidThread(id) => write!(f, "Unknown thread {}", id),
            ScheduleError::NotLinked(id) => write!(f, "Thread {} has no successor", id),
            ScheduleError::BrokenRing(id) => {
                write!(f, "Ring from thread {} never returns to it", id)
            }
            ScheduleError::AlreadyStarted => write!(f, "Scheduler already started"),
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::InvalidTickRate(hz) => write!(f, "Invalid tick rate: {} Hz", hz),
            TimerError::ReloadOutOfRange(reload) => {
                write!(f, "SysTick reload {:#x} exceeds 24 bits", reload)
            }
            TimerError::PriorityInversion { tick, switch } => write!(
                f,
                "Tick priority {:#04x} must be more urgent than switch priority {:#04x}",
                tick, switch
            ),
            TimerError::InvalidPriorityBits(bits) => {
                write!(f, "Invalid priority bit count: {}", bits)
            }
        }
    }
}

impl From<SpawnError> for ThreadError {
    fn from(error: SpawnError) -> Self {
        ThreadError::Spawn(error)
    }
}

impl From<ScheduleError> for ThreadError {
    fn from(error: ScheduleError) -> Self {
        ThreadError::Schedule(error)
    }
}

impl From<TimerError> for ThreadError {
    fn from(error: TimerError) -> Self {
        ThreadError::Timer(error)
    }
}
