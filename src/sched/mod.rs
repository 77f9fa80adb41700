//! Round-robin scheduler.
//!
//! [`ThreadTable`] holds the threads and their ring; [`Scheduler`] holds the
//! two scheduling pointers driven by the tick and context switch handlers.

pub mod rr;
pub mod table;

pub use rr::{Scheduler, SCHEDULER};
pub use table::ThreadTable;
