//! Memory for thread stacks.
//!
//! Stacks are caller-owned statics; nothing here allocates.

pub mod stack;

pub use stack::ThreadStack;
