//! Host-side tests driven through the exception model in `arch::sim`.

pub(crate) mod helpers;
mod property;
mod unit;
