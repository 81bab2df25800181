pub mod config;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Cycle, Reading};

#[cfg(test)]
pub(crate) mod testing;
