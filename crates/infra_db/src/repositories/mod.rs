//! Repository implementations

pub mod reversal;

pub use reversal::{ReversalRepository, ReversalSettings};
