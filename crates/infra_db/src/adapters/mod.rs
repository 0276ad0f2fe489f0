//! Port adapters

pub mod experiment;

pub use experiment::PreloadedExperimentFlags;
