//! Operations facade for the loan-servicing reversal core
//!
//! There is no HTTP surface here; the reversal operations are exposed as
//! programmatic entry points for admin actions, refinancing workflows, and
//! customer-support tooling. This crate wires configuration, telemetry,
//! the database layer, and post-commit deferred-effect dispatch around the
//! pure reversal engine.

pub mod config;
pub mod effects;
pub mod error;
pub mod ops;
pub mod telemetry;

pub use config::ServicingConfig;
pub use effects::{EffectDispatch, TracingEffectDispatch};
pub use error::OpsError;
pub use ops::ServicingOps;
pub use telemetry::init_tracing;
