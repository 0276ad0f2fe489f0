//! Servicing domain errors

use core_kernel::MoneyError;
use thiserror::Error;

/// Errors that can occur in the servicing domain
#[derive(Debug, Error)]
pub enum ServicingError {
    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}
