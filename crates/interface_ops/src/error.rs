//! Operations errors

use domain_reversal::ReversalError;
use infra_db::DatabaseError;
use thiserror::Error;

/// Errors surfaced to callers of the operations facade
#[derive(Debug, Error)]
pub enum OpsError {
    /// Reversal precondition or engine failure; the transaction rolled back
    #[error("Reversal failed: {0}")]
    Reversal(#[from] ReversalError),

    /// Storage failure; both stores rolled back
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration problem
    #[error("Configuration error: {0}")]
    Configuration(String),
}
