//! Reversal domain errors
//!
//! Precondition violations propagate and roll the enclosing transaction
//! back. Best-effort adjustments never surface here; they report through
//! [`crate::outcome::AdjusterOutcome`]. Data-consistency anomalies are
//! clamped and logged, never raised.

use core_kernel::MoneyError;
use domain_servicing::ServicingError;
use thiserror::Error;

/// Errors that can occur in the reversal domain
#[derive(Debug, Error)]
pub enum ReversalError {
    /// The transaction has already been reversed or is otherwise terminal
    #[error("Account transaction not reversible: {0}")]
    TransactionNotReversable(String),

    /// The transaction has no attached payment events
    #[error("Account transaction {0} has no payment events")]
    NoPaymentEvents(String),

    /// The transaction type cannot be reversed by this operation
    #[error("Wrong transaction type for reversal: {0}")]
    WrongTransactionType(String),

    /// A referenced entity is missing from the working set
    #[error("Missing entity: {entity_type} {id}")]
    MissingEntity { entity_type: String, id: String },

    /// Transfer destination has no account payment or payment to receive funds
    #[error("Transfer destination account {0} has no payments")]
    DestinationHasNoPayments(String),

    /// A collaborator port failed
    #[error("Collaborator error: {0}")]
    Port(#[from] core_kernel::PortError),

    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Servicing entity rejected a mutation
    #[error("Servicing error: {0}")]
    Servicing(#[from] ServicingError),
}

impl ReversalError {
    pub fn missing(entity_type: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ReversalError::MissingEntity {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}
