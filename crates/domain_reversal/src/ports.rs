//! Collaborator ports
//!
//! External systems the reversal engine must stay abstract over. Adapters
//! live in the infrastructure layer; tests provide in-memory fakes.

use chrono::NaiveDate;

use core_kernel::{AccountId, AccountTransactionId, DomainPort, PortError};
use domain_servicing::PaybackTransaction;

use crate::context::ReversalContext;

/// Read side of the cashback-claim experiment
///
/// Consulted while loading the working set; the write side (voiding claim
/// state) is emitted as outcome commands and deferred effects.
pub trait CashbackExperimentPort: DomainPort {
    /// Returns true when the claim experiment is active for the account on
    /// the given date
    fn is_claim_active(&self, date: NaiveDate, account_id: AccountId) -> bool;
}

/// The repayment engine that applies a payback to an account
///
/// Used by the transfer operation: the implementation must apply the
/// payback to the context (creating the new transaction and its payment
/// events, updating payment balances) and return the new transaction id.
pub trait RepaymentPort: DomainPort {
    fn process_repayment_transaction(
        &self,
        ctx: &mut ReversalContext,
        payback: PaybackTransaction,
        note: Option<&str>,
        using_cashback: bool,
    ) -> Result<AccountTransactionId, PortError>;
}
