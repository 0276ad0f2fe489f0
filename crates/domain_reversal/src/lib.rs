//! Reversal Domain - the payment/transaction reversal engine
//!
//! Undoes a previously applied payment across a loan's amortization
//! components and reconciles every side effect the original application
//! had: payment and account-payment balances and statuses, cashback
//! ledgers, promise-to-pay state, commission records, and cross-account
//! transfers.
//!
//! # Shape of the engine
//!
//! The engine is synchronous and pure over a [`context::ReversalContext`]
//! working set the storage layer loads under row locks. It returns a
//! [`outcome::ReversalOutcome`] listing every row to persist and every
//! command/effect to dispatch; nothing here performs I/O.
//!
//! # Component order
//!
//! Reversal always peels late fee, then interest, then principal. This is
//! the mirror of the forward waterfall, which settles late fees first.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_reversal::orchestrator::process_account_transaction_reversal;
//!
//! let outcome = process_account_transaction_reversal(
//!     &mut ctx,
//!     transaction_id,
//!     Some("customer dispute"),
//!     false,
//! )?;
//! repo.persist(&ctx, &outcome).await?;
//! ```

pub mod aggregator;
pub mod cashback;
pub mod chained;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod ports;
pub mod ptp_adjuster;
pub mod recorder;
pub mod snapshot;
pub mod transfer;
pub mod waterfall;

pub use chained::process_customer_payment_reversal;
pub use context::{CashbackScheme, ReversalContext};
pub use error::ReversalError;
pub use orchestrator::{process_account_transaction_reversal, process_late_fee_reversal};
pub use outcome::{
    AdjusterOutcome, ChainedReversalOutcome, DeferredEffect, ReversalOutcome, ReversedTotals,
};
pub use ports::{CashbackExperimentPort, RepaymentPort};
pub use snapshot::PreReversalSnapshot;
pub use transfer::{transfer_payment_after_reversal, TransferArgs};
pub use waterfall::{allocate, allocate_all, AllocationStep, WaterfallResult};
