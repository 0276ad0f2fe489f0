//! Servicing Domain - loans, installments, and ledger records
//!
//! This crate defines the data model of the loan-servicing back office:
//! loans and their installment Payments, the AccountPayment groups that
//! aggregate them per due date, the append-only PaymentEvent /
//! AccountTransaction ledger, promise-to-pay records, the customer wallet
//! and cashback ledgers, and agent commission records.
//!
//! # Invariants
//!
//! - `paid_amount == paid_principal + paid_interest + paid_late_fee` on
//!   every Payment and AccountPayment at any consistent snapshot
//! - An AccountPayment's money fields equal the sums over its Payments
//! - PaymentEvents and wallet/counter histories are append-only
//! - `due_amount` never exceeds the computed outstanding bound (ratchet)

pub mod account;
pub mod account_payment;
pub mod account_transaction;
pub mod commission;
pub mod error;
pub mod events;
pub mod loan;
pub mod payback;
pub mod payment;
pub mod ptp;
pub mod wallet;

pub use account::{Account, AccountPropertyHistory};
pub use account_payment::{AccountPayment, AccountPaymentStatus};
pub use account_transaction::{AccountTransaction, TransactionType};
pub use commission::CommissionLookup;
pub use error::ServicingError;
pub use events::{PaymentEvent, PaymentEventType};
pub use loan::{Loan, LoanStatus};
pub use payback::PaybackTransaction;
pub use payment::{Payment, PaymentComponent, PaymentStatus, StatusContext};
pub use ptp::{Ptp, PtpStatus};
pub use wallet::{
    CashbackCounterHistory, CustomerWallet, CustomerWalletHistory, WalletChangeReason,
};
