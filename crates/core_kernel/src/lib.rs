//! Core Kernel - Foundational types and utilities for the loan-servicing system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Temporal types for civil-date handling in the operating timezone
//! - Common identifiers and value objects

pub mod error;
pub mod identifiers;
pub mod money;
pub mod ports;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{
    AccountId, AccountPaymentId, AccountTransactionId, CashbackCounterId, CommissionId,
    CustomerId, LoanId, PaybackId, PaymentEventId, PaymentId, PtpId, WalletHistoryId,
};
pub use money::{Currency, Money, MoneyError};
pub use ports::{DomainPort, PortError};
pub use temporal::{DateWindow, TemporalError, Timezone};
