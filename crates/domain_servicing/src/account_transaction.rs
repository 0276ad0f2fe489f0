//! Account transactions
//!
//! An AccountTransaction groups the PaymentEvents created by one financial
//! transaction against an account. Reversal is strictly at-most-once: once
//! `can_reverse` is false no further reversal of the transaction is
//! permitted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, AccountTransactionId, Money};

use crate::events::PaymentEventType;

/// The kind of financial transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Customer repayment
    Payment,
    /// Reversal of a customer repayment
    PaymentVoid,
    /// Repayment funded from the customer wallet
    CustomerWallet,
    /// Reversal of a wallet-funded repayment
    CustomerWalletVoid,
    /// Late fee application
    LateFee,
    /// Reversal of a late fee application
    LateFeeVoid,
}

impl TransactionType {
    /// Returns true for transaction types that may be reversed at all
    pub fn is_reversible_type(&self) -> bool {
        matches!(
            self,
            TransactionType::Payment | TransactionType::CustomerWallet | TransactionType::LateFee
        )
    }

    /// Returns the void type compensating this transaction type
    pub fn void_type(&self) -> Option<TransactionType> {
        match self {
            TransactionType::Payment => Some(TransactionType::PaymentVoid),
            TransactionType::CustomerWallet => Some(TransactionType::CustomerWalletVoid),
            TransactionType::LateFee => Some(TransactionType::LateFeeVoid),
            _ => None,
        }
    }

    /// Stable string form used in audit notes and status-change reasons
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::PaymentVoid => "payment_void",
            TransactionType::CustomerWallet => "customer_wallet",
            TransactionType::CustomerWalletVoid => "customer_wallet_void",
            TransactionType::LateFee => "late_fee",
            TransactionType::LateFeeVoid => "late_fee_void",
        }
    }

    /// The payment-event void type written when reversing this transaction
    pub fn event_void_type(&self) -> PaymentEventType {
        match self {
            TransactionType::CustomerWallet => PaymentEventType::CustomerWalletVoid,
            TransactionType::LateFee => PaymentEventType::LateFeeVoid,
            _ => PaymentEventType::PaymentVoid,
        }
    }
}

/// An account-level financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTransaction {
    /// Unique identifier
    pub id: AccountTransactionId,
    /// Owning account
    pub account_id: AccountId,
    /// Civil date of the transaction
    pub transaction_date: NaiveDate,
    /// Signed transaction amount
    pub transaction_amount: Money,
    /// Kind of transaction
    pub transaction_type: TransactionType,
    /// Amount applied toward principal
    pub towards_principal: Money,
    /// Amount applied toward interest
    pub towards_interest: Money,
    /// Amount applied toward late fees
    pub towards_latefee: Money,
    /// Whether reversal of this transaction is still permitted
    pub can_reverse: bool,
    /// The compensating transaction, once reversed
    pub reversal_transaction_id: Option<AccountTransactionId>,
    /// For transfers: the reversal transaction the funds originate from
    pub reversed_transaction_origin_id: Option<AccountTransactionId>,
    /// Free-text note
    pub note: Option<String>,
    /// Creation timestamp
    pub cdate: DateTime<Utc>,
}

impl AccountTransaction {
    /// Creates a new forward transaction
    pub fn new(
        account_id: AccountId,
        transaction_date: NaiveDate,
        transaction_amount: Money,
        transaction_type: TransactionType,
        towards_principal: Money,
        towards_interest: Money,
        towards_latefee: Money,
    ) -> Self {
        Self {
            id: AccountTransactionId::new_v7(),
            account_id,
            transaction_date,
            transaction_amount,
            transaction_type,
            towards_principal,
            towards_interest,
            towards_latefee,
            can_reverse: transaction_type.is_reversible_type(),
            reversal_transaction_id: None,
            reversed_transaction_origin_id: None,
            note: None,
            cdate: Utc::now(),
        }
    }

    /// Builds the compensating transaction for this one
    ///
    /// Amount and towards-* fields are negated; reversal transactions are
    /// terminal (`can_reverse = false`).
    pub fn reversal_of(
        &self,
        void_type: TransactionType,
        transaction_date: NaiveDate,
        note: Option<String>,
    ) -> AccountTransaction {
        AccountTransaction {
            id: AccountTransactionId::new_v7(),
            account_id: self.account_id,
            transaction_date,
            transaction_amount: -self.transaction_amount,
            transaction_type: void_type,
            towards_principal: -self.towards_principal,
            towards_interest: -self.towards_interest,
            towards_latefee: -self.towards_latefee,
            can_reverse: false,
            reversal_transaction_id: None,
            reversed_transaction_origin_id: None,
            note,
            cdate: Utc::now(),
        }
    }

    /// Marks this transaction reversed and links its compensating transaction
    pub fn mark_reversed(&mut self, reversal_id: AccountTransactionId) {
        self.can_reverse = false;
        self.reversal_transaction_id = Some(reversal_id);
    }

    /// Sets the note on this transaction
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
