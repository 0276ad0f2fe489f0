//! Payment events
//!
//! A PaymentEvent is one ledger entry recording a change to a Payment's
//! balance. Events are append-only: after creation the only permitted
//! mutation is attaching the event to a newly created reversal transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountTransactionId, Money, PaymentEventId, PaymentId};

/// The kind of balance change an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventType {
    /// Money applied to the payment
    Payment,
    /// Compensating entry undoing a payment
    PaymentVoid,
    /// Late fee charged
    LateFee,
    /// Compensating entry undoing a late fee
    LateFeeVoid,
    /// Payment funded from the customer wallet (cashback)
    CustomerWallet,
    /// Compensating entry undoing a wallet-funded payment
    CustomerWalletVoid,
}

impl PaymentEventType {
    /// Returns true for compensating (void) event types
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            PaymentEventType::PaymentVoid
                | PaymentEventType::LateFeeVoid
                | PaymentEventType::CustomerWalletVoid
        )
    }

    /// Returns the void type compensating this event type, if reversible
    pub fn void_type(&self) -> Option<PaymentEventType> {
        match self {
            PaymentEventType::Payment => Some(PaymentEventType::PaymentVoid),
            PaymentEventType::LateFee => Some(PaymentEventType::LateFeeVoid),
            PaymentEventType::CustomerWallet => Some(PaymentEventType::CustomerWalletVoid),
            _ => None,
        }
    }

    /// Stable string form used in audit notes and change reasons
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEventType::Payment => "payment",
            PaymentEventType::PaymentVoid => "payment_void",
            PaymentEventType::LateFee => "late_fee",
            PaymentEventType::LateFeeVoid => "late_fee_void",
            PaymentEventType::CustomerWallet => "customer_wallet",
            PaymentEventType::CustomerWalletVoid => "customer_wallet_void",
        }
    }
}

/// One ledger entry against a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Unique identifier
    pub id: PaymentEventId,
    /// Payment whose balance changed
    pub payment_id: PaymentId,
    /// Kind of change
    pub event_type: PaymentEventType,
    /// Signed amount; negative for voids
    pub amount: Money,
    /// Due amount snapshot associated with the event
    pub due_amount_after: Money,
    /// Civil date of the event
    pub event_date: NaiveDate,
    /// Whether this event may still be reversed; voids never can
    pub can_reverse: bool,
    /// Owning financial transaction
    pub account_transaction_id: Option<AccountTransactionId>,
    /// Receipt reference, if any
    pub payment_receipt: Option<String>,
    /// Payment method label, if any
    pub payment_method: Option<String>,
}

impl PaymentEvent {
    /// Creates a forward ledger entry recording money applied to a payment
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payment_id: PaymentId,
        event_type: PaymentEventType,
        amount: Money,
        due_amount_after: Money,
        event_date: NaiveDate,
        payment_receipt: Option<String>,
        payment_method: Option<String>,
    ) -> Self {
        Self {
            id: PaymentEventId::new_v7(),
            payment_id,
            event_type,
            amount,
            due_amount_after,
            event_date,
            can_reverse: !event_type.is_void(),
            account_transaction_id: None,
            payment_receipt,
            payment_method,
        }
    }

    /// Creates a compensating void entry for a reversed payment
    ///
    /// The amount is stored negated; void events are terminal
    /// (`can_reverse = false`).
    pub fn void(
        payment_id: PaymentId,
        event_type: PaymentEventType,
        reversed_amount: Money,
        due_amount_snapshot: Money,
        event_date: NaiveDate,
        payment_receipt: Option<String>,
        payment_method: Option<String>,
    ) -> Self {
        debug_assert!(event_type.is_void());
        Self {
            id: PaymentEventId::new_v7(),
            payment_id,
            event_type,
            amount: -reversed_amount.abs(),
            due_amount_after: due_amount_snapshot,
            event_date,
            can_reverse: false,
            account_transaction_id: None,
            payment_receipt,
            payment_method,
        }
    }

    /// Attaches this event to its owning transaction
    pub fn attach_to(&mut self, transaction_id: AccountTransactionId) {
        self.account_transaction_id = Some(transaction_id);
    }
}
