//! Payback transactions
//!
//! A PaybackTransaction is the raw inbound payment record fed to the
//! repayment engine. The transfer operation deep-copies it onto a
//! destination account; the original row is never mutated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CustomerId, Money, PaybackId};

/// An inbound payment record awaiting (or after) processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaybackTransaction {
    /// Unique identifier
    pub id: PaybackId,
    /// Paying customer
    pub customer_id: CustomerId,
    /// Account the payment applies to
    pub account_id: AccountId,
    /// Payment amount
    pub amount: Money,
    /// Civil date of the payment
    pub transaction_date: NaiveDate,
    /// Originating payment channel label
    pub payback_service: String,
    /// Whether the repayment engine has applied this record
    pub is_processed: bool,
    /// Creation timestamp
    pub cdate: DateTime<Utc>,
}

impl PaybackTransaction {
    /// Creates a new unprocessed payback
    pub fn new(
        customer_id: CustomerId,
        account_id: AccountId,
        amount: Money,
        transaction_date: NaiveDate,
        payback_service: impl Into<String>,
    ) -> Self {
        Self {
            id: PaybackId::new_v7(),
            customer_id,
            account_id,
            amount,
            transaction_date,
            payback_service: payback_service.into(),
            is_processed: false,
            cdate: Utc::now(),
        }
    }

    /// Deep-copies this payback onto a destination account
    ///
    /// The copy gets a fresh id, the destination account/customer, and is
    /// marked unprocessed so the repayment engine applies it anew. The
    /// original is left untouched.
    pub fn copy_for_transfer(
        &self,
        destination_account: AccountId,
        destination_customer: CustomerId,
    ) -> PaybackTransaction {
        PaybackTransaction {
            id: PaybackId::new_v7(),
            customer_id: destination_customer,
            account_id: destination_account,
            amount: self.amount,
            transaction_date: self.transaction_date,
            payback_service: self.payback_service.clone(),
            is_processed: false,
            cdate: Utc::now(),
        }
    }
}
