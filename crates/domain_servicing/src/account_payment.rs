//! Account payments
//!
//! An AccountPayment aggregates the Payments of one account that fall due on
//! the same date. Its money fields equal the sum of its constituent
//! Payments' corresponding fields at any consistent snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, AccountPaymentId, Money};

use crate::error::ServicingError;
use crate::payment::{Payment, PaymentComponent, StatusContext, DUE_SOON_DAYS, GRACE_PERIOD_DAYS};

/// Status of an account payment, derived from its payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountPaymentStatus {
    NotDue,
    DueSoon,
    Due,
    Overdue,
    PaidOnTime,
    PaidInGrace,
    PaidLate,
}

impl AccountPaymentStatus {
    /// Returns true for any of the fully-paid statuses
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            AccountPaymentStatus::PaidOnTime
                | AccountPaymentStatus::PaidInGrace
                | AccountPaymentStatus::PaidLate
        )
    }
}

/// A dated group of payments for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPayment {
    /// Unique identifier
    pub id: AccountPaymentId,
    /// Owning account
    pub account_id: AccountId,
    /// Shared due date of the grouped payments
    pub due_date: NaiveDate,
    /// Scheduled principal across the group
    pub principal_amount: Money,
    /// Scheduled interest across the group
    pub interest_amount: Money,
    /// Late fee accrued across the group
    pub late_fee_amount: Money,
    /// Number of late-fee applications across the group
    pub late_fee_applied: u32,
    /// Principal paid across the group
    pub paid_principal: Money,
    /// Interest paid across the group
    pub paid_interest: Money,
    /// Late fee paid across the group
    pub paid_late_fee: Money,
    /// Total paid across the group
    pub paid_amount: Money,
    /// Remaining amount due across the group
    pub due_amount: Money,
    /// Date the group was last considered paid, if any
    pub paid_date: Option<NaiveDate>,
    /// Current status
    pub status: AccountPaymentStatus,
    /// Active promise-to-pay date, if any
    pub ptp_date: Option<NaiveDate>,
    /// Last update timestamp
    pub udate: DateTime<Utc>,
}

impl AccountPayment {
    /// Creates a new empty account payment for a due date
    pub fn new(account_id: AccountId, due_date: NaiveDate, currency: core_kernel::Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            id: AccountPaymentId::new_v7(),
            account_id,
            due_date,
            principal_amount: zero,
            interest_amount: zero,
            late_fee_amount: zero,
            late_fee_applied: 0,
            paid_principal: zero,
            paid_interest: zero,
            paid_late_fee: zero,
            paid_amount: zero,
            due_amount: zero,
            paid_date: None,
            status: AccountPaymentStatus::NotDue,
            ptp_date: None,
            udate: Utc::now(),
        }
    }

    /// Mirrors a payment-level component reversal onto the aggregate
    ///
    /// Applies the same three deltas the payment received: component down,
    /// paid_amount down, due_amount up.
    pub fn mirror_reversal(
        &mut self,
        component: PaymentComponent,
        delta: Money,
    ) -> Result<(), ServicingError> {
        match component {
            PaymentComponent::LateFee => {
                self.paid_late_fee = self.paid_late_fee.checked_sub(&delta)?;
            }
            PaymentComponent::Interest => {
                self.paid_interest = self.paid_interest.checked_sub(&delta)?;
            }
            PaymentComponent::Principal => {
                self.paid_principal = self.paid_principal.checked_sub(&delta)?;
            }
        }
        self.paid_amount = self.paid_amount.checked_sub(&delta)?;
        self.due_amount = self.due_amount.checked_add(&delta)?;
        self.udate = Utc::now();
        Ok(())
    }

    /// Recomputes the outstanding bound from the group's payments
    ///
    /// Sums `(installment_principal - paid_principal) + (installment_interest
    /// - paid_interest) + (late_fee_amount - paid_late_fee)` across all
    /// payments that are not yet fully paid.
    pub fn outstanding_bound(&self, payments: &[&Payment]) -> Money {
        payments
            .iter()
            .filter(|p| !p.is_paid_off())
            .fold(Money::zero(self.due_amount.currency()), |acc, p| {
                acc + p.outstanding()
            })
    }

    /// Clamps the stored due amount down to the outstanding bound
    ///
    /// One-directional ratchet: never raises the stored value. Returns true
    /// if it changed.
    pub fn clamp_due_amount(&mut self, payments: &[&Payment]) -> bool {
        let bound = self.outstanding_bound(payments);
        let clamped = self.due_amount.clamp_at_most(bound);
        if clamped != self.due_amount {
            tracing::warn!(
                account_payment_id = %self.id,
                stored = %self.due_amount,
                bound = %bound,
                "account payment due amount exceeded outstanding bound, clamping"
            );
            self.due_amount = clamped;
            self.udate = Utc::now();
            true
        } else {
            false
        }
    }

    /// Derives the status from the group's payments
    pub fn derive_status(
        &self,
        payments: &[&Payment],
        as_of: NaiveDate,
        context: StatusContext,
    ) -> AccountPaymentStatus {
        let all_paid = !payments.is_empty() && payments.iter().all(|p| p.is_paid_off());
        if context == StatusContext::Forward && self.status.is_paid() && all_paid {
            return self.status;
        }
        if all_paid {
            let paid_on = self.derive_paid_date(payments).unwrap_or(as_of);
            return if paid_on <= self.due_date {
                AccountPaymentStatus::PaidOnTime
            } else if paid_on <= self.due_date + chrono::Duration::days(GRACE_PERIOD_DAYS) {
                AccountPaymentStatus::PaidInGrace
            } else {
                AccountPaymentStatus::PaidLate
            };
        }
        if as_of < self.due_date - chrono::Duration::days(DUE_SOON_DAYS) {
            AccountPaymentStatus::NotDue
        } else if as_of < self.due_date {
            AccountPaymentStatus::DueSoon
        } else if as_of == self.due_date {
            AccountPaymentStatus::Due
        } else {
            AccountPaymentStatus::Overdue
        }
    }

    /// Derives the paid date as the latest paid date among the group
    pub fn derive_paid_date(&self, payments: &[&Payment]) -> Option<NaiveDate> {
        payments.iter().filter_map(|p| p.paid_date).max()
    }

    /// Verifies the aggregate-sum invariant against the group's payments
    pub fn is_consistent_with(&self, payments: &[&Payment]) -> bool {
        let currency = self.paid_amount.currency();
        let zero = Money::zero(currency);
        let sum_paid = payments.iter().fold(zero, |acc, p| acc + p.paid_amount);
        let sum_principal = payments.iter().fold(zero, |acc, p| acc + p.paid_principal);
        let sum_interest = payments.iter().fold(zero, |acc, p| acc + p.paid_interest);
        let sum_late_fee = payments.iter().fold(zero, |acc, p| acc + p.paid_late_fee);
        self.paid_amount == sum_paid
            && self.paid_principal == sum_principal
            && self.paid_interest == sum_interest
            && self.paid_late_fee == sum_late_fee
    }
}
