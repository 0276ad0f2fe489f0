//! Installment payments
//!
//! A Payment is one installment of a loan. Its paid_* component fields are
//! mutated by the repayment engine when money arrives and by the reversal
//! engine when a transaction is undone; the invariant
//! `paid_amount == paid_principal + paid_interest + paid_late_fee` holds at
//! every consistent snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountPaymentId, LoanId, Money, PaymentId};

use crate::error::ServicingError;

/// Days before the due date during which a payment counts as due soon
pub const DUE_SOON_DAYS: i64 = 3;

/// Days of grace after the due date before a paid payment counts as late
pub const GRACE_PERIOD_DAYS: i64 = 4;

/// Amortization components of an installment, in reversal order
///
/// Reversal peels components in the order below; the forward repayment
/// waterfall pays late fee first, so reversal unwinds last-applied-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentComponent {
    /// Accrued late fees
    LateFee,
    /// Installment interest
    Interest,
    /// Installment principal
    Principal,
}

impl PaymentComponent {
    /// Fixed component order used when reversing a payment
    pub const REVERSAL_ORDER: [PaymentComponent; 3] = [
        PaymentComponent::LateFee,
        PaymentComponent::Interest,
        PaymentComponent::Principal,
    ];
}

/// Status of an installment payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Due date is far in the future
    NotDue,
    /// Due within the due-soon window
    DueSoon,
    /// Due today
    Due,
    /// Past due and unpaid
    Overdue,
    /// Fully paid on or before the due date
    PaidOnTime,
    /// Fully paid within the grace period
    PaidInGrace,
    /// Fully paid after the grace period
    PaidLate,
}

impl PaymentStatus {
    /// Returns true for any of the fully-paid statuses
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            PaymentStatus::PaidOnTime | PaymentStatus::PaidInGrace | PaymentStatus::PaidLate
        )
    }
}

/// How a status derivation should treat the current stored state
///
/// `Reversal` derives purely from the amounts and dates on the record,
/// ignoring any previously stored paid status. This replaces the historical
/// force-to-not-due-then-recompute write: a partially-reversed payment is
/// re-derived correctly even when it was paid off before the reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusContext {
    Forward,
    Reversal,
}

/// One installment of a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Owning loan
    pub loan_id: LoanId,
    /// Owning account payment (same-date group)
    pub account_payment_id: AccountPaymentId,
    /// Scheduled principal for this installment
    pub installment_principal: Money,
    /// Scheduled interest for this installment
    pub installment_interest: Money,
    /// Late fee accrued so far
    pub late_fee_amount: Money,
    /// Number of times a late fee was applied
    pub late_fee_applied: u32,
    /// Principal paid so far
    pub paid_principal: Money,
    /// Interest paid so far
    pub paid_interest: Money,
    /// Late fee paid so far
    pub paid_late_fee: Money,
    /// Total paid (sum of the three components)
    pub paid_amount: Money,
    /// Remaining amount due
    pub due_amount: Money,
    /// Scheduled due date
    pub due_date: NaiveDate,
    /// Date the payment was last considered paid, if any
    pub paid_date: Option<NaiveDate>,
    /// Current status
    pub status: PaymentStatus,
    /// Cashback earned by paying this installment
    pub cashback_earned: Money,
    /// Human-readable audit notes, newest last
    pub notes: Vec<String>,
    /// Last update timestamp
    pub udate: DateTime<Utc>,
}

impl Payment {
    /// Creates a new unpaid installment
    pub fn new(
        loan_id: LoanId,
        account_payment_id: AccountPaymentId,
        installment_principal: Money,
        installment_interest: Money,
        due_date: NaiveDate,
    ) -> Self {
        let currency = installment_principal.currency();
        let zero = Money::zero(currency);
        Self {
            id: PaymentId::new_v7(),
            loan_id,
            account_payment_id,
            installment_principal,
            installment_interest,
            late_fee_amount: zero,
            late_fee_applied: 0,
            paid_principal: zero,
            paid_interest: zero,
            paid_late_fee: zero,
            paid_amount: zero,
            due_amount: installment_principal + installment_interest,
            due_date,
            paid_date: None,
            status: PaymentStatus::NotDue,
            cashback_earned: zero,
            notes: Vec::new(),
            udate: Utc::now(),
        }
    }

    /// Returns the paid amount for one component
    pub fn paid_component(&self, component: PaymentComponent) -> Money {
        match component {
            PaymentComponent::LateFee => self.paid_late_fee,
            PaymentComponent::Interest => self.paid_interest,
            PaymentComponent::Principal => self.paid_principal,
        }
    }

    /// Remaining outstanding amount across all components
    ///
    /// `(installment_principal - paid_principal) + (installment_interest -
    /// paid_interest) + (late_fee_amount - paid_late_fee)`, floored at zero
    /// per component.
    pub fn outstanding(&self) -> Money {
        let principal = (self.installment_principal - self.paid_principal).floor_zero();
        let interest = (self.installment_interest - self.paid_interest).floor_zero();
        let late_fee = (self.late_fee_amount - self.paid_late_fee).floor_zero();
        principal + interest + late_fee
    }

    /// Returns true when every component is fully covered
    pub fn is_paid_off(&self) -> bool {
        self.outstanding().is_zero()
    }

    /// Reverses `delta` off one paid component
    ///
    /// Decrements the component and `paid_amount`, increments `due_amount`.
    /// The caller is responsible for sizing `delta` to at most the paid
    /// component (the waterfall allocator does).
    pub fn reverse_component(
        &mut self,
        component: PaymentComponent,
        delta: Money,
    ) -> Result<(), ServicingError> {
        if delta.is_negative() {
            return Err(ServicingError::Validation(format!(
                "reversal delta must be non-negative, got {}",
                delta
            )));
        }
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

    /// Derives the status from the current amounts and dates
    pub fn derive_status(&self, as_of: NaiveDate, context: StatusContext) -> PaymentStatus {
        if context == StatusContext::Forward && self.status.is_paid() && self.is_paid_off() {
            // Forward derivation never downgrades a settled installment
            return self.status;
        }
        if self.is_paid_off() && self.paid_amount.is_positive() {
            let paid_on = self.paid_date.unwrap_or(as_of);
            return if paid_on <= self.due_date {
                PaymentStatus::PaidOnTime
            } else if paid_on <= self.due_date + chrono::Duration::days(GRACE_PERIOD_DAYS) {
                PaymentStatus::PaidInGrace
            } else {
                PaymentStatus::PaidLate
            };
        }
        if as_of < self.due_date - chrono::Duration::days(DUE_SOON_DAYS) {
            PaymentStatus::NotDue
        } else if as_of < self.due_date {
            PaymentStatus::DueSoon
        } else if as_of == self.due_date {
            PaymentStatus::Due
        } else {
            PaymentStatus::Overdue
        }
    }

    /// Clamps `due_amount` down to the computed outstanding bound
    ///
    /// One-directional: never raises the stored due amount. Returns true if
    /// the stored value changed.
    pub fn clamp_due_amount(&mut self) -> bool {
        let bound = self.outstanding();
        let clamped = self.due_amount.clamp_at_most(bound);
        if clamped != self.due_amount {
            tracing::warn!(
                payment_id = %self.id,
                stored = %self.due_amount,
                bound = %bound,
                "due amount exceeded outstanding bound, clamping"
            );
            self.due_amount = clamped;
            self.udate = Utc::now();
            true
        } else {
            false
        }
    }

    /// Verifies the component-sum invariant
    pub fn components_are_consistent(&self) -> bool {
        self.paid_principal + self.paid_interest + self.paid_late_fee == self.paid_amount
    }

    /// Appends an audit note
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
        self.udate = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Money;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn paid_payment() -> Payment {
        let mut p = Payment::new(
            LoanId::new(),
            AccountPaymentId::new(),
            Money::idr(75_000),
            Money::idr(20_000),
            d(2026, 2, 1),
        );
        p.late_fee_amount = Money::idr(5_000);
        p.paid_principal = Money::idr(75_000);
        p.paid_interest = Money::idr(20_000);
        p.paid_late_fee = Money::idr(5_000);
        p.paid_amount = Money::idr(100_000);
        p.due_amount = Money::idr(0);
        p.paid_date = Some(d(2026, 2, 1));
        p.status = PaymentStatus::PaidOnTime;
        p
    }

    #[test]
    fn test_new_payment_due_amount() {
        let p = Payment::new(
            LoanId::new(),
            AccountPaymentId::new(),
            Money::idr(75_000),
            Money::idr(20_000),
            d(2026, 2, 1),
        );
        assert_eq!(p.due_amount, Money::idr(95_000));
        assert!(p.components_are_consistent());
        assert!(!p.is_paid_off());
    }

    #[test]
    fn test_reverse_component_maintains_invariant() {
        let mut p = paid_payment();
        p.reverse_component(PaymentComponent::LateFee, Money::idr(5_000))
            .unwrap();
        assert_eq!(p.paid_late_fee, Money::idr(0));
        assert_eq!(p.paid_amount, Money::idr(95_000));
        assert_eq!(p.due_amount, Money::idr(5_000));
        assert!(p.components_are_consistent());
    }

    #[test]
    fn test_reverse_component_rejects_negative_delta() {
        let mut p = paid_payment();
        let err = p.reverse_component(PaymentComponent::Interest, Money::idr(-1));
        assert!(err.is_err());
    }

    #[test]
    fn test_status_forward_keeps_settled() {
        let p = paid_payment();
        assert_eq!(
            p.derive_status(d(2026, 3, 1), StatusContext::Forward),
            PaymentStatus::PaidOnTime
        );
    }

    #[test]
    fn test_status_reversal_rederives_from_state() {
        let mut p = paid_payment();
        p.reverse_component(PaymentComponent::Principal, Money::idr(10_000))
            .unwrap();
        // No longer paid off; derived from dates, not the stored paid status
        let status = p.derive_status(d(2026, 3, 1), StatusContext::Reversal);
        assert_eq!(status, PaymentStatus::Overdue);
    }

    #[test]
    fn test_status_reversal_paid_in_grace() {
        let mut p = paid_payment();
        p.paid_date = Some(d(2026, 2, 4));
        let status = p.derive_status(d(2026, 3, 1), StatusContext::Reversal);
        assert_eq!(status, PaymentStatus::PaidInGrace);
    }

    #[test]
    fn test_clamp_due_amount_is_ratchet() {
        let mut p = paid_payment();
        p.due_amount = Money::idr(50_000); // drifted above the zero bound
        assert!(p.clamp_due_amount());
        assert_eq!(p.due_amount, Money::idr(0));
        // Already at the bound: no change
        assert!(!p.clamp_due_amount());
    }
}
