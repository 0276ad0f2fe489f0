//! Pre-reversal snapshots
//!
//! Before the waterfall allocator mutates a payment group, the orchestrator
//! captures each payment's paid components and due amount. The recorder
//! diffs against this snapshot to size void events and derive the reversed
//! principal/interest/late-fee split.

use std::collections::BTreeMap;

use core_kernel::{Money, PaymentId};
use domain_servicing::Payment;

/// Captured paid state of one payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSnapshot {
    pub paid_amount: Money,
    pub paid_principal: Money,
    pub paid_interest: Money,
    pub paid_late_fee: Money,
    /// Due amount before allocation; void events snapshot this value
    pub due_amount: Money,
}

/// Snapshot of a payment group taken before allocation
#[derive(Debug, Clone, Default)]
pub struct PreReversalSnapshot {
    entries: BTreeMap<PaymentId, PaymentSnapshot>,
}

impl PreReversalSnapshot {
    /// Captures the paid state of every payment in the group
    pub fn capture(payments: &[Payment]) -> Self {
        let entries = payments
            .iter()
            .map(|p| {
                (
                    p.id,
                    PaymentSnapshot {
                        paid_amount: p.paid_amount,
                        paid_principal: p.paid_principal,
                        paid_interest: p.paid_interest,
                        paid_late_fee: p.paid_late_fee,
                        due_amount: p.due_amount,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Returns the captured state for one payment
    pub fn get(&self, payment_id: &PaymentId) -> Option<&PaymentSnapshot> {
        self.entries.get(payment_id)
    }

    /// Total paid amount reversed for a payment relative to the snapshot
    ///
    /// Zero (not negative) when the payment is unchanged or was never
    /// captured.
    pub fn total_reversed(&self, payment: &Payment) -> Money {
        match self.entries.get(&payment.id) {
            Some(snap) => (snap.paid_amount - payment.paid_amount).floor_zero(),
            None => Money::zero(payment.paid_amount.currency()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{AccountPaymentId, LoanId};
    use domain_servicing::PaymentComponent;

    fn payment() -> Payment {
        let mut p = Payment::new(
            LoanId::new(),
            AccountPaymentId::new(),
            Money::idr(75_000),
            Money::idr(20_000),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        );
        p.paid_principal = Money::idr(75_000);
        p.paid_interest = Money::idr(20_000);
        p.paid_amount = Money::idr(95_000);
        p.due_amount = Money::idr(0);
        p
    }

    #[test]
    fn test_total_reversed_diffs_against_snapshot() {
        let mut p = payment();
        let snapshot = PreReversalSnapshot::capture(std::slice::from_ref(&p));

        p.reverse_component(PaymentComponent::Interest, Money::idr(20_000))
            .unwrap();
        p.reverse_component(PaymentComponent::Principal, Money::idr(10_000))
            .unwrap();

        assert_eq!(snapshot.total_reversed(&p), Money::idr(30_000));
        assert_eq!(snapshot.get(&p.id).unwrap().due_amount, Money::idr(0));
    }

    #[test]
    fn test_unchanged_payment_reverses_nothing() {
        let p = payment();
        let snapshot = PreReversalSnapshot::capture(std::slice::from_ref(&p));
        assert!(snapshot.total_reversed(&p).is_zero());
    }

    #[test]
    fn test_uncaptured_payment_reverses_nothing() {
        let p = payment();
        let snapshot = PreReversalSnapshot::default();
        assert!(snapshot.total_reversed(&p).is_zero());
    }
}
