//! Domain assertions
//!
//! Invariant checks shared by test suites: panic with a diagnostic message
//! when the invariant does not hold.

use core_kernel::Money;
use domain_reversal::outcome::ReversalOutcome;
use domain_servicing::{AccountPayment, Payment};

/// Asserts the component-sum invariant on one payment
pub fn assert_component_invariant(payment: &Payment) {
    assert!(
        payment.components_are_consistent(),
        "payment {} breaks paid_amount == principal + interest + late_fee: {} != {} + {} + {}",
        payment.id,
        payment.paid_amount,
        payment.paid_principal,
        payment.paid_interest,
        payment.paid_late_fee,
    );
}

/// Asserts an account payment's money fields equal the sums over its group
pub fn assert_aggregate_consistency(account_payment: &AccountPayment, payments: &[&Payment]) {
    for payment in payments {
        assert_component_invariant(payment);
    }
    assert!(
        account_payment.is_consistent_with(payments),
        "account payment {} is inconsistent with its {} payments (paid_amount {})",
        account_payment.id,
        payments.len(),
        account_payment.paid_amount,
    );
}

/// Asserts the conservation property of one reversal outcome
///
/// The sum reversed across all three components never exceeds the original
/// event magnitude.
pub fn assert_conservation(outcome: &ReversalOutcome, original_amount: Money) {
    let total = outcome.totals.total();
    assert!(
        total <= original_amount,
        "reversal outcome reversed {} which exceeds the original {}",
        total,
        original_amount,
    );
}

/// Asserts the due-amount ratchet on one payment
pub fn assert_due_amount_ratchet(payment: &Payment) {
    assert!(
        payment.due_amount <= payment.outstanding(),
        "payment {} due_amount {} exceeds outstanding bound {}",
        payment.id,
        payment.due_amount,
        payment.outstanding(),
    );
}
