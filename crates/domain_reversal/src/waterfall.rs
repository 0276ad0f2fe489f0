//! Waterfall allocator
//!
//! Reversal peels a monetary amount off a payment group one component at a
//! time: late fee, then interest, then principal. Each delta taken from a
//! payment is mirrored onto the owning account payment so the aggregate
//! invariant holds at every step.

use core_kernel::Money;
use domain_servicing::{AccountPayment, Payment, PaymentComponent};

use crate::error::ReversalError;

/// Result of allocating one component across a payment group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationStep {
    /// Amount still left to reverse after this component
    pub remaining: Money,
    /// Total reversed for this component across the group
    pub reversed: Money,
}

/// Reverses up to `amount` of one paid component across `payments`
///
/// Payments are visited in the caller-supplied order. A payment with
/// nothing paid for the component is skipped; otherwise
/// `min(remaining, paid_component)` is reversed off it and mirrored onto
/// `account_payment`. Iteration stops the moment the remaining amount
/// reaches zero.
///
/// Returns `(remaining, total_reversed_for_component)` as an
/// [`AllocationStep`].
pub fn allocate(
    payments: &mut [Payment],
    account_payment: &mut AccountPayment,
    amount: Money,
    component: PaymentComponent,
) -> Result<AllocationStep, ReversalError> {
    let mut remaining = amount;
    let mut reversed = Money::zero(amount.currency());

    for payment in payments.iter_mut() {
        if remaining.is_zero() {
            break;
        }
        let paid = payment.paid_component(component);
        if !paid.is_positive() {
            continue;
        }
        let delta = remaining.min(paid);
        payment.reverse_component(component, delta)?;
        account_payment.mirror_reversal(component, delta)?;
        remaining = remaining.checked_sub(&delta)?;
        reversed = reversed.checked_add(&delta)?;
    }

    Ok(AllocationStep {
        remaining,
        reversed,
    })
}

/// Runs the full three-component waterfall over a payment group
///
/// Components are exhausted in the fixed reversal order. If the amount
/// exceeds the sum of all paid components across the group, the excess is
/// dropped with a warning: a payment event whose recorded amount exceeds
/// what was actually allocated is a data-consistency anomaly to log, not a
/// reason to halt a customer-facing reversal.
pub fn allocate_all(
    payments: &mut [Payment],
    account_payment: &mut AccountPayment,
    amount: Money,
) -> Result<WaterfallResult, ReversalError> {
    let mut remaining = amount;
    let zero = Money::zero(amount.currency());
    let mut result = WaterfallResult {
        reversed_late_fee: zero,
        reversed_interest: zero,
        reversed_principal: zero,
        dropped: zero,
    };

    for component in PaymentComponent::REVERSAL_ORDER {
        let step = allocate(payments, account_payment, remaining, component)?;
        remaining = step.remaining;
        match component {
            PaymentComponent::LateFee => result.reversed_late_fee = step.reversed,
            PaymentComponent::Interest => result.reversed_interest = step.reversed,
            PaymentComponent::Principal => result.reversed_principal = step.reversed,
        }
        if remaining.is_zero() {
            break;
        }
    }

    if remaining.is_positive() {
        tracing::warn!(
            account_payment_id = %account_payment.id,
            requested = %amount,
            dropped = %remaining,
            "reversal amount exceeds paid components, dropping excess"
        );
        result.dropped = remaining;
    }

    Ok(result)
}

/// Per-component totals reversed by one waterfall run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterfallResult {
    pub reversed_late_fee: Money,
    pub reversed_interest: Money,
    pub reversed_principal: Money,
    /// Excess that could not be matched to any paid component
    pub dropped: Money,
}

impl WaterfallResult {
    /// Sum reversed across all three components
    pub fn total(&self) -> Money {
        self.reversed_late_fee + self.reversed_interest + self.reversed_principal
    }
}
