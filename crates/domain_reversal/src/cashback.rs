//! Cashback and wallet reconciliation
//!
//! Three independent checks may fire in combination when a payment is
//! reversed: the tiered-scheme counter adjustment, the claim-experiment
//! void, and the overpaid-cashback ledger reversal. The counter rule at the
//! ceiling depends on sibling account payments' latest counters, which is
//! the cross-aggregate invariant this module isolates.

use core_kernel::Money;
use domain_servicing::{
    CashbackCounterHistory, CustomerWallet, CustomerWalletHistory, Loan, Payment,
    WalletChangeReason,
};

/// Decision for the cashback counter when a payment is reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDecision {
    /// No counter history exists for the payment; nothing to move
    NoHistory,
    /// Counter is at the ceiling and a sibling also sits at the ceiling;
    /// hold, do not step down
    HoldAtCeiling { ceiling: u32 },
    /// Step the counter down one (floored at zero)
    StepDown { from: u32, to: u32 },
}

/// Decides the counter movement for a reversed payment
///
/// - below the ceiling: always step down one, floor zero
/// - at the ceiling: hold only if at least one sibling account payment's
///   latest counter is also at the ceiling, else step down
pub fn counter_decision(
    latest_for_payment: Option<u32>,
    sibling_latest: &[u32],
    ceiling: u32,
) -> CounterDecision {
    let Some(current) = latest_for_payment else {
        return CounterDecision::NoHistory;
    };
    if current >= ceiling {
        if sibling_latest.iter().any(|&c| c >= ceiling) {
            return CounterDecision::HoldAtCeiling { ceiling };
        }
        return CounterDecision::StepDown {
            from: current,
            to: current.saturating_sub(1),
        };
    }
    CounterDecision::StepDown {
        from: current,
        to: current.saturating_sub(1),
    }
}

/// Reverses the latest overpaid-cashback wallet credit, if one exists
///
/// Applies exactly the recorded deltas in the opposite direction and tags
/// the compensating row `cashback_over_paid_void`.
pub fn reverse_overpaid_cashback(
    wallet: &mut CustomerWallet,
    latest_overpaid: Option<&CustomerWalletHistory>,
) -> Option<CustomerWalletHistory> {
    let entry = latest_overpaid?;
    let accruing_delta = entry.accruing_delta();
    let available_delta = entry.available_delta();
    if accruing_delta.is_zero() && available_delta.is_zero() {
        return None;
    }
    Some(wallet.apply_change(
        -accruing_delta,
        -available_delta,
        WalletChangeReason::CashbackOverPaidVoid,
        entry.payment_id,
    ))
}

/// Claws back the loan-level available cashback granted at payoff
pub fn reverse_cashback_available(
    wallet: &mut CustomerWallet,
    loan: &Loan,
) -> Option<CustomerWalletHistory> {
    if !loan.cashback_earned_total.is_positive() {
        return None;
    }
    Some(wallet.apply_change(
        Money::zero(loan.cashback_earned_total.currency()),
        -loan.cashback_earned_total,
        WalletChangeReason::CashbackAvailableVoid,
        None,
    ))
}

/// Reverses cashback earned by a payment
///
/// Subtracts from the loan's cumulative earned total, zeroes the payment's
/// `cashback_earned`, and debits the accruing wallet balance so the
/// compensating ledger row reflects the reversal.
pub fn reverse_cashback_earned(
    wallet: &mut CustomerWallet,
    loan: &mut Loan,
    payment: &mut Payment,
) -> Option<CustomerWalletHistory> {
    let earned = payment.cashback_earned;
    if !earned.is_positive() {
        return None;
    }
    loan.reverse_cashback_earned(earned);
    payment.cashback_earned = Money::zero(earned.currency());
    Some(wallet.apply_change(
        -earned,
        Money::zero(earned.currency()),
        WalletChangeReason::CashbackEarnedVoid,
        Some(payment.id),
    ))
}

/// Builds the counter row for a step-down decision
pub fn counter_row_for(
    payment: &Payment,
    decision: CounterDecision,
) -> Option<CashbackCounterHistory> {
    match decision {
        CounterDecision::StepDown { to, .. } => Some(CashbackCounterHistory::new(
            payment.account_payment_id,
            Some(payment.id),
            to,
        )),
        _ => None,
    }
}
