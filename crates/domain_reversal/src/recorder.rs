//! Payment reversal recorder
//!
//! After the waterfall allocator has adjusted a payment group, the recorder
//! diffs each payment against the pre-reversal snapshot and produces the
//! compensating ledger rows: void payment events, wallet and counter
//! entries, status re-derivations, and human-readable audit notes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use core_kernel::{AccountTransactionId, LoanId, Money, PaymentId};
use domain_servicing::{
    Account, CashbackCounterHistory, CustomerWallet, CustomerWalletHistory, Loan, LoanStatus,
    Payment, PaymentEvent, PaymentEventType, StatusContext, WalletChangeReason,
};

use crate::cashback;
use crate::context::CashbackScheme;
use crate::error::ReversalError;
use crate::outcome::{CommissionSplit, LoanStatusChange, PaymentStatusHistory, ReversalLog};
use crate::snapshot::PreReversalSnapshot;

/// Mutable slice of the working set one recorder run operates on
pub struct RecorderScope<'a> {
    /// The allocated payment group
    pub group: &'a mut [Payment],
    /// All loans of the account
    pub loans: &'a mut BTreeMap<LoanId, Loan>,
    /// The account under reversal
    pub account: &'a mut Account,
    /// The customer wallet
    pub wallet: &'a mut CustomerWallet,
    /// Payments outside the extracted group (read-only)
    pub other_payments: &'a BTreeMap<PaymentId, Payment>,
    /// Full event ledger (read-only, pre-reversal)
    pub all_events: &'a [PaymentEvent],
    /// Wallet ledger, chronological
    pub wallet_histories: &'a [CustomerWalletHistory],
    /// Counter ledger, chronological
    pub counter_histories: &'a [CashbackCounterHistory],
    /// Cashback scheme configuration
    pub scheme: &'a CashbackScheme,
    /// Whether the claim experiment is active on the reversal date
    pub claim_experiment_active: bool,
    /// Civil date of the reversal
    pub today: NaiveDate,
}

/// Per-event parameters for one recorder run
pub struct RecorderParams<'a> {
    /// Void event type to write (`payment_void` or `customer_wallet_void`)
    pub void_event_type: PaymentEventType,
    /// The transaction being reversed; its events no longer count toward
    /// the inferred paid date
    pub reversed_transaction: AccountTransactionId,
    /// Receipt reference carried over from the original event
    pub payment_receipt: Option<String>,
    /// Payment method label carried over from the original event
    pub payment_method: Option<String>,
    /// Free-text note for the audit trail
    pub note: Option<&'a str>,
    /// True when the original payment was funded from the customer wallet
    pub paid_with_cashback: bool,
}

/// Records compensating ledger rows for every payment whose balance
/// decreased relative to the snapshot
///
/// Returns the created void events (payments with no balance change produce
/// none). Status changes, wallet/counter rows, and commission splits land
/// in the log.
pub fn record_reversals(
    scope: &mut RecorderScope<'_>,
    snapshot: &PreReversalSnapshot,
    params: &RecorderParams<'_>,
    log: &mut ReversalLog,
) -> Result<Vec<PaymentEvent>, ReversalError> {
    let mut voids = Vec::new();
    let mut touched_loans: BTreeSet<LoanId> = BTreeSet::new();

    for payment in scope.group.iter_mut() {
        let total_reversed = snapshot.total_reversed(payment);
        if !total_reversed.is_positive() {
            // Zero-change payments produce no void event
            continue;
        }
        let snap = *snapshot
            .get(&payment.id)
            .expect("reversed payment must have a snapshot entry");
        touched_loans.insert(payment.loan_id);

        // Void event snapshots the pre-allocation due amount
        let event = PaymentEvent::void(
            payment.id,
            params.void_event_type,
            total_reversed,
            snap.due_amount,
            scope.today,
            params.payment_receipt.clone(),
            params.payment_method.clone(),
        );

        if params.void_event_type == PaymentEventType::PaymentVoid {
            log.commission_splits.push(CommissionSplit {
                payment_id: payment.id,
                principal: (snap.paid_principal - payment.paid_principal).floor_zero(),
                interest: (snap.paid_interest - payment.paid_interest).floor_zero(),
                late_fee: (snap.paid_late_fee - payment.paid_late_fee).floor_zero(),
            });
        }

        payment.paid_date =
            infer_paid_date(scope.all_events, payment.id, params.reversed_transaction);

        let loan = scope
            .loans
            .get_mut(&payment.loan_id)
            .ok_or_else(|| ReversalError::missing("Loan", payment.loan_id))?;
        let loan_was_paid_off = loan.status == LoanStatus::PaidOff;

        if scope.scheme.eligible && params.void_event_type != PaymentEventType::CustomerWalletVoid
        {
            let latest = latest_counter_for(scope.counter_histories, payment.id);
            let siblings = latest_sibling_counters(
                scope.counter_histories,
                payment.account_payment_id,
            );
            let decision =
                cashback::counter_decision(latest, &siblings, scope.scheme.counter_ceiling);
            tracing::debug!(
                payment_id = %payment.id,
                ?decision,
                "cashback counter decision for reversal"
            );
            if let Some(row) = cashback::counter_row_for(payment, decision) {
                log.counter_entries.push(row);
            }
        }

        if loan_was_paid_off {
            let latest_overpaid = scope
                .wallet_histories
                .iter()
                .rev()
                .find(|h| h.change_reason == WalletChangeReason::CashbackOverPaid);
            if let Some(row) = cashback::reverse_overpaid_cashback(scope.wallet, latest_overpaid) {
                log.wallet_entries.push(row);
            }
            if let Some(row) = cashback::reverse_cashback_available(scope.wallet, loan) {
                log.wallet_entries.push(row);
            }
        }

        if let Some(row) = cashback::reverse_cashback_earned(scope.wallet, loan, payment) {
            log.wallet_entries.push(row);
        }

        if scope.claim_experiment_active {
            log.claim_voids.push(payment.id);
        }

        let new_status = payment.derive_status(scope.today, StatusContext::Reversal);
        if new_status != payment.status {
            log.payment_status_histories.push(PaymentStatusHistory {
                payment_id: payment.id,
                status_old: payment.status,
                status_new: new_status,
                changed_at: chrono::Utc::now(),
            });
            payment.status = new_status;
        }

        payment.clamp_due_amount();

        if params.paid_with_cashback {
            // Refund the wallet-funded amount to both balances
            let refund = total_reversed.abs();
            log.wallet_entries.push(scope.wallet.apply_change(
                refund,
                refund,
                WalletChangeReason::CustomerWalletVoid,
                Some(payment.id),
            ));
        }

        payment.add_note(compose_note(
            params.void_event_type,
            total_reversed,
            scope.today,
            params.payment_method.as_deref(),
            params.note,
        ));

        voids.push(event);
    }

    reconcile_loan_statuses(scope, &touched_loans, params.void_event_type, log)?;

    Ok(voids)
}

/// Re-derives the status of every loan touched by this recorder run
///
/// A loan that drops out of the paid-off state reduces the account's
/// paid-off total and is flagged for the early-limit-release rollback.
fn reconcile_loan_statuses(
    scope: &mut RecorderScope<'_>,
    touched_loans: &BTreeSet<LoanId>,
    void_event_type: PaymentEventType,
    log: &mut ReversalLog,
) -> Result<(), ReversalError> {
    for loan_id in touched_loans {
        let loan = scope
            .loans
            .get_mut(loan_id)
            .ok_or_else(|| ReversalError::missing("Loan", loan_id))?;
        let mut loan_payments: Vec<&Payment> = scope
            .other_payments
            .values()
            .filter(|p| p.loan_id == *loan_id)
            .collect();
        loan_payments.extend(scope.group.iter().filter(|p| p.loan_id == *loan_id));

        let new_status = loan.derive_status(&loan_payments, scope.today);
        if new_status != loan.status {
            log.loan_status_changes.push(LoanStatusChange {
                loan_id: *loan_id,
                status_old: loan.status,
                status_new: new_status,
                change_reason: void_event_type.as_str().to_string(),
            });
            if loan.status == LoanStatus::PaidOff && new_status != LoanStatus::PaidOff {
                log.paid_off_dropped_loans.push(*loan_id);
                scope.account.paid_off_amount =
                    (scope.account.paid_off_amount - loan.loan_amount).floor_zero();
            }
            loan.status = new_status;
        }
    }
    Ok(())
}

/// Infers a payment's paid date from the events that remain after reversal
///
/// The latest forward event date, excluding events that belong to the
/// transaction being reversed. `None` when no forward event remains.
pub fn infer_paid_date(
    events: &[PaymentEvent],
    payment_id: PaymentId,
    reversed_transaction: AccountTransactionId,
) -> Option<NaiveDate> {
    events
        .iter()
        .filter(|e| e.payment_id == payment_id)
        .filter(|e| {
            matches!(
                e.event_type,
                PaymentEventType::Payment | PaymentEventType::CustomerWallet
            )
        })
        .filter(|e| e.account_transaction_id != Some(reversed_transaction))
        .map(|e| e.event_date)
        .max()
}

/// Composes the human-readable audit note appended to the payment
fn compose_note(
    void_event_type: PaymentEventType,
    amount: Money,
    date: NaiveDate,
    method: Option<&str>,
    note: Option<&str>,
) -> String {
    let mut text = format!(
        "[Reversal] type: {}, amount: {}, date: {}",
        void_event_type.as_str(),
        amount.display_grouped(),
        date
    );
    if let Some(method) = method {
        text.push_str(&format!(", method: {}", method));
    }
    if let Some(note) = note {
        text.push_str(&format!("\nnote: {}", note));
    }
    text
}

fn latest_counter_for(histories: &[CashbackCounterHistory], payment_id: PaymentId) -> Option<u32> {
    histories
        .iter()
        .rev()
        .find(|h| h.payment_id == Some(payment_id))
        .map(|h| h.counter)
}

fn latest_sibling_counters(
    histories: &[CashbackCounterHistory],
    exclude: core_kernel::AccountPaymentId,
) -> Vec<u32> {
    let mut latest: BTreeMap<core_kernel::AccountPaymentId, u32> = BTreeMap::new();
    for row in histories {
        if row.account_payment_id != exclude {
            latest.insert(row.account_payment_id, row.counter);
        }
    }
    latest.into_values().collect()
}
