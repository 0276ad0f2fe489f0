//! Orchestrator-level tests for transaction reversal

mod common;

use common::{apply_full_payment, d, unpaid_account};
use core_kernel::Money;
use domain_reversal::orchestrator::{
    process_account_transaction_reversal, process_late_fee_reversal,
};
use domain_reversal::outcome::{AdjusterOutcome, DeferredEffect};
use domain_reversal::ReversalError;
use domain_servicing::{
    AccountTransaction, CommissionLookup, LoanStatus, PaymentEvent, PaymentEventType, Ptp,
    TransactionType, WalletChangeReason,
};

#[test]
fn test_full_reversal_restores_unpaid_state() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn_id = apply_full_payment(&mut h.ctx, payment_id, d(2026, 3, 1), TransactionType::Payment);

    let outcome =
        process_account_transaction_reversal(&mut h.ctx, txn_id, Some("admin correction"), false)
            .unwrap();

    let payment = &h.ctx.payments[&payment_id];
    assert_eq!(payment.paid_amount, Money::idr(0));
    assert_eq!(payment.paid_principal, Money::idr(0));
    assert_eq!(payment.paid_interest, Money::idr(0));
    assert_eq!(payment.paid_late_fee, Money::idr(0));
    assert_eq!(payment.due_amount, Money::idr(100_000));
    assert!(payment.components_are_consistent());
    assert!(payment.notes.iter().any(|n| n.contains("payment_void")));

    // Totals match the original amortization split
    assert_eq!(outcome.totals.principal, Money::idr(75_000));
    assert_eq!(outcome.totals.interest, Money::idr(20_000));
    assert_eq!(outcome.totals.late_fee, Money::idr(5_000));

    // One void event, negated, terminal, snapshotting the pre-reversal due
    assert_eq!(outcome.void_events.len(), 1);
    let void = &outcome.void_events[0];
    assert_eq!(void.amount, Money::idr(-100_000));
    assert_eq!(void.due_amount_after, Money::idr(0));
    assert!(!void.can_reverse);
    assert_eq!(
        void.account_transaction_id,
        Some(outcome.reversal_transaction.id)
    );

    // The reversal transaction negates the original
    assert_eq!(
        outcome.reversal_transaction.transaction_amount,
        Money::idr(-100_000)
    );
    assert_eq!(
        outcome.reversal_transaction.transaction_type,
        TransactionType::PaymentVoid
    );
    assert!(!outcome.reversal_transaction.can_reverse);

    // Aggregate consistency
    let ap = h.ctx.account_payments.values().next().unwrap();
    assert!(ap.is_consistent_with(&[payment]));

    // The loan dropped out of paid-off and the rollback effect is queued
    assert_eq!(h.ctx.loans[&h.loan_id].status, LoanStatus::Delinquent);
    assert!(outcome
        .deferred_effects
        .iter()
        .any(|e| matches!(e, DeferredEffect::RollbackEarlyLimitRelease { loan_ids } if loan_ids.contains(&h.loan_id))));
    assert!(outcome
        .loan_status_changes
        .iter()
        .any(|c| c.change_reason == "payment_void"));

    // Account status recompute carries the void type as override reason
    assert!(outcome
        .account_status_recomputes
        .iter()
        .all(|r| r.reason_override == "payment_void"));
}

#[test]
fn test_reversal_is_at_most_once() {
    let mut h = unpaid_account(1);
    let txn_id = apply_full_payment(
        &mut h.ctx,
        h.payment_ids[0],
        d(2026, 3, 1),
        TransactionType::Payment,
    );

    process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();
    let second = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false);
    assert!(matches!(
        second,
        Err(ReversalError::TransactionNotReversable(_))
    ));
}

#[test]
fn test_transaction_without_events_is_rejected() {
    let mut h = unpaid_account(1);
    let txn = AccountTransaction::new(
        h.ctx.account.id,
        d(2026, 3, 1),
        Money::idr(100_000),
        TransactionType::Payment,
        Money::idr(75_000),
        Money::idr(20_000),
        Money::idr(5_000),
    );
    let txn_id = txn.id;
    h.ctx.transactions.insert(txn_id, txn);

    let result = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false);
    assert!(matches!(result, Err(ReversalError::NoPaymentEvents(_))));
}

#[test]
fn test_late_fee_transaction_needs_dedicated_operation() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn = AccountTransaction::new(
        h.ctx.account.id,
        d(2026, 3, 10),
        Money::idr(5_000),
        TransactionType::LateFee,
        Money::idr(0),
        Money::idr(0),
        Money::idr(5_000),
    );
    let txn_id = txn.id;
    let mut event = PaymentEvent::new(
        payment_id,
        PaymentEventType::LateFee,
        Money::idr(5_000),
        Money::idr(100_000),
        d(2026, 3, 10),
        None,
        None,
    );
    event.attach_to(txn_id);
    h.ctx.events.push(event);
    h.ctx.transactions.insert(txn_id, txn);

    let result = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false);
    assert!(matches!(result, Err(ReversalError::WrongTransactionType(_))));
}

#[test]
fn test_idempotent_no_op_when_nothing_left_to_reverse() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn_id = apply_full_payment(&mut h.ctx, payment_id, d(2026, 3, 1), TransactionType::Payment);

    // Simulate a payment whose balances were already rolled back elsewhere
    {
        let p = h.ctx.payments.get_mut(&payment_id).unwrap();
        p.paid_principal = Money::idr(0);
        p.paid_interest = Money::idr(0);
        p.paid_late_fee = Money::idr(0);
        p.paid_amount = Money::idr(0);
        p.due_amount = Money::idr(100_000);
        let ap_id = p.account_payment_id;
        let ap = h.ctx.account_payments.get_mut(&ap_id).unwrap();
        ap.paid_principal = Money::idr(0);
        ap.paid_interest = Money::idr(0);
        ap.paid_late_fee = Money::idr(0);
        ap.paid_amount = Money::idr(0);
        ap.due_amount = Money::idr(100_000);
    }

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();
    assert!(outcome.void_events.is_empty());
    assert!(outcome.totals.total().is_zero());
    assert_eq!(h.ctx.payments[&payment_id].paid_amount, Money::idr(0));
    assert_eq!(h.ctx.payments[&payment_id].due_amount, Money::idr(100_000));
}

#[test]
fn test_cashback_funded_reversal_credits_wallet() {
    // Scenario D: reversing a wallet-funded payment refunds both balances
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn_id = apply_full_payment(
        &mut h.ctx,
        payment_id,
        d(2026, 3, 1),
        TransactionType::CustomerWallet,
    );

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();

    assert_eq!(outcome.void_events[0].event_type, PaymentEventType::CustomerWalletVoid);
    assert_eq!(h.ctx.wallet.balance_accruing, Money::idr(100_000));
    assert_eq!(h.ctx.wallet.balance_available, Money::idr(100_000));
    let refund = outcome
        .wallet_entries
        .iter()
        .find(|e| e.change_reason == WalletChangeReason::CustomerWalletVoid)
        .expect("refund entry");
    assert_eq!(refund.accruing_delta(), Money::idr(100_000));
    assert_eq!(refund.available_delta(), Money::idr(100_000));
    // Wallet voids never run the commission adjuster
    assert_eq!(outcome.adjuster, AdjusterOutcome::Skipped);
}

#[test]
fn test_cashback_earned_is_reversed() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn_id = apply_full_payment(&mut h.ctx, payment_id, d(2026, 3, 1), TransactionType::Payment);

    h.ctx.payments.get_mut(&payment_id).unwrap().cashback_earned = Money::idr(2_000);
    h.ctx.loans.get_mut(&h.loan_id).unwrap().cashback_earned_total = Money::idr(2_000);
    h.ctx.wallet.balance_accruing = Money::idr(2_000);

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();

    assert_eq!(h.ctx.payments[&payment_id].cashback_earned, Money::idr(0));
    assert_eq!(
        h.ctx.loans[&h.loan_id].cashback_earned_total,
        Money::idr(0)
    );
    assert!(outcome
        .wallet_entries
        .iter()
        .any(|e| e.change_reason == WalletChangeReason::CashbackEarnedVoid));
}

#[test]
fn test_counter_steps_down_on_reversal() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn_id = apply_full_payment(&mut h.ctx, payment_id, d(2026, 3, 1), TransactionType::Payment);

    let ap_id = h.ctx.payments[&payment_id].account_payment_id;
    h.ctx
        .counter_histories
        .push(domain_servicing::CashbackCounterHistory::new(
            ap_id,
            Some(payment_id),
            3,
        ));

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();

    assert!(outcome
        .counter_entries
        .iter()
        .any(|row| row.payment_id == Some(payment_id) && row.counter == 2));
}

#[test]
fn test_proven_flag_reevaluated() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let txn_id = apply_full_payment(&mut h.ctx, payment_id, d(2026, 3, 1), TransactionType::Payment);

    h.ctx.account.is_proven = true;
    h.ctx.account.paid_off_amount = Money::idr(600_000);

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();

    // The reversed loan (300k) drops the paid-off total below the 500k
    // threshold
    assert!(!h.ctx.account.is_proven);
    assert_eq!(outcome.property_histories.len(), 1);
    assert_eq!(outcome.property_histories[0].property, "is_proven");
}

#[test]
fn test_refinancing_reversal_marks_note_and_skips_rollback() {
    let mut h = unpaid_account(1);
    let txn_id = apply_full_payment(
        &mut h.ctx,
        h.payment_ids[0],
        d(2026, 3, 1),
        TransactionType::Payment,
    );

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, true).unwrap();

    assert!(outcome
        .reversal_transaction
        .note
        .as_deref()
        .unwrap()
        .contains("Refinancing void"));
    assert!(!outcome
        .deferred_effects
        .iter()
        .any(|e| matches!(e, DeferredEffect::RollbackEarlyLimitRelease { .. })));
}

#[test]
fn test_ptp_adjuster_runs_for_payment_void() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];
    let ap_id = h.ctx.payments[&payment_id].account_payment_id;
    let txn_id = apply_full_payment(&mut h.ctx, payment_id, d(2026, 3, 1), TransactionType::Payment);

    h.ctx.ptps.push(Ptp::new(
        ap_id,
        d(2026, 2, 25),
        d(2026, 7, 1),
        Money::idr(100_000),
    ));
    h.ctx.commissions.push(CommissionLookup::new(
        h.ctx.account.id,
        ap_id,
        Money::idr(100_000),
        Money::idr(5_000),
    ));

    let outcome = process_account_transaction_reversal(&mut h.ctx, txn_id, None, false).unwrap();

    assert_eq!(
        outcome.adjuster,
        AdjusterOutcome::Applied {
            ptps_cleared: 1,
            commissions_adjusted: 1
        }
    );
    assert_eq!(h.ctx.ptps[0].status, None);
    assert_eq!(
        h.ctx.account_payments[&ap_id].ptp_date,
        Some(d(2026, 7, 1))
    );
    assert_eq!(h.ctx.commissions[0].credited_amount, Money::idr(0));
}

#[test]
fn test_late_fee_reversal_unwinds_accrued_fee() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];

    let txn = AccountTransaction::new(
        h.ctx.account.id,
        d(2026, 3, 10),
        Money::idr(5_000),
        TransactionType::LateFee,
        Money::idr(0),
        Money::idr(0),
        Money::idr(5_000),
    );
    let txn_id = txn.id;
    let mut event = PaymentEvent::new(
        payment_id,
        PaymentEventType::LateFee,
        Money::idr(5_000),
        Money::idr(100_000),
        d(2026, 3, 10),
        None,
        None,
    );
    event.attach_to(txn_id);
    h.ctx.events.push(event);
    h.ctx.transactions.insert(txn_id, txn);
    h.ctx.payments.get_mut(&payment_id).unwrap().late_fee_applied = 1;

    let outcome = process_late_fee_reversal(&mut h.ctx, txn_id, Some("fee waiver")).unwrap();

    let payment = &h.ctx.payments[&payment_id];
    assert_eq!(payment.late_fee_amount, Money::idr(0));
    assert_eq!(payment.late_fee_applied, 0);
    assert_eq!(payment.due_amount, Money::idr(95_000));
    assert_eq!(outcome.totals.late_fee, Money::idr(5_000));
    assert_eq!(
        outcome.void_events[0].event_type,
        PaymentEventType::LateFeeVoid
    );
    assert_eq!(
        outcome.reversal_transaction.transaction_type,
        TransactionType::LateFeeVoid
    );

    // At-most-once holds for late fee reversals too
    let second = process_late_fee_reversal(&mut h.ctx, txn_id, None);
    assert!(matches!(
        second,
        Err(ReversalError::TransactionNotReversable(_))
    ));
}

#[test]
fn test_late_fee_reversal_never_drops_below_paid_fee() {
    let mut h = unpaid_account(1);
    let payment_id = h.payment_ids[0];

    // Customer already paid 3000 of the 5000 accrued fee
    {
        let p = h.ctx.payments.get_mut(&payment_id).unwrap();
        p.paid_late_fee = Money::idr(3_000);
        p.paid_amount = Money::idr(3_000);
        p.due_amount = Money::idr(97_000);
        p.late_fee_applied = 1;
    }

    let txn = AccountTransaction::new(
        h.ctx.account.id,
        d(2026, 3, 10),
        Money::idr(5_000),
        TransactionType::LateFee,
        Money::idr(0),
        Money::idr(0),
        Money::idr(5_000),
    );
    let txn_id = txn.id;
    let mut event = PaymentEvent::new(
        payment_id,
        PaymentEventType::LateFee,
        Money::idr(5_000),
        Money::idr(97_000),
        d(2026, 3, 10),
        None,
        None,
    );
    event.attach_to(txn_id);
    h.ctx.events.push(event);
    h.ctx.transactions.insert(txn_id, txn);

    let outcome = process_late_fee_reversal(&mut h.ctx, txn_id, None).unwrap();

    // Only the unpaid 2000 can be unwound
    let payment = &h.ctx.payments[&payment_id];
    assert_eq!(outcome.totals.late_fee, Money::idr(2_000));
    assert_eq!(payment.late_fee_amount, Money::idr(3_000));
    assert!(payment.late_fee_amount >= payment.paid_late_fee);
}
