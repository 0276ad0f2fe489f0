//! Transaction reversal orchestrator
//!
//! Drives the allocator, recorder, and aggregator for every payment event
//! under a target transaction, creates the compensating transaction, and
//! applies the account-level consequences: proven-status re-evaluation,
//! commission/PTP adjustment, claim-experiment voids, and post-commit
//! deferred effects.
//!
//! The storage layer acquires a row lock on every account payment in the
//! working set before it is loaded, so this engine runs over a serialized
//! view; see `infra_db::lock`.

use std::collections::BTreeMap;

use core_kernel::{AccountPaymentId, AccountTransactionId, Money, PaymentId};
use domain_servicing::{PaymentEvent, TransactionType};

use crate::aggregator;
use crate::context::ReversalContext;
use crate::error::ReversalError;
use crate::outcome::{
    AdjusterOutcome, DeferredEffect, ReversalLog, ReversalOutcome, ReversedTotals,
};
use crate::ptp_adjuster::{adjust_commission_and_ptp, AdjusterScope};
use crate::recorder::{self, RecorderParams, RecorderScope};
use crate::snapshot::PreReversalSnapshot;
use crate::waterfall;

/// Reverses one account transaction
///
/// Preconditions: the transaction must still be reversible, of a
/// reversible payment type, and have at least one attached payment event.
/// Violations propagate as [`ReversalError`] and nothing is persisted.
pub fn process_account_transaction_reversal(
    ctx: &mut ReversalContext,
    target_id: AccountTransactionId,
    note: Option<&str>,
    refinancing_reversal: bool,
) -> Result<ReversalOutcome, ReversalError> {
    let target = ctx.transaction(target_id)?.clone();
    if !target.can_reverse {
        return Err(ReversalError::TransactionNotReversable(
            target_id.to_string(),
        ));
    }
    let void_type = target
        .transaction_type
        .void_type()
        .ok_or_else(|| {
            ReversalError::WrongTransactionType(target.transaction_type.as_str().to_string())
        })?;
    if target.transaction_type == TransactionType::LateFee {
        return Err(ReversalError::WrongTransactionType(
            "late fee transactions are reversed via process_late_fee_reversal".to_string(),
        ));
    }

    let events = ctx.events_of_transaction(target_id);
    if events.is_empty() {
        return Err(ReversalError::NoPaymentEvents(target_id.to_string()));
    }

    tracing::info!(
        transaction_id = %target_id,
        transaction_type = target.transaction_type.as_str(),
        events = events.len(),
        refinancing_reversal,
        "processing account transaction reversal"
    );

    let mut totals = ReversedTotals::zero(ctx.currency);
    let mut log = ReversalLog::default();
    let mut all_voids: Vec<PaymentEvent> = Vec::new();
    let paid_with_cashback = target.transaction_type == TransactionType::CustomerWallet;

    for event in &events {
        let amount = event.amount.abs();
        if amount.is_zero() {
            continue;
        }
        let first_payment = event.payment_id;
        let account_payment_id = ctx
            .payments
            .get(&first_payment)
            .ok_or_else(|| ReversalError::missing("Payment", first_payment))?
            .account_payment_id;

        let group_ids = ctx.group_payment_ids(account_payment_id, first_payment);
        let mut group = ctx.take_group(&group_ids)?;
        let snapshot = PreReversalSnapshot::capture(&group);

        {
            let ReversalContext {
                payments,
                account_payments,
                loans,
                account,
                wallet,
                events: ledger,
                wallet_histories,
                counter_histories,
                scheme,
                claim_experiment_active,
                today,
                ..
            } = ctx;
            let account_payment = account_payments
                .get_mut(&account_payment_id)
                .ok_or_else(|| ReversalError::missing("AccountPayment", account_payment_id))?;

            let result = waterfall::allocate_all(&mut group, account_payment, amount)?;
            totals.late_fee = totals.late_fee + result.reversed_late_fee;
            totals.interest = totals.interest + result.reversed_interest;
            totals.principal = totals.principal + result.reversed_principal;

            let mut scope = RecorderScope {
                group: &mut group,
                loans,
                account,
                wallet,
                other_payments: payments,
                all_events: ledger,
                wallet_histories,
                counter_histories,
                scheme,
                claim_experiment_active: *claim_experiment_active,
                today: *today,
            };
            let params = RecorderParams {
                void_event_type: target.transaction_type.event_void_type(),
                reversed_transaction: target_id,
                payment_receipt: event.payment_receipt.clone(),
                payment_method: event.payment_method.clone(),
                note,
                paid_with_cashback,
            };
            let voids = recorder::record_reversals(&mut scope, &snapshot, &params, &mut log)?;
            all_voids.extend(voids);

            aggregator::reconcile_account_payment(
                account_payment,
                &group,
                counter_histories,
                scheme,
                *today,
                void_type,
                &mut log,
            );
        }
        ctx.restore_group(group);

        // Later events in the same reversal see the rows written so far
        sync_ledgers(ctx, &log);
    }

    finalize_reversal(ctx, target, void_type, note, refinancing_reversal, totals, log, all_voids)
}

/// Reverses a late-fee application transaction
///
/// Walks the target's events, unwinding each payment's accrued late fee
/// (never below what has already been paid) and the matching due amount,
/// and writes `late_fee_void` events.
pub fn process_late_fee_reversal(
    ctx: &mut ReversalContext,
    target_id: AccountTransactionId,
    note: Option<&str>,
) -> Result<ReversalOutcome, ReversalError> {
    let target = ctx.transaction(target_id)?.clone();
    if !target.can_reverse {
        return Err(ReversalError::TransactionNotReversable(
            target_id.to_string(),
        ));
    }
    if target.transaction_type != TransactionType::LateFee {
        return Err(ReversalError::WrongTransactionType(
            target.transaction_type.as_str().to_string(),
        ));
    }
    let events = ctx.events_of_transaction(target_id);
    if events.is_empty() {
        return Err(ReversalError::NoPaymentEvents(target_id.to_string()));
    }

    let mut totals = ReversedTotals::zero(ctx.currency);
    let mut log = ReversalLog::default();
    let mut all_voids: Vec<PaymentEvent> = Vec::new();
    let today = ctx.today;

    for event in &events {
        let amount = event.amount.abs();
        if amount.is_zero() {
            continue;
        }
        let ReversalContext {
            payments,
            account_payments,
            ..
        } = ctx;
        let payment = payments
            .get_mut(&event.payment_id)
            .ok_or_else(|| ReversalError::missing("Payment", event.payment_id))?;
        let account_payment = account_payments
            .get_mut(&payment.account_payment_id)
            .ok_or_else(|| {
                ReversalError::missing("AccountPayment", payment.account_payment_id)
            })?;

        // Only the unpaid accrued portion can be unwound
        let unpaid = (payment.late_fee_amount - payment.paid_late_fee).floor_zero();
        let delta = amount.min(unpaid);
        if delta < amount {
            tracing::warn!(
                payment_id = %payment.id,
                requested = %amount,
                applied = %delta,
                "late fee reversal exceeds unpaid accrued fee, dropping excess"
            );
        }
        if delta.is_zero() {
            continue;
        }

        let due_snapshot = payment.due_amount;
        payment.late_fee_amount = (payment.late_fee_amount - delta).floor_zero();
        payment.late_fee_applied = payment.late_fee_applied.saturating_sub(1);
        payment.due_amount = (payment.due_amount - delta).floor_zero();
        payment.clamp_due_amount();

        account_payment.late_fee_amount = (account_payment.late_fee_amount - delta).floor_zero();
        account_payment.late_fee_applied = account_payment.late_fee_applied.saturating_sub(1);
        account_payment.due_amount = (account_payment.due_amount - delta).floor_zero();

        totals.late_fee = totals.late_fee + delta;

        all_voids.push(PaymentEvent::void(
            payment.id,
            domain_servicing::PaymentEventType::LateFeeVoid,
            delta,
            due_snapshot,
            today,
            event.payment_receipt.clone(),
            event.payment_method.clone(),
        ));
        log.account_status_recomputes
            .push(crate::outcome::AccountStatusRecompute {
                account_payment_id: account_payment.id,
                reason_override: TransactionType::LateFeeVoid.as_str().to_string(),
            });
    }

    finalize_reversal(
        ctx,
        target,
        TransactionType::LateFeeVoid,
        note,
        false,
        totals,
        log,
        all_voids,
    )
}

/// Shared tail of every transaction reversal
///
/// Creates the compensating transaction, attaches the voids, marks the
/// original terminal, re-evaluates the proven flag, collects deferred
/// effects, and runs the commission/PTP adjuster for payment voids.
#[allow(clippy::too_many_arguments)]
fn finalize_reversal(
    ctx: &mut ReversalContext,
    target: domain_servicing::AccountTransaction,
    void_type: TransactionType,
    note: Option<&str>,
    refinancing_reversal: bool,
    totals: ReversedTotals,
    mut log: ReversalLog,
    mut all_voids: Vec<PaymentEvent>,
) -> Result<ReversalOutcome, ReversalError> {
    let mut reversal_note = note.map(str::to_string);
    if refinancing_reversal {
        reversal_note = Some(match reversal_note {
            Some(n) => format!("Refinancing void: {}", n),
            None => "Refinancing void".to_string(),
        });
    }
    let reversal_txn = target.reversal_of(void_type, ctx.today, reversal_note);

    for void in &mut all_voids {
        void.attach_to(reversal_txn.id);
    }
    ctx.events.extend(all_voids.iter().cloned());

    ctx.transactions
        .get_mut(&target.id)
        .ok_or_else(|| ReversalError::missing("AccountTransaction", target.id))?
        .mark_reversed(reversal_txn.id);

    if let Some(history) = ctx.account.reevaluate_proven(ctx.proven_threshold) {
        log.property_histories.push(history);
    }

    let mut deferred: Vec<DeferredEffect> = Vec::new();
    if !refinancing_reversal && !log.paid_off_dropped_loans.is_empty() {
        deferred.push(DeferredEffect::RollbackEarlyLimitRelease {
            loan_ids: log.paid_off_dropped_loans.clone(),
        });
    }
    if !log.status_changed_account_payments.is_empty() {
        deferred.push(DeferredEffect::VoidCashbackClaim {
            account_payment_ids: log.status_changed_account_payments.clone(),
        });
        deferred.push(DeferredEffect::DeleteFromCollectionQueue {
            account_payment_ids: log.status_changed_account_payments.clone(),
        });
    }
    if !all_voids.is_empty() {
        deferred.push(DeferredEffect::UpdateVaTransaction {
            account_id: ctx.account.id,
        });
    }

    let adjuster = if void_type == TransactionType::PaymentVoid {
        let reversed_by_ap = reversed_by_account_payment(ctx, &all_voids);
        let payment_owner: BTreeMap<PaymentId, AccountPaymentId> = ctx
            .payments
            .iter()
            .map(|(id, p)| (*id, p.account_payment_id))
            .collect();
        let ReversalContext {
            account_payments,
            ptps,
            commissions,
            events,
            today,
            ..
        } = ctx;
        adjust_commission_and_ptp(
            &mut AdjusterScope {
                account_payments,
                ptps: ptps.as_mut_slice(),
                commissions: commissions.as_mut_slice(),
                events,
                payment_owner: &payment_owner,
                today: *today,
            },
            &target,
            &reversed_by_ap,
        )
    } else {
        AdjusterOutcome::Skipped
    };

    ctx.transactions.insert(reversal_txn.id, reversal_txn.clone());
    sync_ledgers(ctx, &log);

    Ok(log.into_outcome(reversal_txn, totals, all_voids, deferred, adjuster))
}

/// Total reversed magnitude per account payment, from the created voids
fn reversed_by_account_payment(
    ctx: &ReversalContext,
    voids: &[PaymentEvent],
) -> BTreeMap<AccountPaymentId, Money> {
    let mut map: BTreeMap<AccountPaymentId, Money> = BTreeMap::new();
    for void in voids {
        if let Some(payment) = ctx.payments.get(&void.payment_id) {
            let entry = map
                .entry(payment.account_payment_id)
                .or_insert_with(|| Money::zero(ctx.currency));
            *entry = *entry + void.amount.abs();
        }
    }
    map
}

/// Mirrors the log's appended rows into the context ledgers
///
/// Keeps later steps of the same reversal reading a view that includes the
/// rows written so far; duplicate ids are skipped.
fn sync_ledgers(ctx: &mut ReversalContext, log: &ReversalLog) {
    for row in &log.wallet_entries {
        if !ctx.wallet_histories.iter().any(|h| h.id == row.id) {
            ctx.wallet_histories.push(row.clone());
        }
    }
    for row in &log.counter_entries {
        if !ctx.counter_histories.iter().any(|h| h.id == row.id) {
            ctx.counter_histories.push(row.clone());
        }
    }
}
