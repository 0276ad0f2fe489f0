//! Chained-reversal resolver
//!
//! Payments apply to an account's oldest unpaid obligation first, so
//! reversing an old transaction while newer ones exist requires peeling the
//! newer transactions off (newest first), reversing the target, and then
//! replaying the peeled transactions (oldest first) as transfers onto the
//! same account. The whole sequence runs inside one outer atomic scope
//! owned by the storage layer.

use core_kernel::AccountTransactionId;
use domain_servicing::{AccountTransaction, TransactionType};

use crate::context::ReversalContext;
use crate::error::ReversalError;
use crate::orchestrator::process_account_transaction_reversal;
use crate::outcome::{ChainedReversalOutcome, DeferredEffect};
use crate::ports::RepaymentPort;
use crate::transfer::{transfer_payment_after_reversal, TransferArgs};

/// Note marking a reversal as a temporary void inside a chained reversal
pub const TEMPORARY_REVERSAL_NOTE: &str = "temporary void for chained reversal";

/// Note marking a transfer as the replay of a temporary void
pub const REPLAY_NOTE: &str = "replay of temporary void after chained reversal";

/// Reverses a customer payment, temporarily voiding newer transactions
///
/// Steps: newer reversible `payment`/`customer_wallet` transactions are
/// reversed newest-first with a synthetic note, the target is reversed,
/// the temporary reversals are replayed oldest-first via the transfer
/// operation, and, when `destination` is supplied, the target's value is
/// transferred to the other account. A risk-bucket recompute fires after
/// commit.
pub fn process_customer_payment_reversal(
    ctx: &mut ReversalContext,
    destination: Option<&mut ReversalContext>,
    target_id: AccountTransactionId,
    note: Option<&str>,
    repayment: &dyn RepaymentPort,
) -> Result<ChainedReversalOutcome, ReversalError> {
    let target = ctx.transaction(target_id)?.clone();
    if !target.can_reverse {
        return Err(ReversalError::TransactionNotReversable(
            target_id.to_string(),
        ));
    }

    let mut newer: Vec<AccountTransaction> = ctx
        .transactions
        .values()
        .filter(|t| t.id != target_id)
        .filter(|t| {
            matches!(
                t.transaction_type,
                TransactionType::Payment | TransactionType::CustomerWallet
            )
        })
        .filter(|t| t.can_reverse && t.cdate > target.cdate)
        .cloned()
        .collect();
    newer.sort_by(|a, b| b.cdate.cmp(&a.cdate));

    tracing::info!(
        target_id = %target_id,
        newer_transactions = newer.len(),
        "processing chained customer payment reversal"
    );

    // Peel newer transactions off, newest first
    let mut temporary = Vec::with_capacity(newer.len());
    let mut temporary_pairs: Vec<(AccountTransactionId, AccountTransactionId)> = Vec::new();
    for txn in &newer {
        let outcome = process_account_transaction_reversal(
            ctx,
            txn.id,
            Some(TEMPORARY_REVERSAL_NOTE),
            false,
        )?;
        temporary_pairs.push((txn.id, outcome.reversal_transaction.id));
        temporary.push(outcome);
    }

    // Reverse the actual target
    let target_outcome = process_account_transaction_reversal(ctx, target_id, note, false)?;

    // Replay the temporary voids oldest first, restoring the customer's
    // position net of the target reversal
    let mut replayed_transaction_ids = Vec::with_capacity(temporary_pairs.len());
    for (origin_id, reversal_id) in temporary_pairs.iter().rev() {
        let new_id = transfer_payment_after_reversal(
            ctx,
            None,
            &TransferArgs {
                origin_transaction_id: *origin_id,
                reversal_transaction_id: *reversal_id,
                note: Some(REPLAY_NOTE),
            },
            repayment,
        )?;
        replayed_transaction_ids.push(new_id);
    }

    // Optional transfer of the target's reversed value to another account
    let destination_transaction_id = match destination {
        Some(dest) => Some(transfer_payment_after_reversal(
            ctx,
            Some(dest),
            &TransferArgs {
                origin_transaction_id: target_id,
                reversal_transaction_id: target_outcome.reversal_transaction.id,
                note,
            },
            repayment,
        )?),
        None => None,
    };

    Ok(ChainedReversalOutcome {
        target: target_outcome,
        temporary,
        replayed_transaction_ids,
        destination_transaction_id,
        deferred_effects: vec![
            DeferredEffect::RecomputeRiskBucket {
                account_id: ctx.account.id,
            },
            DeferredEffect::SendMoengageEvent {
                customer_id: ctx.customer_id,
                event: "payment_reversed".to_string(),
            },
        ],
    })
}
