//! Transfer of reversed funds
//!
//! Re-applies a reversed transaction's value, either onto the same account
//! (replaying a temporary void) or onto another account (transfer-to-account
//! support flows). The origin payback row is deep-copied, never mutated.

use core_kernel::{AccountTransactionId, Money};
use domain_servicing::{
    AccountTransaction, PaybackTransaction, TransactionType, WalletChangeReason,
};

use crate::context::ReversalContext;
use crate::error::ReversalError;
use crate::ports::RepaymentPort;

/// Parameters for one transfer
pub struct TransferArgs<'a> {
    /// The reversed origin transaction whose value is transferred
    pub origin_transaction_id: AccountTransactionId,
    /// The reversal transaction the funds originate from
    pub reversal_transaction_id: AccountTransactionId,
    /// Free-text note forwarded to the repayment engine
    pub note: Option<&'a str>,
}

/// Transfers a reversed transaction's value to a destination account
///
/// `destination: None` replays onto the origin account (the chained
/// resolver's case). The origin payback record is copied and reparented;
/// a cashback-funded origin debits the destination wallet against its
/// oldest unpaid obligation before the repayment engine applies the copy.
/// After application the new transaction is linked back to the reversal
/// via `reversed_transaction_origin_id` and any PTP state the origin
/// transaction had left active is restored.
pub fn transfer_payment_after_reversal(
    origin: &mut ReversalContext,
    destination: Option<&mut ReversalContext>,
    args: &TransferArgs<'_>,
    repayment: &dyn RepaymentPort,
) -> Result<AccountTransactionId, ReversalError> {
    let origin_txn = origin.transaction(args.origin_transaction_id)?.clone();
    let payback = origin
        .paybacks
        .get(&args.origin_transaction_id)
        .ok_or_else(|| ReversalError::missing("PaybackTransaction", args.origin_transaction_id))?
        .clone();
    let cashback_funded = origin_txn.transaction_type == TransactionType::CustomerWallet;

    let new_transaction_id = match destination {
        Some(dest) => apply_to(dest, &payback, cashback_funded, args, repayment)?,
        None => apply_to(origin, &payback, cashback_funded, args, repayment)?,
    };

    restore_origin_ptp_state(origin, &origin_txn);

    Ok(new_transaction_id)
}

fn apply_to(
    dest: &mut ReversalContext,
    payback: &PaybackTransaction,
    cashback_funded: bool,
    args: &TransferArgs<'_>,
    repayment: &dyn RepaymentPort,
) -> Result<AccountTransactionId, ReversalError> {
    if dest.account_payments.is_empty() || dest.payments.is_empty() {
        return Err(ReversalError::DestinationHasNoPayments(
            dest.account.id.to_string(),
        ));
    }

    let copy = payback.copy_for_transfer(dest.account.id, dest.customer_id);

    if cashback_funded {
        // The transferred value is wallet money: debit the destination
        // wallet against its oldest unpaid obligation
        let oldest_unpaid = dest
            .account_payments
            .values()
            .filter(|ap| ap.due_amount.is_positive())
            .min_by_key(|ap| ap.due_date)
            .map(|ap| ap.id);
        tracing::debug!(
            account_id = %dest.account.id,
            ?oldest_unpaid,
            amount = %copy.amount,
            "debiting destination wallet for transferred cashback payment"
        );
        let row = dest.wallet.apply_change(
            Money::zero(copy.amount.currency()),
            -copy.amount,
            WalletChangeReason::CustomerWallet,
            None,
        );
        dest.wallet_histories.push(row);
    }

    let new_transaction_id =
        repayment.process_repayment_transaction(dest, copy.clone(), args.note, cashback_funded)?;

    let mut processed = copy;
    processed.is_processed = true;
    dest.paybacks.insert(new_transaction_id, processed);

    dest.transactions
        .get_mut(&new_transaction_id)
        .ok_or_else(|| ReversalError::missing("AccountTransaction", new_transaction_id))?
        .reversed_transaction_origin_id = Some(args.reversal_transaction_id);

    Ok(new_transaction_id)
}

/// Clears PTP state the origin transaction had left active
///
/// Best-effort: a missing account payment is logged and skipped, never
/// raised, because the financial transfer has already been applied.
fn restore_origin_ptp_state(origin: &mut ReversalContext, origin_txn: &AccountTransaction) {
    let ReversalContext {
        account_payments,
        ptps,
        ..
    } = origin;
    for ptp in ptps.iter_mut() {
        if ptp.status.is_none() || !ptp.covers(origin_txn.transaction_date) {
            continue;
        }
        match account_payments.get_mut(&ptp.account_payment_id) {
            Some(account_payment) => {
                account_payment.ptp_date = Some(ptp.ptp_date);
                ptp.clear_status();
            }
            None => {
                tracing::warn!(
                    ptp_id = %ptp.id,
                    account_payment_id = %ptp.account_payment_id,
                    "cannot restore ptp date, account payment not in working set"
                );
            }
        }
    }
}
