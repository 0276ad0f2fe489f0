//! Reversal repository
//!
//! Loads the account-wide working set the reversal engine runs over,
//! under `FOR UPDATE` row locks on every account payment, and persists
//! the mutated working set plus the outcome's audit rows afterwards.
//! All reads and writes on the primary store go through the dual-store
//! transaction so a failure anywhere rolls everything back.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use core_kernel::{AccountId, AccountPaymentId, Currency, Money};
use domain_reversal::context::{CashbackScheme, ReversalContext};
use domain_reversal::outcome::ReversalOutcome;

use crate::error::DatabaseError;
use crate::lock;
use crate::rows::{
    self, AccountPaymentRow, AccountRow, AccountTransactionRow, CommissionRow, CounterHistoryRow,
    LoanRow, PaybackRow, PaymentEventRow, PaymentRow, PtpRow, WalletHistoryRow, WalletRow,
};
use crate::saga::DualStoreTransaction;

/// Static settings the repository stamps onto every working set
#[derive(Debug, Clone)]
pub struct ReversalSettings {
    /// Operating currency for all money columns
    pub currency: Currency,
    /// Proven-account threshold
    pub proven_threshold: Money,
    /// Cashback scheme configuration
    pub scheme: CashbackScheme,
}

/// Repository for reversal working sets
#[derive(Debug, Clone)]
pub struct ReversalRepository {
    settings: ReversalSettings,
}

impl ReversalRepository {
    /// Creates a repository with the given settings
    pub fn new(settings: ReversalSettings) -> Self {
        Self { settings }
    }

    /// Loads the full working set for one account, locking every account
    /// payment row first
    pub async fn load_context(
        &self,
        dual: &mut DualStoreTransaction<'_>,
        account_id: AccountId,
        today: NaiveDate,
        claim_experiment_active: bool,
    ) -> Result<ReversalContext, DatabaseError> {
        let currency = self.settings.currency;
        let account_uuid = *account_id.as_uuid();
        let tx = &mut dual.primary;

        let account: AccountRow = sqlx::query_as(
            "SELECT account_id, customer_id, is_proven, paid_off_amount
             FROM accounts WHERE account_id = $1",
        )
        .bind(account_uuid)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Account", account_id))?;
        let account = account.into_domain(currency);

        // Serialize against concurrent reversal / payment application
        let lock_ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT account_payment_id FROM account_payments WHERE account_id = $1")
                .bind(account_uuid)
                .fetch_all(&mut **tx)
                .await?;
        let lock_ids: Vec<AccountPaymentId> =
            lock_ids.into_iter().map(|(id,)| id.into()).collect();
        lock::lock_account_payments(tx, &lock_ids).await?;

        let account_payment_rows: Vec<AccountPaymentRow> = sqlx::query_as(
            "SELECT account_payment_id, account_id, due_date, principal_amount, interest_amount,
                    late_fee_amount, late_fee_applied, paid_principal, paid_interest,
                    paid_late_fee, paid_amount, due_amount, paid_date, status, ptp_date, udate
             FROM account_payments WHERE account_id = $1",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut account_payments = BTreeMap::new();
        for row in account_payment_rows {
            let ap = row.into_domain(currency)?;
            account_payments.insert(ap.id, ap);
        }

        let payment_rows: Vec<PaymentRow> = sqlx::query_as(
            "SELECT p.payment_id, p.loan_id, p.account_payment_id, p.installment_principal,
                    p.installment_interest, p.late_fee_amount, p.late_fee_applied,
                    p.paid_principal, p.paid_interest, p.paid_late_fee, p.paid_amount,
                    p.due_amount, p.due_date, p.paid_date, p.status, p.cashback_earned,
                    p.notes, p.udate
             FROM payments p
             JOIN account_payments ap ON ap.account_payment_id = p.account_payment_id
             WHERE ap.account_id = $1",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut payments = BTreeMap::new();
        for row in payment_rows {
            let p = row.into_domain(currency)?;
            payments.insert(p.id, p);
        }

        let loan_rows: Vec<LoanRow> = sqlx::query_as(
            "SELECT loan_id, account_id, customer_id, loan_amount, status, cashback_earned_total
             FROM loans WHERE account_id = $1",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut loans = BTreeMap::new();
        for row in loan_rows {
            let loan = row.into_domain(currency)?;
            loans.insert(loan.id, loan);
        }

        let transaction_rows: Vec<AccountTransactionRow> = sqlx::query_as(
            "SELECT account_transaction_id, account_id, transaction_date, transaction_amount,
                    transaction_type, towards_principal, towards_interest, towards_latefee,
                    can_reverse, reversal_transaction_id, reversed_transaction_origin_id,
                    note, cdate
             FROM account_transactions WHERE account_id = $1",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut transactions = BTreeMap::new();
        for row in transaction_rows {
            let txn = row.into_domain(currency)?;
            transactions.insert(txn.id, txn);
        }

        let event_rows: Vec<PaymentEventRow> = sqlx::query_as(
            "SELECT e.payment_event_id, e.payment_id, e.event_type, e.amount,
                    e.due_amount_after, e.event_date, e.can_reverse,
                    e.account_transaction_id, e.payment_receipt, e.payment_method
             FROM payment_events e
             JOIN payments p ON p.payment_id = e.payment_id
             JOIN account_payments ap ON ap.account_payment_id = p.account_payment_id
             WHERE ap.account_id = $1
             ORDER BY e.payment_event_id",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut events = Vec::with_capacity(event_rows.len());
        for row in event_rows {
            events.push(row.into_domain(currency)?);
        }

        let wallet: Option<WalletRow> = sqlx::query_as(
            "SELECT customer_id, balance_accruing, balance_available
             FROM customer_wallets WHERE customer_id = $1",
        )
        .bind(*account.customer_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;
        let wallet = wallet
            .map(|w| w.into_domain(currency))
            .unwrap_or_else(|| domain_servicing::CustomerWallet::new(account.customer_id, currency));

        let wallet_history_rows: Vec<WalletHistoryRow> = sqlx::query_as(
            "SELECT wallet_history_id, customer_id, change_reason, accruing_old, accruing_new,
                    available_old, available_new, payment_id, cdate
             FROM customer_wallet_history WHERE customer_id = $1 ORDER BY cdate, wallet_history_id",
        )
        .bind(*account.customer_id.as_uuid())
        .fetch_all(&mut **tx)
        .await?;
        let mut wallet_histories = Vec::with_capacity(wallet_history_rows.len());
        for row in wallet_history_rows {
            wallet_histories.push(row.into_domain(currency)?);
        }

        let counter_rows: Vec<CounterHistoryRow> = sqlx::query_as(
            "SELECT c.cashback_counter_id, c.account_payment_id, c.payment_id, c.counter, c.cdate
             FROM cashback_counter_history c
             JOIN account_payments ap ON ap.account_payment_id = c.account_payment_id
             WHERE ap.account_id = $1 ORDER BY c.cdate, c.cashback_counter_id",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let counter_histories = counter_rows.into_iter().map(|r| r.into_domain()).collect();

        let ptp_rows: Vec<PtpRow> = sqlx::query_as(
            "SELECT t.ptp_id, t.account_payment_id, t.created_date, t.ptp_date, t.ptp_amount,
                    t.status
             FROM ptps t
             JOIN account_payments ap ON ap.account_payment_id = t.account_payment_id
             WHERE ap.account_id = $1",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut ptps = Vec::with_capacity(ptp_rows.len());
        for row in ptp_rows {
            ptps.push(row.into_domain(currency)?);
        }

        let commission_rows: Vec<CommissionRow> = sqlx::query_as(
            "SELECT commission_id, account_id, account_payment_id, payment_amount, credited_amount
             FROM commission_lookups WHERE account_id = $1",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let commissions = commission_rows
            .into_iter()
            .map(|r| r.into_domain(currency))
            .collect();

        let payback_rows: Vec<PaybackRow> = sqlx::query_as(
            "SELECT payback_id, customer_id, account_id, account_transaction_id, amount,
                    transaction_date, payback_service, is_processed, cdate
             FROM payback_transactions WHERE account_id = $1 AND account_transaction_id IS NOT NULL",
        )
        .bind(account_uuid)
        .fetch_all(&mut **tx)
        .await?;
        let mut paybacks = BTreeMap::new();
        for row in payback_rows {
            if let Some(txn_id) = row.account_transaction_id {
                paybacks.insert(txn_id.into(), row.into_domain(currency));
            }
        }

        Ok(ReversalContext {
            customer_id: account.customer_id,
            account,
            wallet,
            transactions,
            events,
            payments,
            account_payments,
            loans,
            ptps,
            commissions,
            wallet_histories,
            counter_histories,
            paybacks,
            scheme: self.settings.scheme.clone(),
            claim_experiment_active,
            proven_threshold: self.settings.proven_threshold,
            today,
            currency,
        })
    }

    /// Upserts the mutated working set back into the primary store
    pub async fn persist_context(
        &self,
        dual: &mut DualStoreTransaction<'_>,
        ctx: &ReversalContext,
    ) -> Result<(), DatabaseError> {
        let tx = &mut dual.primary;

        for payment in ctx.payments.values() {
            let notes = serde_json::to_value(&payment.notes)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            sqlx::query(
                "UPDATE payments SET
                    paid_principal = $2, paid_interest = $3, paid_late_fee = $4,
                    paid_amount = $5, due_amount = $6, late_fee_amount = $7,
                    late_fee_applied = $8, paid_date = $9, status = $10,
                    cashback_earned = $11, notes = $12, udate = $13
                 WHERE payment_id = $1",
            )
            .bind(*payment.id.as_uuid())
            .bind(payment.paid_principal.amount())
            .bind(payment.paid_interest.amount())
            .bind(payment.paid_late_fee.amount())
            .bind(payment.paid_amount.amount())
            .bind(payment.due_amount.amount())
            .bind(payment.late_fee_amount.amount())
            .bind(payment.late_fee_applied as i32)
            .bind(payment.paid_date)
            .bind(rows::payment_status_to_str(payment.status))
            .bind(payment.cashback_earned.amount())
            .bind(notes)
            .bind(payment.udate)
            .execute(&mut **tx)
            .await?;
        }

        for ap in ctx.account_payments.values() {
            sqlx::query(
                "UPDATE account_payments SET
                    paid_principal = $2, paid_interest = $3, paid_late_fee = $4,
                    paid_amount = $5, due_amount = $6, late_fee_amount = $7,
                    late_fee_applied = $8, paid_date = $9, status = $10, ptp_date = $11,
                    udate = $12
                 WHERE account_payment_id = $1",
            )
            .bind(*ap.id.as_uuid())
            .bind(ap.paid_principal.amount())
            .bind(ap.paid_interest.amount())
            .bind(ap.paid_late_fee.amount())
            .bind(ap.paid_amount.amount())
            .bind(ap.due_amount.amount())
            .bind(ap.late_fee_amount.amount())
            .bind(ap.late_fee_applied as i32)
            .bind(ap.paid_date)
            .bind(rows::account_payment_status_to_str(ap.status))
            .bind(ap.ptp_date)
            .bind(ap.udate)
            .execute(&mut **tx)
            .await?;
        }

        for loan in ctx.loans.values() {
            sqlx::query(
                "UPDATE loans SET status = $2, cashback_earned_total = $3 WHERE loan_id = $1",
            )
            .bind(*loan.id.as_uuid())
            .bind(rows::loan_status_to_str(loan.status))
            .bind(loan.cashback_earned_total.amount())
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(
            "UPDATE accounts SET is_proven = $2, paid_off_amount = $3 WHERE account_id = $1",
        )
        .bind(*ctx.account.id.as_uuid())
        .bind(ctx.account.is_proven)
        .bind(ctx.account.paid_off_amount.amount())
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO customer_wallets (customer_id, balance_accruing, balance_available)
             VALUES ($1, $2, $3)
             ON CONFLICT (customer_id) DO UPDATE SET
                balance_accruing = EXCLUDED.balance_accruing,
                balance_available = EXCLUDED.balance_available",
        )
        .bind(*ctx.wallet.customer_id.as_uuid())
        .bind(ctx.wallet.balance_accruing.amount())
        .bind(ctx.wallet.balance_available.amount())
        .execute(&mut **tx)
        .await?;

        for txn in ctx.transactions.values() {
            sqlx::query(
                "INSERT INTO account_transactions (
                    account_transaction_id, account_id, transaction_date, transaction_amount,
                    transaction_type, towards_principal, towards_interest, towards_latefee,
                    can_reverse, reversal_transaction_id, reversed_transaction_origin_id,
                    note, cdate
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 ON CONFLICT (account_transaction_id) DO UPDATE SET
                    can_reverse = EXCLUDED.can_reverse,
                    reversal_transaction_id = EXCLUDED.reversal_transaction_id,
                    reversed_transaction_origin_id = EXCLUDED.reversed_transaction_origin_id,
                    note = EXCLUDED.note",
            )
            .bind(*txn.id.as_uuid())
            .bind(*txn.account_id.as_uuid())
            .bind(txn.transaction_date)
            .bind(txn.transaction_amount.amount())
            .bind(txn.transaction_type.as_str())
            .bind(txn.towards_principal.amount())
            .bind(txn.towards_interest.amount())
            .bind(txn.towards_latefee.amount())
            .bind(txn.can_reverse)
            .bind(txn.reversal_transaction_id.map(|id| *id.as_uuid()))
            .bind(txn.reversed_transaction_origin_id.map(|id| *id.as_uuid()))
            .bind(txn.note.as_deref())
            .bind(txn.cdate)
            .execute(&mut **tx)
            .await?;
        }

        for event in &ctx.events {
            sqlx::query(
                "INSERT INTO payment_events (
                    payment_event_id, payment_id, event_type, amount, due_amount_after,
                    event_date, can_reverse, account_transaction_id, payment_receipt,
                    payment_method
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (payment_event_id) DO UPDATE SET
                    account_transaction_id = EXCLUDED.account_transaction_id,
                    can_reverse = EXCLUDED.can_reverse",
            )
            .bind(*event.id.as_uuid())
            .bind(*event.payment_id.as_uuid())
            .bind(event.event_type.as_str())
            .bind(event.amount.amount())
            .bind(event.due_amount_after.amount())
            .bind(event.event_date)
            .bind(event.can_reverse)
            .bind(event.account_transaction_id.map(|id| *id.as_uuid()))
            .bind(event.payment_receipt.as_deref())
            .bind(event.payment_method.as_deref())
            .execute(&mut **tx)
            .await?;
        }

        for history in &ctx.wallet_histories {
            sqlx::query(
                "INSERT INTO customer_wallet_history (
                    wallet_history_id, customer_id, change_reason, accruing_old, accruing_new,
                    available_old, available_new, payment_id, cdate
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (wallet_history_id) DO NOTHING",
            )
            .bind(*history.id.as_uuid())
            .bind(*history.customer_id.as_uuid())
            .bind(history.change_reason.as_str())
            .bind(history.wallet_balance_accruing_old.amount())
            .bind(history.wallet_balance_accruing.amount())
            .bind(history.wallet_balance_available_old.amount())
            .bind(history.wallet_balance_available.amount())
            .bind(history.payment_id.map(|id| *id.as_uuid()))
            .bind(history.cdate)
            .execute(&mut **tx)
            .await?;
        }

        for counter in &ctx.counter_histories {
            sqlx::query(
                "INSERT INTO cashback_counter_history (
                    cashback_counter_id, account_payment_id, payment_id, counter, cdate
                 ) VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (cashback_counter_id) DO NOTHING",
            )
            .bind(*counter.id.as_uuid())
            .bind(*counter.account_payment_id.as_uuid())
            .bind(counter.payment_id.map(|id| *id.as_uuid()))
            .bind(counter.counter as i32)
            .bind(counter.cdate)
            .execute(&mut **tx)
            .await?;
        }

        for ptp in &ctx.ptps {
            sqlx::query("UPDATE ptps SET status = $2 WHERE ptp_id = $1")
                .bind(*ptp.id.as_uuid())
                .bind(rows::ptp_status_to_str(ptp.status))
                .execute(&mut **tx)
                .await?;
        }

        for commission in &ctx.commissions {
            sqlx::query(
                "UPDATE commission_lookups SET payment_amount = $2, credited_amount = $3
                 WHERE commission_id = $1",
            )
            .bind(*commission.id.as_uuid())
            .bind(commission.payment_amount.amount())
            .bind(commission.credited_amount.amount())
            .execute(&mut **tx)
            .await?;
        }

        for (txn_id, payback) in &ctx.paybacks {
            sqlx::query(
                "INSERT INTO payback_transactions (
                    payback_id, customer_id, account_id, account_transaction_id, amount,
                    transaction_date, payback_service, is_processed, cdate
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (payback_id) DO UPDATE SET is_processed = EXCLUDED.is_processed",
            )
            .bind(*payback.id.as_uuid())
            .bind(*payback.customer_id.as_uuid())
            .bind(*payback.account_id.as_uuid())
            .bind(*txn_id.as_uuid())
            .bind(payback.amount.amount())
            .bind(payback.transaction_date)
            .bind(payback.payback_service.as_str())
            .bind(payback.is_processed)
            .bind(payback.cdate)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Inserts the outcome's audit rows and mirrors the collection store
    pub async fn persist_outcome(
        &self,
        dual: &mut DualStoreTransaction<'_>,
        ctx: &ReversalContext,
        outcome: &ReversalOutcome,
    ) -> Result<(), DatabaseError> {
        {
            let tx = &mut dual.primary;

            for history in &outcome.payment_status_histories {
                sqlx::query(
                    "INSERT INTO payment_status_history (
                        payment_id, status_old, status_new, changed_at
                     ) VALUES ($1, $2, $3, $4)",
                )
                .bind(*history.payment_id.as_uuid())
                .bind(rows::payment_status_to_str(history.status_old))
                .bind(rows::payment_status_to_str(history.status_new))
                .bind(history.changed_at)
                .execute(&mut **tx)
                .await?;
            }

            for history in &outcome.account_payment_status_histories {
                sqlx::query(
                    "INSERT INTO account_payment_status_history (
                        account_payment_id, status_old, status_new, changed_at
                     ) VALUES ($1, $2, $3, $4)",
                )
                .bind(*history.account_payment_id.as_uuid())
                .bind(rows::account_payment_status_to_str(history.status_old))
                .bind(rows::account_payment_status_to_str(history.status_new))
                .bind(history.changed_at)
                .execute(&mut **tx)
                .await?;
            }

            for history in &outcome.property_histories {
                sqlx::query(
                    "INSERT INTO account_property_history (
                        account_id, property, value_old, value_new, changed_at
                     ) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(*history.account_id.as_uuid())
                .bind(history.property.as_str())
                .bind(history.value_old.as_str())
                .bind(history.value_new.as_str())
                .bind(history.changed_at)
                .execute(&mut **tx)
                .await?;
            }
        }

        // Mirror the adjusted account payments into the collection store;
        // each write registers its inverse for the saga's compensation path
        for history in &outcome.account_payment_status_histories {
            let ap_uuid = *history.account_payment_id.as_uuid();
            let due_amount = ctx
                .account_payments
                .get(&history.account_payment_id)
                .map(|ap| ap.due_amount.amount())
                .unwrap_or_default();

            dual.register_compensation(
                format!(
                    "UPDATE collection_account_payments SET status = '{}' WHERE account_payment_id = '{}'",
                    rows::account_payment_status_to_str(history.status_old),
                    ap_uuid
                ),
                format!("revert collection status for {}", history.account_payment_id),
            );
            sqlx::query(
                "INSERT INTO collection_account_payments (account_payment_id, status, due_amount, synced_at)
                 VALUES ($1, $2, $3, now())
                 ON CONFLICT (account_payment_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    due_amount = EXCLUDED.due_amount,
                    synced_at = EXCLUDED.synced_at",
            )
            .bind(ap_uuid)
            .bind(rows::account_payment_status_to_str(history.status_new))
            .bind(due_amount)
            .execute(&mut *dual.collection)
            .await?;
        }

        Ok(())
    }
}
