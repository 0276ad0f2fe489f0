//! Pessimistic account-payment row locks
//!
//! Concurrent reversal and payment application against the same account
//! payment are serialized with `SELECT ... FOR UPDATE`. The lock is modeled
//! as an explicit guard value: it is acquired inside a transaction and
//! released with that transaction on every exit path (commit or rollback),
//! never earlier.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use core_kernel::AccountPaymentId;

use crate::error::DatabaseError;

/// Proof that an account-payment row is locked by the current transaction
///
/// Holding a guard does not borrow the transaction; the database keeps the
/// row lock until the transaction ends. The guard exists so call sites
/// must name the lock they rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPaymentLockGuard {
    account_payment_id: AccountPaymentId,
}

impl AccountPaymentLockGuard {
    /// The locked row's id
    pub fn account_payment_id(&self) -> AccountPaymentId {
        self.account_payment_id
    }
}

/// Acquires a `FOR UPDATE` row lock on one account payment
///
/// Blocks until any concurrent transaction holding the lock finishes.
///
/// # Errors
///
/// `DatabaseError::LockNotAcquired` when the row does not exist.
pub async fn lock_account_payment(
    tx: &mut Transaction<'_, Postgres>,
    id: AccountPaymentId,
) -> Result<AccountPaymentLockGuard, DatabaseError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT account_payment_id FROM account_payments WHERE account_payment_id = $1 FOR UPDATE")
            .bind(*id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

    match row {
        Some(_) => {
            tracing::debug!(account_payment_id = %id, "account payment row locked");
            Ok(AccountPaymentLockGuard {
                account_payment_id: id,
            })
        }
        None => Err(DatabaseError::LockNotAcquired(format!(
            "account payment {} does not exist",
            id
        ))),
    }
}

/// Locks a set of account payments in a stable order
///
/// Ids are locked in sorted order so concurrent multi-row reversals cannot
/// deadlock against each other.
pub async fn lock_account_payments(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[AccountPaymentId],
) -> Result<Vec<AccountPaymentLockGuard>, DatabaseError> {
    let mut sorted: Vec<AccountPaymentId> = ids.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut guards = Vec::with_capacity(sorted.len());
    for id in sorted {
        guards.push(lock_account_payment(tx, id).await?);
    }
    Ok(guards)
}
