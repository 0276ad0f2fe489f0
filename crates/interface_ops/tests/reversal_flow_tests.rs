//! End-to-end reversal flow against real PostgreSQL
//!
//! These tests start two Postgres containers (primary + collection store)
//! via testcontainers and exercise the full load → engine → persist →
//! commit path. They require a running Docker daemon and are ignored by
//! default; run with `cargo test -- --ignored`.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use core_kernel::{AccountId, AccountTransactionId, DomainPort, Money, PortError};
use domain_reversal::context::ReversalContext;
use domain_reversal::ports::RepaymentPort;
use domain_servicing::PaybackTransaction;
use interface_ops::ServicingOps;
use test_utils::database::TestDualStores;

/// Stub for flows that never reach the repayment engine
struct NoRepayment;

impl DomainPort for NoRepayment {}

impl RepaymentPort for NoRepayment {
    fn process_repayment_transaction(
        &self,
        _ctx: &mut ReversalContext,
        _payback: PaybackTransaction,
        _note: Option<&str>,
        _using_cashback: bool,
    ) -> Result<AccountTransactionId, PortError> {
        Err(PortError::internal("repayment engine not wired in this test"))
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

async fn seed_paid_installment(
    pool: &sqlx::PgPool,
) -> Result<(AccountId, AccountTransactionId), Box<dyn std::error::Error + Send + Sync>> {
    let account_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    let loan_id = Uuid::new_v4();
    let account_payment_id = Uuid::new_v4();
    let payment_id = Uuid::new_v4();
    let transaction_id = Uuid::new_v4();
    let event_id = Uuid::new_v4();

    sqlx::query("INSERT INTO accounts (account_id, customer_id, is_proven, paid_off_amount) VALUES ($1, $2, false, 0)")
        .bind(account_id)
        .bind(customer_id)
        .execute(pool)
        .await?;
    sqlx::query(
        "INSERT INTO loans (loan_id, account_id, customer_id, loan_amount, status, cashback_earned_total)
         VALUES ($1, $2, $3, 300000, 'paid_off', 0)",
    )
    .bind(loan_id)
    .bind(account_id)
    .bind(customer_id)
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO account_payments (
            account_payment_id, account_id, due_date, principal_amount, interest_amount,
            late_fee_amount, late_fee_applied, paid_principal, paid_interest, paid_late_fee,
            paid_amount, due_amount, paid_date, status
         ) VALUES ($1, $2, $3, 75000, 20000, 5000, 1, 75000, 20000, 5000, 100000, 0, $3, 'paid_on_time')",
    )
    .bind(account_payment_id)
    .bind(account_id)
    .bind(d(2026, 3, 1))
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO payments (
            payment_id, loan_id, account_payment_id, installment_principal, installment_interest,
            late_fee_amount, late_fee_applied, paid_principal, paid_interest, paid_late_fee,
            paid_amount, due_amount, due_date, paid_date, status, cashback_earned, notes
         ) VALUES ($1, $2, $3, 75000, 20000, 5000, 1, 75000, 20000, 5000, 100000, 0, $4, $4,
                   'paid_on_time', 0, '[]'::jsonb)",
    )
    .bind(payment_id)
    .bind(loan_id)
    .bind(account_payment_id)
    .bind(d(2026, 3, 1))
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO account_transactions (
            account_transaction_id, account_id, transaction_date, transaction_amount,
            transaction_type, towards_principal, towards_interest, towards_latefee, can_reverse
         ) VALUES ($1, $2, $3, 100000, 'payment', 75000, 20000, 5000, true)",
    )
    .bind(transaction_id)
    .bind(account_id)
    .bind(d(2026, 3, 1))
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO payment_events (
            payment_event_id, payment_id, event_type, amount, due_amount_after, event_date,
            can_reverse, account_transaction_id, payment_method
         ) VALUES ($1, $2, 'payment', 100000, 0, $3, true, $4, 'bank_transfer')",
    )
    .bind(event_id)
    .bind(payment_id)
    .bind(d(2026, 3, 1))
    .bind(transaction_id)
    .execute(pool)
    .await?;

    Ok((account_id.into(), transaction_id.into()))
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_reversal_round_trips_through_postgres() {
    let stores = TestDualStores::new("./../infra_db/migrations", "./../infra_db/migrations_collection")
        .await
        .expect("containers start");

    let (account_id, transaction_id) = seed_paid_installment(&stores.primary.pool)
        .await
        .expect("seed");

    let settings = interface_ops::ServicingConfig::default()
        .reversal_settings()
        .expect("settings");
    let ops = ServicingOps::new(stores.pools(), settings, Arc::new(NoRepayment));

    let outcome = ops
        .process_account_transaction_reversal(account_id, transaction_id, Some("e2e test"), false)
        .await
        .expect("reversal succeeds");

    assert_eq!(outcome.totals.total(), Money::idr(100_000));

    // The payment is back to unpaid in the database
    let (paid_amount, due_amount): (rust_decimal::Decimal, rust_decimal::Decimal) =
        sqlx::query_as("SELECT paid_amount, due_amount FROM payments LIMIT 1")
            .fetch_one(&stores.primary.pool)
            .await
            .expect("payment row");
    assert_eq!(paid_amount, rust_decimal::Decimal::ZERO);
    assert_eq!(due_amount, rust_decimal::Decimal::from(100_000));

    // The original transaction is terminal and linked to its reversal
    let (can_reverse, reversal_id): (bool, Option<Uuid>) = sqlx::query_as(
        "SELECT can_reverse, reversal_transaction_id FROM account_transactions
         WHERE account_transaction_id = $1",
    )
    .bind(*transaction_id.as_uuid())
    .fetch_one(&stores.primary.pool)
    .await
    .expect("transaction row");
    assert!(!can_reverse);
    assert_eq!(reversal_id, Some(*outcome.reversal_transaction.id.as_uuid()));

    // A void event exists for the reversal transaction
    let (void_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM payment_events WHERE event_type = 'payment_void' AND account_transaction_id = $1",
    )
    .bind(*outcome.reversal_transaction.id.as_uuid())
    .fetch_one(&stores.primary.pool)
    .await
    .expect("void count");
    assert_eq!(void_count, 1);

    // The collection store mirror reflects the re-derived status
    let (status,): (String,) =
        sqlx::query_as("SELECT status FROM collection_account_payments LIMIT 1")
            .fetch_one(&stores.collection.pool)
            .await
            .expect("collection mirror");
    assert_eq!(status, "overdue");

    // At-most-once: the second attempt fails
    let second = ops
        .process_account_transaction_reversal(account_id, transaction_id, None, false)
        .await;
    assert!(second.is_err());
}
