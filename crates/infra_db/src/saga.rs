//! Dual-store atomicity
//!
//! The reversal engine's writes span the primary ledger store and the
//! collection store. PostgreSQL cannot give a true cross-store transaction
//! here, so the commit is staged: collection first, then primary, with
//! compensating statements replayed against the collection store if the
//! primary commit fails.
//!
//! Narrowed guarantee: a process crash after the collection commit but
//! before the primary commit leaves the collection store ahead until the
//! downstream reconciliation job repairs it. This mirrors the gap in the
//! system this engine replaces and is deliberate; see DESIGN.md.

use sqlx::{Postgres, Transaction};

use crate::error::DatabaseError;
use crate::pool::DualPools;

/// A compensating statement to replay against the collection store when
/// the primary commit fails after the collection store already committed
#[derive(Debug, Clone)]
pub struct Compensation {
    /// SQL to execute
    pub sql: String,
    /// Human-readable description for the failure log
    pub description: String,
}

/// One unit of work spanning both stores
pub struct DualStoreTransaction<'a> {
    pools: &'a DualPools,
    /// Open transaction on the primary ledger store
    pub primary: Transaction<'a, Postgres>,
    /// Open transaction on the collection store
    pub collection: Transaction<'a, Postgres>,
    compensations: Vec<Compensation>,
}

impl<'a> DualStoreTransaction<'a> {
    /// Begins a transaction on each store
    pub async fn begin(pools: &'a DualPools) -> Result<DualStoreTransaction<'a>, DatabaseError> {
        let primary = pools.primary.begin().await?;
        let collection = pools.collection.begin().await?;
        Ok(Self {
            pools,
            primary,
            collection,
            compensations: Vec::new(),
        })
    }

    /// Registers a compensating statement for a collection-store write
    ///
    /// Every write against `self.collection` should register its inverse
    /// here before executing.
    pub fn register_compensation(&mut self, sql: impl Into<String>, description: impl Into<String>) {
        self.compensations.push(Compensation {
            sql: sql.into(),
            description: description.into(),
        });
    }

    /// Commits both stores
    ///
    /// The collection store commits first; if the primary commit then
    /// fails, the registered compensations are replayed against the
    /// collection store and the error propagates.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        let DualStoreTransaction {
            pools,
            primary,
            collection,
            compensations,
        } = self;

        collection.commit().await.map_err(|e| {
            DatabaseError::TransactionFailed(format!("collection store commit failed: {}", e))
        })?;

        if let Err(primary_err) = primary.commit().await {
            tracing::error!(
                error = %primary_err,
                compensations = compensations.len(),
                "primary commit failed after collection commit, compensating"
            );
            for compensation in &compensations {
                if let Err(comp_err) = sqlx::query(&compensation.sql)
                    .execute(&pools.collection)
                    .await
                {
                    tracing::error!(
                        description = %compensation.description,
                        error = %comp_err,
                        "compensation failed, collection store left ahead for reconciliation"
                    );
                }
            }
            return Err(DatabaseError::DualStoreCommitFailed(
                primary_err.to_string(),
            ));
        }

        Ok(())
    }

    /// Rolls both stores back
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        // Rollback order is irrelevant; neither store has committed
        self.collection.rollback().await?;
        self.primary.rollback().await?;
        Ok(())
    }
}
