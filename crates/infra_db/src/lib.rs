//! Database infrastructure layer
//!
//! SQLx/PostgreSQL adapters for the reversal engine: dual connection pools
//! (primary ledger store plus the collection store), pessimistic
//! account-payment row locks, the dual-store commit saga, and the
//! repository that loads a reversal working set and persists its outcome.

pub mod adapters;
pub mod error;
pub mod lock;
pub mod pool;
pub mod repositories;
pub mod rows;
pub mod saga;

pub use adapters::PreloadedExperimentFlags;
pub use error::DatabaseError;
pub use lock::{lock_account_payment, lock_account_payments, AccountPaymentLockGuard};
pub use pool::{create_pool, DatabaseConfig, DatabasePool, DualPools};
pub use repositories::{ReversalRepository, ReversalSettings};
pub use saga::DualStoreTransaction;
