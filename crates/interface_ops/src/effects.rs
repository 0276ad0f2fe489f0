//! Deferred effect dispatch
//!
//! Deferred effects are dispatched only after both stores have committed,
//! never before: acting on state that might still roll back is worse than
//! acting late. Dispatch is best-effort; a failed push is logged and never
//! propagated to the caller.

use async_trait::async_trait;

use domain_reversal::outcome::DeferredEffect;

/// Sink for post-commit fire-and-forget effects
#[async_trait]
pub trait EffectDispatch: Send + Sync {
    /// Delivers one effect; implementations swallow and log failures
    async fn dispatch(&self, effect: &DeferredEffect);
}

/// Default dispatcher: logs each effect for the background workers to pick
/// up from the log pipeline
#[derive(Debug, Default, Clone)]
pub struct TracingEffectDispatch;

#[async_trait]
impl EffectDispatch for TracingEffectDispatch {
    async fn dispatch(&self, effect: &DeferredEffect) {
        match effect {
            DeferredEffect::RollbackEarlyLimitRelease { loan_ids } => {
                tracing::info!(count = loan_ids.len(), "effect: rollback early limit release");
            }
            DeferredEffect::DeleteFromCollectionQueue {
                account_payment_ids,
            } => {
                tracing::info!(
                    count = account_payment_ids.len(),
                    "effect: delete from collection queue"
                );
            }
            DeferredEffect::UpdateVaTransaction { account_id } => {
                tracing::info!(%account_id, "effect: update VA transaction mirror");
            }
            DeferredEffect::RecomputeRiskBucket { account_id } => {
                tracing::info!(%account_id, "effect: recompute collection risk bucket");
            }
            DeferredEffect::SendMoengageEvent { customer_id, event } => {
                tracing::info!(%customer_id, event = event.as_str(), "effect: engagement push");
            }
            DeferredEffect::VoidCashbackClaim {
                account_payment_ids,
            } => {
                tracing::info!(
                    count = account_payment_ids.len(),
                    "effect: void cashback claim state"
                );
            }
        }
    }
}
