//! Servicing operations facade
//!
//! The programmatic entry points admin actions, refinancing workflows, and
//! support tooling call. Each operation opens a dual-store transaction,
//! loads the account's working set under row locks, runs the pure reversal
//! engine, persists the result, commits both stores, and only then
//! dispatches deferred effects.

use std::sync::Arc;

use chrono::Utc;

use core_kernel::{AccountId, AccountTransactionId, Timezone};
use domain_reversal::outcome::{ChainedReversalOutcome, DeferredEffect, ReversalOutcome};
use domain_reversal::ports::{CashbackExperimentPort, RepaymentPort};
use domain_reversal::{chained, orchestrator, transfer};
use infra_db::{DualPools, DualStoreTransaction, PreloadedExperimentFlags, ReversalRepository};

use crate::config::ServicingConfig;
use crate::effects::{EffectDispatch, TracingEffectDispatch};
use crate::error::OpsError;

/// The operations facade
pub struct ServicingOps {
    pools: DualPools,
    repository: ReversalRepository,
    repayment: Arc<dyn RepaymentPort>,
    dispatcher: Arc<dyn EffectDispatch>,
    timezone: Timezone,
}

impl ServicingOps {
    /// Wires the facade from already-connected pools and settings
    pub fn new(
        pools: DualPools,
        settings: infra_db::ReversalSettings,
        repayment: Arc<dyn RepaymentPort>,
    ) -> Self {
        Self {
            pools,
            repository: ReversalRepository::new(settings),
            repayment,
            dispatcher: Arc::new(TracingEffectDispatch),
            timezone: Timezone::operating(),
        }
    }

    /// Wires the facade from configuration and a repayment engine
    pub async fn from_config(
        config: &ServicingConfig,
        repayment: Arc<dyn RepaymentPort>,
    ) -> Result<Self, OpsError> {
        let pools = DualPools::connect(
            infra_db::DatabaseConfig::new(&config.primary_database_url),
            infra_db::DatabaseConfig::new(&config.collection_database_url),
        )
        .await?;
        Ok(Self {
            pools,
            repository: ReversalRepository::new(config.reversal_settings()?),
            repayment,
            dispatcher: Arc::new(TracingEffectDispatch),
            timezone: Timezone::operating(),
        })
    }

    /// Replaces the deferred-effect dispatcher
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn EffectDispatch>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Reverses one account transaction
    ///
    /// Exposed to admin actions and the refinancing workflow
    /// (`refinancing_reversal = true` marks the reversal as
    /// restructuring-driven).
    pub async fn process_account_transaction_reversal(
        &self,
        account_id: AccountId,
        transaction_id: AccountTransactionId,
        note: Option<&str>,
        refinancing_reversal: bool,
    ) -> Result<ReversalOutcome, OpsError> {
        let mut dual = DualStoreTransaction::begin(&self.pools).await?;
        let today = self.timezone.civil_date(Utc::now());

        let flags = PreloadedExperimentFlags::load(&mut dual.primary, &[account_id]).await?;
        let claim_active = flags.is_claim_active(today, account_id);

        let mut ctx = self
            .repository
            .load_context(&mut dual, account_id, today, claim_active)
            .await?;
        let outcome = orchestrator::process_account_transaction_reversal(
            &mut ctx,
            transaction_id,
            note,
            refinancing_reversal,
        )?;

        self.repository.persist_context(&mut dual, &ctx).await?;
        self.repository
            .persist_outcome(&mut dual, &ctx, &outcome)
            .await?;
        dual.commit().await?;

        self.dispatch(&outcome.deferred_effects).await;
        Ok(outcome)
    }

    /// Reverses a late-fee application transaction
    pub async fn process_late_fee_reversal(
        &self,
        account_id: AccountId,
        transaction_id: AccountTransactionId,
        note: Option<&str>,
    ) -> Result<ReversalOutcome, OpsError> {
        let mut dual = DualStoreTransaction::begin(&self.pools).await?;
        let today = self.timezone.civil_date(Utc::now());

        let mut ctx = self
            .repository
            .load_context(&mut dual, account_id, today, false)
            .await?;
        let outcome = orchestrator::process_late_fee_reversal(&mut ctx, transaction_id, note)?;

        self.repository.persist_context(&mut dual, &ctx).await?;
        self.repository
            .persist_outcome(&mut dual, &ctx, &outcome)
            .await?;
        dual.commit().await?;

        self.dispatch(&outcome.deferred_effects).await;
        Ok(outcome)
    }

    /// Reverses a customer payment, resolving chained newer transactions
    ///
    /// With `account_destination` the target's reversed value is
    /// transferred to the other account inside the same atomic scope.
    pub async fn process_customer_payment_reversal(
        &self,
        account_id: AccountId,
        target_transaction_id: AccountTransactionId,
        account_destination: Option<AccountId>,
        note: Option<&str>,
    ) -> Result<ChainedReversalOutcome, OpsError> {
        let mut dual = DualStoreTransaction::begin(&self.pools).await?;
        let today = self.timezone.civil_date(Utc::now());

        let flags = PreloadedExperimentFlags::load(&mut dual.primary, &[account_id]).await?;
        let claim_active = flags.is_claim_active(today, account_id);

        let mut ctx = self
            .repository
            .load_context(&mut dual, account_id, today, claim_active)
            .await?;
        let mut destination_ctx = match account_destination {
            Some(dest_id) => Some(
                self.repository
                    .load_context(&mut dual, dest_id, today, false)
                    .await?,
            ),
            None => None,
        };

        let outcome = chained::process_customer_payment_reversal(
            &mut ctx,
            destination_ctx.as_mut(),
            target_transaction_id,
            note,
            self.repayment.as_ref(),
        )?;

        self.repository.persist_context(&mut dual, &ctx).await?;
        self.repository
            .persist_outcome(&mut dual, &ctx, &outcome.target)
            .await?;
        for temporary in &outcome.temporary {
            self.repository
                .persist_outcome(&mut dual, &ctx, temporary)
                .await?;
        }
        if let Some(dest_ctx) = &destination_ctx {
            self.repository.persist_context(&mut dual, dest_ctx).await?;
        }
        dual.commit().await?;

        for reversal in std::iter::once(&outcome.target).chain(outcome.temporary.iter()) {
            self.dispatch(&reversal.deferred_effects).await;
        }
        self.dispatch(&outcome.deferred_effects).await;
        Ok(outcome)
    }

    /// Transfers an already-reversed transaction's value to another account
    ///
    /// Exposed for support tooling that settles a reversal onto a sibling
    /// account after the fact.
    pub async fn transfer_payment_after_reversal(
        &self,
        account_id: AccountId,
        destination_account_id: AccountId,
        origin_transaction_id: AccountTransactionId,
        reversal_transaction_id: AccountTransactionId,
        note: Option<&str>,
    ) -> Result<AccountTransactionId, OpsError> {
        let mut dual = DualStoreTransaction::begin(&self.pools).await?;
        let today = self.timezone.civil_date(Utc::now());

        let mut ctx = self
            .repository
            .load_context(&mut dual, account_id, today, false)
            .await?;
        let mut destination_ctx = self
            .repository
            .load_context(&mut dual, destination_account_id, today, false)
            .await?;

        let new_transaction_id = transfer::transfer_payment_after_reversal(
            &mut ctx,
            Some(&mut destination_ctx),
            &transfer::TransferArgs {
                origin_transaction_id,
                reversal_transaction_id,
                note,
            },
            self.repayment.as_ref(),
        )?;

        self.repository.persist_context(&mut dual, &ctx).await?;
        self.repository
            .persist_context(&mut dual, &destination_ctx)
            .await?;
        dual.commit().await?;

        Ok(new_transaction_id)
    }

    async fn dispatch(&self, effects: &[DeferredEffect]) {
        for effect in effects {
            self.dispatcher.dispatch(effect).await;
        }
    }
}
