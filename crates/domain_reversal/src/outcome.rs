//! Reversal outcomes and emitted commands
//!
//! The engine never performs I/O. Everything the reversal produced (new
//! ledger rows, update commands for external collaborators, and deferred
//! effects to fire strictly after commit) is collected here for the
//! infrastructure layer to persist and dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, AccountPaymentId, CustomerId, LoanId, Money, PaymentId};
use domain_servicing::{
    AccountPaymentStatus, AccountPropertyHistory, AccountTransaction, CashbackCounterHistory,
    CustomerWalletHistory, LoanStatus, PaymentEvent, PaymentStatus,
};

/// Per-component totals reversed across one whole transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversedTotals {
    pub principal: Money,
    pub interest: Money,
    pub late_fee: Money,
}

impl ReversedTotals {
    pub fn zero(currency: core_kernel::Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            principal: zero,
            interest: zero,
            late_fee: zero,
        }
    }

    /// Sum across all three components
    pub fn total(&self) -> Money {
        self.principal + self.interest + self.late_fee
    }
}

/// Reversed principal/interest/late-fee split of one void event, forwarded
/// to commission bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub payment_id: PaymentId,
    pub principal: Money,
    pub interest: Money,
    pub late_fee: Money,
}

/// Command: a loan's status changed as a side effect of the reversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanStatusChange {
    pub loan_id: LoanId,
    pub status_old: LoanStatus,
    pub status_new: LoanStatus,
    /// Change reason forwarded to the loan-status collaborator
    pub change_reason: String,
}

/// Audit record of a payment status transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusHistory {
    pub payment_id: PaymentId,
    pub status_old: PaymentStatus,
    pub status_new: PaymentStatus,
    pub changed_at: DateTime<Utc>,
}

/// Audit record of an account payment status transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPaymentStatusHistory {
    pub account_payment_id: AccountPaymentId,
    pub status_old: AccountPaymentStatus,
    pub status_new: AccountPaymentStatus,
    pub changed_at: DateTime<Utc>,
}

/// Command: recompute the account-level status with an override reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatusRecompute {
    pub account_payment_id: AccountPaymentId,
    pub reason_override: String,
}

/// Fire-and-forget side effects, dispatched only after both stores commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferredEffect {
    /// Undo an early credit-limit release for loans that regained a balance
    RollbackEarlyLimitRelease { loan_ids: Vec<LoanId> },
    /// Remove account payments from the collection dialer queue
    DeleteFromCollectionQueue {
        account_payment_ids: Vec<AccountPaymentId>,
    },
    /// Refresh the external virtual-account transaction mirror
    UpdateVaTransaction { account_id: AccountId },
    /// Recompute the first-installment collection risk bucket
    RecomputeRiskBucket { account_id: AccountId },
    /// Push a customer-engagement event
    SendMoengageEvent {
        customer_id: CustomerId,
        event: String,
    },
    /// Void pending cashback-claim experiment state
    VoidCashbackClaim {
        account_payment_ids: Vec<AccountPaymentId>,
    },
}

/// Result of the best-effort commission/PTP adjuster
///
/// Failures are reported as data, never raised: the adjuster must not abort
/// the enclosing financial reversal, and tests assert on this variant
/// instead of parsing logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdjusterOutcome {
    /// Adjustments applied
    Applied {
        ptps_cleared: usize,
        commissions_adjusted: usize,
    },
    /// Nothing to adjust (wrong transaction type or no PTPs in scope)
    Skipped,
    /// The adjuster failed; logged, reversal unaffected
    Failed { reason: String },
}

/// Everything one transaction reversal produced
#[derive(Debug, Clone)]
pub struct ReversalOutcome {
    /// The compensating transaction
    pub reversal_transaction: AccountTransaction,
    /// Created void events, attached to the reversal transaction
    pub void_events: Vec<PaymentEvent>,
    /// Per-component totals across the whole transaction
    pub totals: ReversedTotals,
    /// Appended wallet ledger rows
    pub wallet_entries: Vec<CustomerWalletHistory>,
    /// Appended cashback counter rows
    pub counter_entries: Vec<CashbackCounterHistory>,
    /// Reversed splits for commission bookkeeping
    pub commission_splits: Vec<CommissionSplit>,
    /// Loan status change commands
    pub loan_status_changes: Vec<LoanStatusChange>,
    /// Payment status audit records
    pub payment_status_histories: Vec<PaymentStatusHistory>,
    /// Account payment status audit records
    pub account_payment_status_histories: Vec<AccountPaymentStatusHistory>,
    /// Account status recompute commands
    pub account_status_recomputes: Vec<AccountStatusRecompute>,
    /// Account property audit records (proven flag)
    pub property_histories: Vec<AccountPropertyHistory>,
    /// Per-payment cashback-claim experiment voids
    pub claim_voids: Vec<PaymentId>,
    /// Post-commit side effects
    pub deferred_effects: Vec<DeferredEffect>,
    /// Best-effort commission/PTP adjuster result
    pub adjuster: AdjusterOutcome,
}

impl ReversalOutcome {
    /// Creates an empty outcome around a reversal transaction
    pub fn new(reversal_transaction: AccountTransaction, currency: core_kernel::Currency) -> Self {
        Self {
            reversal_transaction,
            void_events: Vec::new(),
            totals: ReversedTotals::zero(currency),
            wallet_entries: Vec::new(),
            counter_entries: Vec::new(),
            commission_splits: Vec::new(),
            loan_status_changes: Vec::new(),
            payment_status_histories: Vec::new(),
            account_payment_status_histories: Vec::new(),
            account_status_recomputes: Vec::new(),
            property_histories: Vec::new(),
            claim_voids: Vec::new(),
            deferred_effects: Vec::new(),
            adjuster: AdjusterOutcome::Skipped,
        }
    }
}

/// Accumulator threaded through the recorder and aggregator
///
/// Collects every record and command a reversal produces; the orchestrator
/// folds it into the final [`ReversalOutcome`] once the reversal
/// transaction exists.
#[derive(Debug, Default, Clone)]
pub struct ReversalLog {
    pub wallet_entries: Vec<CustomerWalletHistory>,
    pub counter_entries: Vec<CashbackCounterHistory>,
    pub commission_splits: Vec<CommissionSplit>,
    pub loan_status_changes: Vec<LoanStatusChange>,
    pub payment_status_histories: Vec<PaymentStatusHistory>,
    pub account_payment_status_histories: Vec<AccountPaymentStatusHistory>,
    pub account_status_recomputes: Vec<AccountStatusRecompute>,
    pub property_histories: Vec<AccountPropertyHistory>,
    pub claim_voids: Vec<PaymentId>,
    /// Loans that dropped out of the paid-off state during this reversal
    pub paid_off_dropped_loans: Vec<LoanId>,
    /// Account payments whose status transitioned during this reversal
    pub status_changed_account_payments: Vec<AccountPaymentId>,
}

impl ReversalLog {
    /// Folds the log into an outcome around the reversal transaction
    pub fn into_outcome(
        self,
        reversal_transaction: AccountTransaction,
        totals: ReversedTotals,
        void_events: Vec<PaymentEvent>,
        deferred_effects: Vec<DeferredEffect>,
        adjuster: AdjusterOutcome,
    ) -> ReversalOutcome {
        ReversalOutcome {
            reversal_transaction,
            void_events,
            totals,
            wallet_entries: self.wallet_entries,
            counter_entries: self.counter_entries,
            commission_splits: self.commission_splits,
            loan_status_changes: self.loan_status_changes,
            payment_status_histories: self.payment_status_histories,
            account_payment_status_histories: self.account_payment_status_histories,
            account_status_recomputes: self.account_status_recomputes,
            property_histories: self.property_histories,
            claim_voids: self.claim_voids,
            deferred_effects,
            adjuster,
        }
    }
}

/// Outcome of a chained customer-payment reversal
#[derive(Debug, Clone)]
pub struct ChainedReversalOutcome {
    /// The target transaction's reversal
    pub target: ReversalOutcome,
    /// Temporary reversals of newer transactions, newest first
    pub temporary: Vec<ReversalOutcome>,
    /// Transactions created by replaying the temporary reversals
    pub replayed_transaction_ids: Vec<core_kernel::AccountTransactionId>,
    /// Transaction created by the optional transfer to another account
    pub destination_transaction_id: Option<core_kernel::AccountTransactionId>,
    /// Post-commit side effects of the chained operation itself
    pub deferred_effects: Vec<DeferredEffect>,
}
