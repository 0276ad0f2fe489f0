//! Reversal working set
//!
//! The engine is synchronous and pure over an in-memory working set loaded
//! by the infrastructure layer under row locks. Mutations land back in the
//! context; everything that must be persisted or dispatched is also
//! collected in the [`crate::outcome::ReversalOutcome`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    AccountPaymentId, AccountTransactionId, Currency, CustomerId, LoanId, Money, PaymentId,
};
use domain_servicing::{
    Account, AccountPayment, AccountTransaction, CashbackCounterHistory, CommissionLookup,
    CustomerWallet, CustomerWalletHistory, Loan, Payment, PaymentEvent, PaybackTransaction, Ptp,
};

use crate::error::ReversalError;

/// Tiered cashback configuration
///
/// The counter keys the percentage tier; `percentage_for` resolves the tier
/// whose threshold is the largest one not above the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbackScheme {
    /// Whether the account is on the new tiered scheme
    pub eligible: bool,
    /// Counter ceiling; the counter never moves above this
    pub counter_ceiling: u32,
    /// Percentage per counter threshold
    pub percentage_mapping: BTreeMap<u32, Decimal>,
}

impl CashbackScheme {
    /// A scheme that is switched off entirely
    pub fn disabled() -> Self {
        Self {
            eligible: false,
            counter_ceiling: 0,
            percentage_mapping: BTreeMap::new(),
        }
    }

    /// Resolves the cashback percentage for a counter value
    pub fn percentage_for(&self, counter: u32) -> Decimal {
        self.percentage_mapping
            .range(..=counter)
            .next_back()
            .map(|(_, pct)| *pct)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Account-wide working set for reversal operations
#[derive(Debug, Clone)]
pub struct ReversalContext {
    /// The account under reversal
    pub account: Account,
    /// Owning customer
    pub customer_id: CustomerId,
    /// The customer's wallet balances
    pub wallet: CustomerWallet,
    /// All transactions of the account
    pub transactions: BTreeMap<AccountTransactionId, AccountTransaction>,
    /// All payment events of the account's payments, append-only
    pub events: Vec<PaymentEvent>,
    /// The account's payments
    pub payments: BTreeMap<PaymentId, Payment>,
    /// The account's account payments
    pub account_payments: BTreeMap<AccountPaymentId, AccountPayment>,
    /// The account's loans
    pub loans: BTreeMap<LoanId, Loan>,
    /// Promise-to-pay records
    pub ptps: Vec<Ptp>,
    /// Commission records
    pub commissions: Vec<CommissionLookup>,
    /// Wallet ledger, chronological (oldest first)
    pub wallet_histories: Vec<CustomerWalletHistory>,
    /// Cashback counter ledger, chronological (oldest first)
    pub counter_histories: Vec<CashbackCounterHistory>,
    /// Origin payback per processed transaction
    pub paybacks: BTreeMap<AccountTransactionId, PaybackTransaction>,
    /// Cashback scheme configuration for this account
    pub scheme: CashbackScheme,
    /// Whether the cashback-claim experiment is active on the reversal date
    pub claim_experiment_active: bool,
    /// Proven-account threshold from configuration
    pub proven_threshold: Money,
    /// Civil date the reversal runs on
    pub today: NaiveDate,
    /// Operating currency
    pub currency: Currency,
}

impl ReversalContext {
    /// Returns the target transaction or a missing-entity error
    pub fn transaction(
        &self,
        id: AccountTransactionId,
    ) -> Result<&AccountTransaction, ReversalError> {
        self.transactions
            .get(&id)
            .ok_or_else(|| ReversalError::missing("AccountTransaction", id))
    }

    /// Events attached to one transaction, in insertion order
    pub fn events_of_transaction(&self, id: AccountTransactionId) -> Vec<PaymentEvent> {
        self.events
            .iter()
            .filter(|e| e.account_transaction_id == Some(id))
            .cloned()
            .collect()
    }

    /// Events recorded against one payment, in insertion order
    pub fn events_of_payment(&self, id: PaymentId) -> Vec<&PaymentEvent> {
        self.events.iter().filter(|e| e.payment_id == id).collect()
    }

    /// Payment ids of a group, ordered by due date with `first` leading
    pub fn group_payment_ids(
        &self,
        account_payment_id: AccountPaymentId,
        first: PaymentId,
    ) -> Vec<PaymentId> {
        let mut ids: Vec<_> = self
            .payments
            .values()
            .filter(|p| p.account_payment_id == account_payment_id)
            .map(|p| (p.due_date, p.id))
            .collect();
        ids.sort();
        let mut ordered: Vec<PaymentId> = Vec::with_capacity(ids.len());
        ordered.push(first);
        ordered.extend(ids.into_iter().map(|(_, id)| id).filter(|id| *id != first));
        ordered
    }

    /// Removes a payment group from the map for in-place mutation
    ///
    /// The orchestrator works on the extracted group and reinserts it with
    /// [`Self::restore_group`]; extraction keeps borrow scopes disjoint.
    pub fn take_group(&mut self, ids: &[PaymentId]) -> Result<Vec<Payment>, ReversalError> {
        ids.iter()
            .map(|id| {
                self.payments
                    .remove(id)
                    .ok_or_else(|| ReversalError::missing("Payment", id))
            })
            .collect()
    }

    /// Reinserts a previously taken payment group
    pub fn restore_group(&mut self, group: Vec<Payment>) {
        for payment in group {
            self.payments.insert(payment.id, payment);
        }
    }

    /// Latest counter row for a specific payment
    pub fn latest_counter_for_payment(&self, id: PaymentId) -> Option<&CashbackCounterHistory> {
        self.counter_histories
            .iter()
            .rev()
            .find(|h| h.payment_id == Some(id))
    }

    /// Latest counter row per sibling account payment, excluding one group
    pub fn latest_sibling_counters(
        &self,
        exclude: AccountPaymentId,
    ) -> Vec<&CashbackCounterHistory> {
        let mut latest: BTreeMap<AccountPaymentId, &CashbackCounterHistory> = BTreeMap::new();
        for row in &self.counter_histories {
            if row.account_payment_id != exclude {
                latest.insert(row.account_payment_id, row);
            }
        }
        latest.into_values().collect()
    }

    /// Latest wallet ledger row with the given reason
    pub fn latest_wallet_history(
        &self,
        reason: domain_servicing::WalletChangeReason,
    ) -> Option<&CustomerWalletHistory> {
        self.wallet_histories
            .iter()
            .rev()
            .find(|h| h.change_reason == reason)
    }

    /// Payments belonging to one loan
    pub fn loan_payments(&self, loan_id: LoanId) -> Vec<&Payment> {
        self.payments
            .values()
            .filter(|p| p.loan_id == loan_id)
            .collect()
    }
}
