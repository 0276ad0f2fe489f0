//! Customer wallet and cashback ledgers
//!
//! Wallet balance changes and cashback counter movements are append-only
//! histories: a reversal appends compensating entries, it never edits rows
//! already written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    AccountPaymentId, CashbackCounterId, CustomerId, Money, PaymentId, WalletHistoryId,
};

/// Reason codes for wallet balance changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletChangeReason {
    /// Wallet balance used to fund a payment
    CustomerWallet,
    /// Refund of a wallet-funded payment that was reversed
    CustomerWalletVoid,
    /// Reversal of a non-wallet payment adjusted cashback state
    PaymentReversal,
    /// Cashback credited because the customer overpaid
    CashbackOverPaid,
    /// Compensation of an overpaid-cashback credit
    CashbackOverPaidVoid,
    /// Cashback earned by an on-time payment
    CashbackEarned,
    /// Compensation of earned cashback
    CashbackEarnedVoid,
    /// Claw-back of loan-level available cashback
    CashbackAvailableVoid,
}

impl WalletChangeReason {
    /// Stable string form used in ledger rows and audit notes
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletChangeReason::CustomerWallet => "customer_wallet",
            WalletChangeReason::CustomerWalletVoid => "customer_wallet_void",
            WalletChangeReason::PaymentReversal => "payment_reversal",
            WalletChangeReason::CashbackOverPaid => "cashback_over_paid",
            WalletChangeReason::CashbackOverPaidVoid => "cashback_over_paid_void",
            WalletChangeReason::CashbackEarned => "cashback_earned",
            WalletChangeReason::CashbackEarnedVoid => "cashback_earned_void",
            WalletChangeReason::CashbackAvailableVoid => "cashback_available_void",
        }
    }
}

/// One append-only wallet balance delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerWalletHistory {
    /// Unique identifier
    pub id: WalletHistoryId,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Why the balance moved
    pub change_reason: WalletChangeReason,
    /// Accruing balance before the change
    pub wallet_balance_accruing_old: Money,
    /// Accruing balance after the change
    pub wallet_balance_accruing: Money,
    /// Available balance before the change
    pub wallet_balance_available_old: Money,
    /// Available balance after the change
    pub wallet_balance_available: Money,
    /// Payment that triggered the change, if any
    pub payment_id: Option<PaymentId>,
    /// Creation timestamp
    pub cdate: DateTime<Utc>,
}

impl CustomerWalletHistory {
    /// Accruing delta recorded by this entry
    pub fn accruing_delta(&self) -> Money {
        self.wallet_balance_accruing - self.wallet_balance_accruing_old
    }

    /// Available delta recorded by this entry
    pub fn available_delta(&self) -> Money {
        self.wallet_balance_available - self.wallet_balance_available_old
    }
}

/// One append-only cashback counter movement
///
/// The counter keys the tiered cashback percentage; it moves forward with
/// on-time payments and backward on reversal, clamped to `[0, ceiling]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbackCounterHistory {
    /// Unique identifier
    pub id: CashbackCounterId,
    /// Account payment the movement belongs to
    pub account_payment_id: AccountPaymentId,
    /// Payment that caused the movement, if any
    pub payment_id: Option<PaymentId>,
    /// Counter value after the movement
    pub counter: u32,
    /// Creation timestamp
    pub cdate: DateTime<Utc>,
}

impl CashbackCounterHistory {
    /// Creates a new counter row
    pub fn new(
        account_payment_id: AccountPaymentId,
        payment_id: Option<PaymentId>,
        counter: u32,
    ) -> Self {
        Self {
            id: CashbackCounterId::new_v7(),
            account_payment_id,
            payment_id,
            counter,
            cdate: Utc::now(),
        }
    }
}

/// A customer's wallet balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerWallet {
    /// Owning customer
    pub customer_id: CustomerId,
    /// Balance still accruing (not yet claimable)
    pub balance_accruing: Money,
    /// Balance available to spend
    pub balance_available: Money,
}

impl CustomerWallet {
    /// Creates an empty wallet
    pub fn new(customer_id: CustomerId, currency: core_kernel::Currency) -> Self {
        Self {
            customer_id,
            balance_accruing: Money::zero(currency),
            balance_available: Money::zero(currency),
        }
    }

    /// Applies a signed balance change and returns the ledger row
    pub fn apply_change(
        &mut self,
        change_accruing: Money,
        change_available: Money,
        reason: WalletChangeReason,
        payment_id: Option<PaymentId>,
    ) -> CustomerWalletHistory {
        let accruing_old = self.balance_accruing;
        let available_old = self.balance_available;
        self.balance_accruing = self.balance_accruing + change_accruing;
        self.balance_available = self.balance_available + change_available;
        CustomerWalletHistory {
            id: WalletHistoryId::new_v7(),
            customer_id: self.customer_id,
            change_reason: reason,
            wallet_balance_accruing_old: accruing_old,
            wallet_balance_accruing: self.balance_accruing,
            wallet_balance_available_old: available_old,
            wallet_balance_available: self.balance_available,
            payment_id,
            cdate: Utc::now(),
        }
    }
}
