//! Database row types and domain conversions
//!
//! Rows are read with runtime-checked queries into `FromRow` structs and
//! mapped onto domain entities. Status and type columns are stored as
//! snake_case text; money columns are NUMERIC and carry the configured
//! operating currency.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use core_kernel::{Currency, Money};
use domain_servicing::{
    Account, AccountPayment, AccountPaymentStatus, AccountTransaction, CashbackCounterHistory,
    CommissionLookup, CustomerWallet, CustomerWalletHistory, Loan, LoanStatus, Payment,
    PaymentEvent, PaymentEventType, PaymentStatus, PaybackTransaction, Ptp, PtpStatus,
    TransactionType, WalletChangeReason,
};

use crate::error::DatabaseError;

fn money(amount: Decimal, currency: Currency) -> Money {
    Money::new(amount, currency)
}

fn bad_enum(column: &str, value: &str) -> DatabaseError {
    DatabaseError::SerializationError(format!("unknown {} value '{}'", column, value))
}

pub fn payment_status_from_str(s: &str) -> Result<PaymentStatus, DatabaseError> {
    Ok(match s {
        "not_due" => PaymentStatus::NotDue,
        "due_soon" => PaymentStatus::DueSoon,
        "due" => PaymentStatus::Due,
        "overdue" => PaymentStatus::Overdue,
        "paid_on_time" => PaymentStatus::PaidOnTime,
        "paid_in_grace" => PaymentStatus::PaidInGrace,
        "paid_late" => PaymentStatus::PaidLate,
        other => return Err(bad_enum("payment_status", other)),
    })
}

pub fn payment_status_to_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::NotDue => "not_due",
        PaymentStatus::DueSoon => "due_soon",
        PaymentStatus::Due => "due",
        PaymentStatus::Overdue => "overdue",
        PaymentStatus::PaidOnTime => "paid_on_time",
        PaymentStatus::PaidInGrace => "paid_in_grace",
        PaymentStatus::PaidLate => "paid_late",
    }
}

pub fn account_payment_status_from_str(s: &str) -> Result<AccountPaymentStatus, DatabaseError> {
    Ok(match s {
        "not_due" => AccountPaymentStatus::NotDue,
        "due_soon" => AccountPaymentStatus::DueSoon,
        "due" => AccountPaymentStatus::Due,
        "overdue" => AccountPaymentStatus::Overdue,
        "paid_on_time" => AccountPaymentStatus::PaidOnTime,
        "paid_in_grace" => AccountPaymentStatus::PaidInGrace,
        "paid_late" => AccountPaymentStatus::PaidLate,
        other => return Err(bad_enum("account_payment_status", other)),
    })
}

pub fn account_payment_status_to_str(status: AccountPaymentStatus) -> &'static str {
    match status {
        AccountPaymentStatus::NotDue => "not_due",
        AccountPaymentStatus::DueSoon => "due_soon",
        AccountPaymentStatus::Due => "due",
        AccountPaymentStatus::Overdue => "overdue",
        AccountPaymentStatus::PaidOnTime => "paid_on_time",
        AccountPaymentStatus::PaidInGrace => "paid_in_grace",
        AccountPaymentStatus::PaidLate => "paid_late",
    }
}

pub fn loan_status_from_str(s: &str) -> Result<LoanStatus, DatabaseError> {
    Ok(match s {
        "inactive" => LoanStatus::Inactive,
        "current" => LoanStatus::Current,
        "active_in_grace" => LoanStatus::ActiveInGrace,
        "delinquent" => LoanStatus::Delinquent,
        "paid_off" => LoanStatus::PaidOff,
        other => return Err(bad_enum("loan_status", other)),
    })
}

pub fn loan_status_to_str(status: LoanStatus) -> &'static str {
    match status {
        LoanStatus::Inactive => "inactive",
        LoanStatus::Current => "current",
        LoanStatus::ActiveInGrace => "active_in_grace",
        LoanStatus::Delinquent => "delinquent",
        LoanStatus::PaidOff => "paid_off",
    }
}

pub fn transaction_type_from_str(s: &str) -> Result<TransactionType, DatabaseError> {
    Ok(match s {
        "payment" => TransactionType::Payment,
        "payment_void" => TransactionType::PaymentVoid,
        "customer_wallet" => TransactionType::CustomerWallet,
        "customer_wallet_void" => TransactionType::CustomerWalletVoid,
        "late_fee" => TransactionType::LateFee,
        "late_fee_void" => TransactionType::LateFeeVoid,
        other => return Err(bad_enum("transaction_type", other)),
    })
}

pub fn event_type_from_str(s: &str) -> Result<PaymentEventType, DatabaseError> {
    Ok(match s {
        "payment" => PaymentEventType::Payment,
        "payment_void" => PaymentEventType::PaymentVoid,
        "late_fee" => PaymentEventType::LateFee,
        "late_fee_void" => PaymentEventType::LateFeeVoid,
        "customer_wallet" => PaymentEventType::CustomerWallet,
        "customer_wallet_void" => PaymentEventType::CustomerWalletVoid,
        other => return Err(bad_enum("event_type", other)),
    })
}

pub fn wallet_reason_from_str(s: &str) -> Result<WalletChangeReason, DatabaseError> {
    Ok(match s {
        "customer_wallet" => WalletChangeReason::CustomerWallet,
        "customer_wallet_void" => WalletChangeReason::CustomerWalletVoid,
        "payment_reversal" => WalletChangeReason::PaymentReversal,
        "cashback_over_paid" => WalletChangeReason::CashbackOverPaid,
        "cashback_over_paid_void" => WalletChangeReason::CashbackOverPaidVoid,
        "cashback_earned" => WalletChangeReason::CashbackEarned,
        "cashback_earned_void" => WalletChangeReason::CashbackEarnedVoid,
        "cashback_available_void" => WalletChangeReason::CashbackAvailableVoid,
        other => return Err(bad_enum("change_reason", other)),
    })
}

pub fn ptp_status_from_str(s: Option<&str>) -> Result<Option<PtpStatus>, DatabaseError> {
    Ok(match s {
        None => None,
        Some("active") => Some(PtpStatus::Active),
        Some("paid") => Some(PtpStatus::Paid),
        Some("broken") => Some(PtpStatus::Broken),
        Some(other) => return Err(bad_enum("ptp_status", other)),
    })
}

pub fn ptp_status_to_str(status: Option<PtpStatus>) -> Option<&'static str> {
    status.map(|s| match s {
        PtpStatus::Active => "active",
        PtpStatus::Paid => "paid",
        PtpStatus::Broken => "broken",
    })
}

#[derive(Debug, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub loan_id: Uuid,
    pub account_payment_id: Uuid,
    pub installment_principal: Decimal,
    pub installment_interest: Decimal,
    pub late_fee_amount: Decimal,
    pub late_fee_applied: i32,
    pub paid_principal: Decimal,
    pub paid_interest: Decimal,
    pub paid_late_fee: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: String,
    pub cashback_earned: Decimal,
    pub notes: serde_json::Value,
    pub udate: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_domain(self, currency: Currency) -> Result<Payment, DatabaseError> {
        let notes: Vec<String> = serde_json::from_value(self.notes)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        Ok(Payment {
            id: self.payment_id.into(),
            loan_id: self.loan_id.into(),
            account_payment_id: self.account_payment_id.into(),
            installment_principal: money(self.installment_principal, currency),
            installment_interest: money(self.installment_interest, currency),
            late_fee_amount: money(self.late_fee_amount, currency),
            late_fee_applied: self.late_fee_applied.max(0) as u32,
            paid_principal: money(self.paid_principal, currency),
            paid_interest: money(self.paid_interest, currency),
            paid_late_fee: money(self.paid_late_fee, currency),
            paid_amount: money(self.paid_amount, currency),
            due_amount: money(self.due_amount, currency),
            due_date: self.due_date,
            paid_date: self.paid_date,
            status: payment_status_from_str(&self.status)?,
            cashback_earned: money(self.cashback_earned, currency),
            notes,
            udate: self.udate,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AccountPaymentRow {
    pub account_payment_id: Uuid,
    pub account_id: Uuid,
    pub due_date: NaiveDate,
    pub principal_amount: Decimal,
    pub interest_amount: Decimal,
    pub late_fee_amount: Decimal,
    pub late_fee_applied: i32,
    pub paid_principal: Decimal,
    pub paid_interest: Decimal,
    pub paid_late_fee: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub paid_date: Option<NaiveDate>,
    pub status: String,
    pub ptp_date: Option<NaiveDate>,
    pub udate: DateTime<Utc>,
}

impl AccountPaymentRow {
    pub fn into_domain(self, currency: Currency) -> Result<AccountPayment, DatabaseError> {
        Ok(AccountPayment {
            id: self.account_payment_id.into(),
            account_id: self.account_id.into(),
            due_date: self.due_date,
            principal_amount: money(self.principal_amount, currency),
            interest_amount: money(self.interest_amount, currency),
            late_fee_amount: money(self.late_fee_amount, currency),
            late_fee_applied: self.late_fee_applied.max(0) as u32,
            paid_principal: money(self.paid_principal, currency),
            paid_interest: money(self.paid_interest, currency),
            paid_late_fee: money(self.paid_late_fee, currency),
            paid_amount: money(self.paid_amount, currency),
            due_amount: money(self.due_amount, currency),
            paid_date: self.paid_date,
            status: account_payment_status_from_str(&self.status)?,
            ptp_date: self.ptp_date,
            udate: self.udate,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AccountTransactionRow {
    pub account_transaction_id: Uuid,
    pub account_id: Uuid,
    pub transaction_date: NaiveDate,
    pub transaction_amount: Decimal,
    pub transaction_type: String,
    pub towards_principal: Decimal,
    pub towards_interest: Decimal,
    pub towards_latefee: Decimal,
    pub can_reverse: bool,
    pub reversal_transaction_id: Option<Uuid>,
    pub reversed_transaction_origin_id: Option<Uuid>,
    pub note: Option<String>,
    pub cdate: DateTime<Utc>,
}

impl AccountTransactionRow {
    pub fn into_domain(self, currency: Currency) -> Result<AccountTransaction, DatabaseError> {
        Ok(AccountTransaction {
            id: self.account_transaction_id.into(),
            account_id: self.account_id.into(),
            transaction_date: self.transaction_date,
            transaction_amount: money(self.transaction_amount, currency),
            transaction_type: transaction_type_from_str(&self.transaction_type)?,
            towards_principal: money(self.towards_principal, currency),
            towards_interest: money(self.towards_interest, currency),
            towards_latefee: money(self.towards_latefee, currency),
            can_reverse: self.can_reverse,
            reversal_transaction_id: self.reversal_transaction_id.map(Into::into),
            reversed_transaction_origin_id: self.reversed_transaction_origin_id.map(Into::into),
            note: self.note,
            cdate: self.cdate,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentEventRow {
    pub payment_event_id: Uuid,
    pub payment_id: Uuid,
    pub event_type: String,
    pub amount: Decimal,
    pub due_amount_after: Decimal,
    pub event_date: NaiveDate,
    pub can_reverse: bool,
    pub account_transaction_id: Option<Uuid>,
    pub payment_receipt: Option<String>,
    pub payment_method: Option<String>,
}

impl PaymentEventRow {
    pub fn into_domain(self, currency: Currency) -> Result<PaymentEvent, DatabaseError> {
        Ok(PaymentEvent {
            id: self.payment_event_id.into(),
            payment_id: self.payment_id.into(),
            event_type: event_type_from_str(&self.event_type)?,
            amount: money(self.amount, currency),
            due_amount_after: money(self.due_amount_after, currency),
            event_date: self.event_date,
            can_reverse: self.can_reverse,
            account_transaction_id: self.account_transaction_id.map(Into::into),
            payment_receipt: self.payment_receipt,
            payment_method: self.payment_method,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct LoanRow {
    pub loan_id: Uuid,
    pub account_id: Uuid,
    pub customer_id: Uuid,
    pub loan_amount: Decimal,
    pub status: String,
    pub cashback_earned_total: Decimal,
}

impl LoanRow {
    pub fn into_domain(self, currency: Currency) -> Result<Loan, DatabaseError> {
        Ok(Loan {
            id: self.loan_id.into(),
            account_id: self.account_id.into(),
            customer_id: self.customer_id.into(),
            loan_amount: money(self.loan_amount, currency),
            status: loan_status_from_str(&self.status)?,
            cashback_earned_total: money(self.cashback_earned_total, currency),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub customer_id: Uuid,
    pub is_proven: bool,
    pub paid_off_amount: Decimal,
}

impl AccountRow {
    pub fn into_domain(self, currency: Currency) -> Account {
        Account {
            id: self.account_id.into(),
            customer_id: self.customer_id.into(),
            is_proven: self.is_proven,
            paid_off_amount: money(self.paid_off_amount, currency),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct WalletRow {
    pub customer_id: Uuid,
    pub balance_accruing: Decimal,
    pub balance_available: Decimal,
}

impl WalletRow {
    pub fn into_domain(self, currency: Currency) -> CustomerWallet {
        CustomerWallet {
            customer_id: self.customer_id.into(),
            balance_accruing: money(self.balance_accruing, currency),
            balance_available: money(self.balance_available, currency),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct WalletHistoryRow {
    pub wallet_history_id: Uuid,
    pub customer_id: Uuid,
    pub change_reason: String,
    pub accruing_old: Decimal,
    pub accruing_new: Decimal,
    pub available_old: Decimal,
    pub available_new: Decimal,
    pub payment_id: Option<Uuid>,
    pub cdate: DateTime<Utc>,
}

impl WalletHistoryRow {
    pub fn into_domain(self, currency: Currency) -> Result<CustomerWalletHistory, DatabaseError> {
        Ok(CustomerWalletHistory {
            id: self.wallet_history_id.into(),
            customer_id: self.customer_id.into(),
            change_reason: wallet_reason_from_str(&self.change_reason)?,
            wallet_balance_accruing_old: money(self.accruing_old, currency),
            wallet_balance_accruing: money(self.accruing_new, currency),
            wallet_balance_available_old: money(self.available_old, currency),
            wallet_balance_available: money(self.available_new, currency),
            payment_id: self.payment_id.map(Into::into),
            cdate: self.cdate,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CounterHistoryRow {
    pub cashback_counter_id: Uuid,
    pub account_payment_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub counter: i32,
    pub cdate: DateTime<Utc>,
}

impl CounterHistoryRow {
    pub fn into_domain(self) -> CashbackCounterHistory {
        CashbackCounterHistory {
            id: self.cashback_counter_id.into(),
            account_payment_id: self.account_payment_id.into(),
            payment_id: self.payment_id.map(Into::into),
            counter: self.counter.max(0) as u32,
            cdate: self.cdate,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PtpRow {
    pub ptp_id: Uuid,
    pub account_payment_id: Uuid,
    pub created_date: NaiveDate,
    pub ptp_date: NaiveDate,
    pub ptp_amount: Decimal,
    pub status: Option<String>,
}

impl PtpRow {
    pub fn into_domain(self, currency: Currency) -> Result<Ptp, DatabaseError> {
        Ok(Ptp {
            id: self.ptp_id.into(),
            account_payment_id: self.account_payment_id.into(),
            created_date: self.created_date,
            ptp_date: self.ptp_date,
            ptp_amount: money(self.ptp_amount, currency),
            status: ptp_status_from_str(self.status.as_deref())?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CommissionRow {
    pub commission_id: Uuid,
    pub account_id: Uuid,
    pub account_payment_id: Uuid,
    pub payment_amount: Decimal,
    pub credited_amount: Decimal,
}

impl CommissionRow {
    pub fn into_domain(self, currency: Currency) -> CommissionLookup {
        CommissionLookup {
            id: self.commission_id.into(),
            account_id: self.account_id.into(),
            account_payment_id: self.account_payment_id.into(),
            payment_amount: money(self.payment_amount, currency),
            credited_amount: money(self.credited_amount, currency),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PaybackRow {
    pub payback_id: Uuid,
    pub customer_id: Uuid,
    pub account_id: Uuid,
    pub account_transaction_id: Option<Uuid>,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub payback_service: String,
    pub is_processed: bool,
    pub cdate: DateTime<Utc>,
}

impl PaybackRow {
    pub fn into_domain(self, currency: Currency) -> PaybackTransaction {
        PaybackTransaction {
            id: self.payback_id.into(),
            customer_id: self.customer_id.into(),
            account_id: self.account_id.into(),
            amount: money(self.amount, currency),
            transaction_date: self.transaction_date,
            payback_service: self.payback_service,
            is_processed: self.is_processed,
            cdate: self.cdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips() {
        for status in [
            PaymentStatus::NotDue,
            PaymentStatus::Overdue,
            PaymentStatus::PaidInGrace,
        ] {
            assert_eq!(
                payment_status_from_str(payment_status_to_str(status)).unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_unknown_enum_is_rejected() {
        assert!(payment_status_from_str("paid_twice").is_err());
        assert!(transaction_type_from_str("chargeback").is_err());
    }

    #[test]
    fn test_ptp_status_null_round_trip() {
        assert_eq!(ptp_status_from_str(None).unwrap(), None);
        assert_eq!(ptp_status_to_str(None), None);
        assert_eq!(
            ptp_status_from_str(ptp_status_to_str(Some(PtpStatus::Active))).unwrap(),
            Some(PtpStatus::Active)
        );
    }
}
