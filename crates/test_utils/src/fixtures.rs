//! Pre-built Test Fixtures
//!
//! Ready-to-use, predictable test data for common servicing entities.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, AccountPaymentId, AccountTransactionId, CustomerId, LoanId, Money, PaymentId};

/// The standard cashback percentage tiers used across test suites
pub static STANDARD_CASHBACK_TIERS: Lazy<BTreeMap<u32, Decimal>> = Lazy::new(|| {
    let mut mapping = BTreeMap::new();
    mapping.insert(1u32, dec!(0.01));
    mapping.insert(3u32, dec!(0.02));
    mapping.insert(4u32, dec!(0.03));
    mapping
});

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A standard full installment (principal + interest + late fee)
    pub fn installment_total() -> Money {
        Money::idr(100_000)
    }

    /// The standard principal portion
    pub fn principal() -> Money {
        Money::idr(75_000)
    }

    /// The standard interest portion
    pub fn interest() -> Money {
        Money::idr(20_000)
    }

    /// The standard late fee portion
    pub fn late_fee() -> Money {
        Money::idr(5_000)
    }

    /// A partial reversal amount smaller than the late fee
    pub fn partial_late_fee() -> Money {
        Money::idr(3_000)
    }

    /// The proven-account threshold used across tests
    pub fn proven_threshold() -> Money {
        Money::idr(500_000)
    }

    /// Zero rupiah
    pub fn zero() -> Money {
        Money::idr(0)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// First installment due date (Mar 1, 2026)
    pub fn first_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    /// Second installment due date (Apr 1, 2026)
    pub fn second_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    /// A reversal date well past every due date (Jun 15, 2026)
    pub fn reversal_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    /// PTP creation date (Feb 20, 2026)
    pub fn ptp_created() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()
    }

    /// PTP promised date (Mar 5, 2026)
    pub fn ptp_promised() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn account_id() -> AccountId {
        AccountId::new()
    }

    pub fn customer_id() -> CustomerId {
        CustomerId::new()
    }

    pub fn loan_id() -> LoanId {
        LoanId::new()
    }

    pub fn payment_id() -> PaymentId {
        PaymentId::new()
    }

    pub fn account_payment_id() -> AccountPaymentId {
        AccountPaymentId::new()
    }

    pub fn transaction_id() -> AccountTransactionId {
        AccountTransactionId::new()
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    /// A stable payment channel label
    pub fn payback_service() -> &'static str {
        "bank_transfer"
    }

    /// A stable receipt reference
    pub fn receipt() -> &'static str {
        "RCPT-2026-000451"
    }

    /// A randomized partner name for variety in bulk fixtures
    pub fn partner_name() -> String {
        CompanyName().fake()
    }
}
