//! Test Data Builders
//!
//! Builder patterns for constructing servicing test data with sensible
//! defaults. Tests specify only the fields they care about.

use chrono::NaiveDate;

use core_kernel::{AccountId, AccountPaymentId, Currency, LoanId, Money};
use domain_servicing::{
    AccountPayment, AccountTransaction, Payment, PaymentStatus, Ptp, TransactionType,
};

use crate::fixtures::TemporalFixtures;

/// Builder for installment payments
pub struct PaymentBuilder {
    loan_id: LoanId,
    account_payment_id: AccountPaymentId,
    installment_principal: Money,
    installment_interest: Money,
    late_fee_amount: Money,
    due_date: NaiveDate,
    paid: bool,
    paid_date: Option<NaiveDate>,
    cashback_earned: Money,
}

impl Default for PaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentBuilder {
    /// Creates a builder with default installment amounts (75k/20k/5k)
    pub fn new() -> Self {
        Self {
            loan_id: LoanId::new(),
            account_payment_id: AccountPaymentId::new(),
            installment_principal: Money::idr(75_000),
            installment_interest: Money::idr(20_000),
            late_fee_amount: Money::idr(5_000),
            due_date: TemporalFixtures::first_due_date(),
            paid: false,
            paid_date: None,
            cashback_earned: Money::idr(0),
        }
    }

    /// Sets the owning loan
    pub fn with_loan(mut self, loan_id: LoanId) -> Self {
        self.loan_id = loan_id;
        self
    }

    /// Sets the owning account payment
    pub fn with_account_payment(mut self, id: AccountPaymentId) -> Self {
        self.account_payment_id = id;
        self
    }

    /// Sets the installment split
    pub fn with_installments(mut self, principal: Money, interest: Money) -> Self {
        self.installment_principal = principal;
        self.installment_interest = interest;
        self
    }

    /// Sets the accrued late fee
    pub fn with_late_fee(mut self, late_fee: Money) -> Self {
        self.late_fee_amount = late_fee;
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    /// Marks the installment fully paid on the given date
    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.paid = true;
        self.paid_date = Some(date);
        self
    }

    /// Sets the cashback earned by paying this installment
    pub fn with_cashback_earned(mut self, earned: Money) -> Self {
        self.cashback_earned = earned;
        self
    }

    /// Builds the payment
    pub fn build(self) -> Payment {
        let mut payment = Payment::new(
            self.loan_id,
            self.account_payment_id,
            self.installment_principal,
            self.installment_interest,
            self.due_date,
        );
        payment.late_fee_amount = self.late_fee_amount;
        payment.due_amount =
            self.installment_principal + self.installment_interest + self.late_fee_amount;
        payment.cashback_earned = self.cashback_earned;
        if self.paid {
            payment.paid_principal = self.installment_principal;
            payment.paid_interest = self.installment_interest;
            payment.paid_late_fee = self.late_fee_amount;
            payment.paid_amount = payment.due_amount;
            payment.due_amount = Money::idr(0);
            payment.paid_date = self.paid_date;
            payment.status = PaymentStatus::PaidOnTime;
        }
        payment
    }
}

/// Builder for account payments
pub struct AccountPaymentBuilder {
    account_id: AccountId,
    due_date: NaiveDate,
}

impl Default for AccountPaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountPaymentBuilder {
    pub fn new() -> Self {
        Self {
            account_id: AccountId::new(),
            due_date: TemporalFixtures::first_due_date(),
        }
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    /// Builds the aggregate consistent with the supplied payments
    pub fn build_from(self, payments: &[&Payment]) -> AccountPayment {
        let mut ap = AccountPayment::new(self.account_id, self.due_date, Currency::IDR);
        for p in payments {
            ap.principal_amount = ap.principal_amount + p.installment_principal;
            ap.interest_amount = ap.interest_amount + p.installment_interest;
            ap.late_fee_amount = ap.late_fee_amount + p.late_fee_amount;
            ap.paid_principal = ap.paid_principal + p.paid_principal;
            ap.paid_interest = ap.paid_interest + p.paid_interest;
            ap.paid_late_fee = ap.paid_late_fee + p.paid_late_fee;
            ap.paid_amount = ap.paid_amount + p.paid_amount;
            ap.due_amount = ap.due_amount + p.due_amount;
        }
        ap
    }
}

/// Builder for account transactions
pub struct AccountTransactionBuilder {
    account_id: AccountId,
    transaction_date: NaiveDate,
    transaction_type: TransactionType,
    towards_principal: Money,
    towards_interest: Money,
    towards_latefee: Money,
}

impl Default for AccountTransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountTransactionBuilder {
    pub fn new() -> Self {
        Self {
            account_id: AccountId::new(),
            transaction_date: TemporalFixtures::first_due_date(),
            transaction_type: TransactionType::Payment,
            towards_principal: Money::idr(75_000),
            towards_interest: Money::idr(20_000),
            towards_latefee: Money::idr(5_000),
        }
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.transaction_date = date;
        self
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn with_towards(mut self, principal: Money, interest: Money, late_fee: Money) -> Self {
        self.towards_principal = principal;
        self.towards_interest = interest;
        self.towards_latefee = late_fee;
        self
    }

    pub fn build(self) -> AccountTransaction {
        let amount = self.towards_principal + self.towards_interest + self.towards_latefee;
        AccountTransaction::new(
            self.account_id,
            self.transaction_date,
            amount,
            self.transaction_type,
            self.towards_principal,
            self.towards_interest,
            self.towards_latefee,
        )
    }
}

/// Builder for promises to pay
pub struct PtpBuilder {
    account_payment_id: AccountPaymentId,
    created_date: NaiveDate,
    ptp_date: NaiveDate,
    ptp_amount: Money,
}

impl Default for PtpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PtpBuilder {
    pub fn new() -> Self {
        Self {
            account_payment_id: AccountPaymentId::new(),
            created_date: TemporalFixtures::ptp_created(),
            ptp_date: TemporalFixtures::ptp_promised(),
            ptp_amount: Money::idr(100_000),
        }
    }

    pub fn with_account_payment(mut self, id: AccountPaymentId) -> Self {
        self.account_payment_id = id;
        self
    }

    pub fn with_window(mut self, created: NaiveDate, promised: NaiveDate) -> Self {
        self.created_date = created;
        self.ptp_date = promised;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.ptp_amount = amount;
        self
    }

    pub fn build(self) -> Ptp {
        Ptp::new(
            self.account_payment_id,
            self.created_date,
            self.ptp_date,
            self.ptp_amount,
        )
    }
}
