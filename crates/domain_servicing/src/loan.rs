//! Loans

use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CustomerId, LoanId, Money};

use crate::payment::Payment;

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Disbursement not yet active
    Inactive,
    /// Active, nothing overdue
    Current,
    /// Active with an installment in the grace window
    ActiveInGrace,
    /// At least one installment past grace
    Delinquent,
    /// Every installment settled
    PaidOff,
}

/// A disbursed loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    /// Unique identifier
    pub id: LoanId,
    /// Owning account
    pub account_id: AccountId,
    /// Borrowing customer
    pub customer_id: CustomerId,
    /// Disbursed amount
    pub loan_amount: Money,
    /// Current status
    pub status: LoanStatus,
    /// Cumulative cashback earned across the loan's payments
    pub cashback_earned_total: Money,
}

impl Loan {
    /// Creates a new active loan
    pub fn new(account_id: AccountId, customer_id: CustomerId, loan_amount: Money) -> Self {
        Self {
            id: LoanId::new_v7(),
            account_id,
            customer_id,
            loan_amount,
            status: LoanStatus::Current,
            cashback_earned_total: Money::zero(loan_amount.currency()),
        }
    }

    /// Derives the loan status from its payments
    ///
    /// Used after a reversal has adjusted payment balances: a loan that was
    /// paid off drops back to an active status when any installment regains
    /// an outstanding balance.
    pub fn derive_status(
        &self,
        payments: &[&Payment],
        as_of: chrono::NaiveDate,
    ) -> LoanStatus {
        if payments.is_empty() {
            return self.status;
        }
        if payments.iter().all(|p| p.is_paid_off()) {
            return LoanStatus::PaidOff;
        }
        let grace = chrono::Duration::days(crate::payment::GRACE_PERIOD_DAYS);
        let mut worst = LoanStatus::Current;
        for p in payments.iter().filter(|p| !p.is_paid_off()) {
            if as_of > p.due_date + grace {
                return LoanStatus::Delinquent;
            }
            if as_of > p.due_date {
                worst = LoanStatus::ActiveInGrace;
            }
        }
        worst
    }

    /// Subtracts reversed cashback from the cumulative earned total
    ///
    /// Floored at zero: the total never goes negative even if histories
    /// disagree.
    pub fn reverse_cashback_earned(&mut self, amount: Money) {
        self.cashback_earned_total = (self.cashback_earned_total - amount).floor_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::AccountPaymentId;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn loan_with_payment(paid: bool) -> (Loan, Payment) {
        let loan = Loan::new(AccountId::new(), CustomerId::new(), Money::idr(1_000_000));
        let mut p = Payment::new(
            loan.id,
            AccountPaymentId::new(),
            Money::idr(75_000),
            Money::idr(20_000),
            d(2026, 2, 1),
        );
        if paid {
            p.paid_principal = Money::idr(75_000);
            p.paid_interest = Money::idr(20_000);
            p.paid_amount = Money::idr(95_000);
            p.due_amount = Money::idr(0);
        }
        (loan, p)
    }

    #[test]
    fn test_paid_off_when_all_settled() {
        let (loan, p) = loan_with_payment(true);
        assert_eq!(loan.derive_status(&[&p], d(2026, 3, 1)), LoanStatus::PaidOff);
    }

    #[test]
    fn test_delinquent_past_grace() {
        let (loan, p) = loan_with_payment(false);
        assert_eq!(
            loan.derive_status(&[&p], d(2026, 2, 10)),
            LoanStatus::Delinquent
        );
    }

    #[test]
    fn test_in_grace_window() {
        let (loan, p) = loan_with_payment(false);
        assert_eq!(
            loan.derive_status(&[&p], d(2026, 2, 3)),
            LoanStatus::ActiveInGrace
        );
    }

    #[test]
    fn test_reverse_cashback_earned_floors_at_zero() {
        let (mut loan, _) = loan_with_payment(true);
        loan.cashback_earned_total = Money::idr(2_000);
        loan.reverse_cashback_earned(Money::idr(5_000));
        assert_eq!(loan.cashback_earned_total, Money::idr(0));
    }
}
