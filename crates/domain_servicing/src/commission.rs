//! Agent commission records

use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, AccountPaymentId, CommissionId, Money};

use crate::error::ServicingError;

/// A commission record tied to an account / account-payment / credited-amount
/// triple. Reversal decrements the amounts in place when the reversed payment
/// funded the commission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionLookup {
    /// Unique identifier
    pub id: CommissionId,
    /// Owning account
    pub account_id: AccountId,
    /// Account payment the commission was earned against
    pub account_payment_id: AccountPaymentId,
    /// Payment amount the commission is based on
    pub payment_amount: Money,
    /// Amount credited to the agent
    pub credited_amount: Money,
}

impl CommissionLookup {
    /// Creates a new commission record
    pub fn new(
        account_id: AccountId,
        account_payment_id: AccountPaymentId,
        payment_amount: Money,
        credited_amount: Money,
    ) -> Self {
        Self {
            id: CommissionId::new_v7(),
            account_id,
            account_payment_id,
            payment_amount,
            credited_amount,
        }
    }

    /// Decrements both amounts by the reversed magnitude, floored at zero
    pub fn decrement(&mut self, reversed: Money) -> Result<(), ServicingError> {
        if reversed.is_negative() {
            return Err(ServicingError::Validation(format!(
                "commission decrement must be non-negative, got {}",
                reversed
            )));
        }
        self.payment_amount = (self.payment_amount - reversed).floor_zero();
        self.credited_amount = (self.credited_amount - reversed).floor_zero();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut commission = CommissionLookup::new(
            AccountId::new(),
            AccountPaymentId::new(),
            Money::idr(100_000),
            Money::idr(5_000),
        );
        commission.decrement(Money::idr(30_000)).unwrap();
        assert_eq!(commission.payment_amount, Money::idr(70_000));
        assert_eq!(commission.credited_amount, Money::idr(0));
    }

    #[test]
    fn test_decrement_rejects_negative() {
        let mut commission = CommissionLookup::new(
            AccountId::new(),
            AccountPaymentId::new(),
            Money::idr(100_000),
            Money::idr(5_000),
        );
        assert!(commission.decrement(Money::idr(-1)).is_err());
    }
}
