//! Accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CustomerId, Money};

/// A customer's credit account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Whether the account has proven repayment behavior
    ///
    /// Set once the total paid-off loan amount crosses the configured
    /// threshold; a reversal can drop the total back below it.
    pub is_proven: bool,
    /// Running total of paid-off loan amounts used for the proven check
    pub paid_off_amount: Money,
}

impl Account {
    /// Creates a new unproven account
    pub fn new(customer_id: CustomerId, currency: core_kernel::Currency) -> Self {
        Self {
            id: AccountId::new_v7(),
            customer_id,
            is_proven: false,
            paid_off_amount: Money::zero(currency),
        }
    }

    /// Re-evaluates the proven flag after a reversal reduced the paid-off
    /// total. Returns a property-history record when the flag flips.
    pub fn reevaluate_proven(&mut self, threshold: Money) -> Option<AccountPropertyHistory> {
        if self.is_proven && self.paid_off_amount < threshold {
            self.is_proven = false;
            return Some(AccountPropertyHistory {
                account_id: self.id,
                property: "is_proven".to_string(),
                value_old: "true".to_string(),
                value_new: "false".to_string(),
                changed_at: Utc::now(),
            });
        }
        None
    }
}

/// Audit record of a changed account property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPropertyHistory {
    pub account_id: AccountId,
    pub property: String,
    pub value_old: String,
    pub value_new: String,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    #[test]
    fn test_proven_flag_drops_below_threshold() {
        let mut account = Account::new(CustomerId::new(), Currency::IDR);
        account.is_proven = true;
        account.paid_off_amount = Money::idr(400_000);

        let history = account.reevaluate_proven(Money::idr(500_000));
        assert!(!account.is_proven);
        let history = history.expect("flip should be recorded");
        assert_eq!(history.property, "is_proven");
        assert_eq!(history.value_new, "false");
    }

    #[test]
    fn test_proven_flag_holds_at_threshold() {
        let mut account = Account::new(CustomerId::new(), Currency::IDR);
        account.is_proven = true;
        account.paid_off_amount = Money::idr(500_000);

        assert!(account.reevaluate_proven(Money::idr(500_000)).is_none());
        assert!(account.is_proven);
    }

    #[test]
    fn test_unproven_account_untouched() {
        let mut account = Account::new(CustomerId::new(), Currency::IDR);
        assert!(account.reevaluate_proven(Money::idr(500_000)).is_none());
    }
}
