//! Promise-to-pay records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountPaymentId, DateWindow, Money, PtpId};

/// Status of a promise to pay; `None` on the record means the promise is
/// inactive (satisfied and cleared)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtpStatus {
    /// Commitment outstanding
    Active,
    /// Satisfied by a payment
    Paid,
    /// Expired unsatisfied
    Broken,
}

/// A customer's commitment to pay by a specific date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ptp {
    /// Unique identifier
    pub id: PtpId,
    /// Account payment the promise is against
    pub account_payment_id: AccountPaymentId,
    /// Date the promise was made
    pub created_date: NaiveDate,
    /// Promised payment date
    pub ptp_date: NaiveDate,
    /// Promised amount
    pub ptp_amount: Money,
    /// Current status; `None` = inactive
    pub status: Option<PtpStatus>,
}

impl Ptp {
    /// Creates an active promise
    pub fn new(
        account_payment_id: AccountPaymentId,
        created_date: NaiveDate,
        ptp_date: NaiveDate,
        ptp_amount: Money,
    ) -> Self {
        Self {
            id: PtpId::new_v7(),
            account_payment_id,
            created_date,
            ptp_date,
            ptp_amount,
            status: Some(PtpStatus::Active),
        }
    }

    /// The inclusive date window this promise covers
    pub fn window(&self) -> DateWindow {
        // created_date <= ptp_date is enforced at creation time upstream
        DateWindow {
            start: self.created_date,
            end: self.ptp_date,
        }
    }

    /// Returns true if the promise covers the given transaction date
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.window().contains(date)
    }

    /// Returns true if the promise window ended before the given date
    pub fn expired_by(&self, date: NaiveDate) -> bool {
        self.window().expired_by(date)
    }

    /// Clears the promise status (inactive); returns the previous status
    pub fn clear_status(&mut self) -> Option<PtpStatus> {
        self.status.take()
    }
}
