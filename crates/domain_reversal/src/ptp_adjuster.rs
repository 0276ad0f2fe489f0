//! Commission and promise-to-pay adjuster
//!
//! Best-effort by contract: a failure here is logged and reported as
//! [`AdjusterOutcome::Failed`], never propagated, because aborting a
//! customer-facing financial reversal over collection bookkeeping is worse
//! than a discrepancy the collection tooling can repair.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use core_kernel::{AccountPaymentId, Money};
use domain_servicing::{
    AccountPayment, AccountTransaction, CommissionLookup, PaymentEvent, PaymentEventType, Ptp,
    PtpStatus,
};

use crate::outcome::AdjusterOutcome;

/// Inputs for one adjuster run
pub struct AdjusterScope<'a> {
    /// Account payments touched by the reversal, keyed by id
    pub account_payments: &'a mut BTreeMap<AccountPaymentId, AccountPayment>,
    /// All PTPs of the account
    pub ptps: &'a mut [Ptp],
    /// All commission records of the account
    pub commissions: &'a mut [CommissionLookup],
    /// Full event ledger including the just-created voids
    pub events: &'a [PaymentEvent],
    /// Payment-id to account-payment-id mapping
    pub payment_owner: &'a BTreeMap<core_kernel::PaymentId, AccountPaymentId>,
    /// Civil date of the reversal
    pub today: NaiveDate,
}

/// Adjusts commissions and PTP state for a reversed payment transaction
///
/// For each touched account payment: PTPs covering the original transaction
/// date are inspected. A satisfied PTP whose window has expired gets its
/// status cleared and the account payment's `ptp_date` restored. Active
/// PTPs get their matching commission decremented by the reversed
/// magnitude and their satisfaction re-evaluated against the net of
/// payment and void events inside the window.
pub fn adjust_commission_and_ptp(
    scope: &mut AdjusterScope<'_>,
    original: &AccountTransaction,
    reversed_by_account_payment: &BTreeMap<AccountPaymentId, Money>,
) -> AdjusterOutcome {
    match try_adjust(scope, original, reversed_by_account_payment) {
        Ok((ptps_cleared, commissions_adjusted)) => {
            if ptps_cleared == 0 && commissions_adjusted == 0 {
                AdjusterOutcome::Skipped
            } else {
                AdjusterOutcome::Applied {
                    ptps_cleared,
                    commissions_adjusted,
                }
            }
        }
        Err(reason) => {
            tracing::error!(
                transaction_id = %original.id,
                %reason,
                "commission/PTP adjustment failed, reversal unaffected"
            );
            AdjusterOutcome::Failed { reason }
        }
    }
}

fn try_adjust(
    scope: &mut AdjusterScope<'_>,
    original: &AccountTransaction,
    reversed_by_account_payment: &BTreeMap<AccountPaymentId, Money>,
) -> Result<(usize, usize), String> {
    let mut ptps_cleared = 0usize;
    let mut commissions_adjusted = 0usize;

    for (&account_payment_id, &reversed) in reversed_by_account_payment {
        if !reversed.is_positive() {
            continue;
        }
        for index in 0..scope.ptps.len() {
            let ptp = &scope.ptps[index];
            if ptp.account_payment_id != account_payment_id
                || ptp.status.is_none()
                || !ptp.covers(original.transaction_date)
            {
                continue;
            }

            if ptp.expired_by(scope.today) {
                // The reversal breaks a promise that was satisfied in the
                // past; restore the visible ptp_date and clear the status
                if scope.ptps[index].status == Some(PtpStatus::Paid) {
                    restore_ptp_date(scope.account_payments, &scope.ptps[index])?;
                    scope.ptps[index].clear_status();
                    ptps_cleared += 1;
                }
                continue;
            }

            // Active, unexpired promise: adjust the funded commission
            if let Some(commission) = scope.commissions.iter_mut().find(|c| {
                c.account_id == original.account_id
                    && c.account_payment_id == account_payment_id
                    && c.credited_amount.is_positive()
            }) {
                commission.decrement(reversed).map_err(|e| e.to_string())?;
                commissions_adjusted += 1;
            }

            // Re-evaluate satisfaction from the net of events in the window
            let ptp = &scope.ptps[index];
            let net = window_net(scope.events, scope.payment_owner, ptp, account_payment_id);
            if net < ptp.ptp_amount {
                restore_ptp_date(scope.account_payments, ptp)?;
                scope.ptps[index].clear_status();
                ptps_cleared += 1;
            }
        }
    }

    Ok((ptps_cleared, commissions_adjusted))
}

/// Net of payment events minus voids inside the PTP window
///
/// Voids carry negative amounts, so a plain sum of forward and void events
/// nets them out.
fn window_net(
    events: &[PaymentEvent],
    payment_owner: &BTreeMap<core_kernel::PaymentId, AccountPaymentId>,
    ptp: &Ptp,
    account_payment_id: AccountPaymentId,
) -> Money {
    let window = ptp.window();
    events
        .iter()
        .filter(|e| payment_owner.get(&e.payment_id) == Some(&account_payment_id))
        .filter(|e| {
            matches!(
                e.event_type,
                PaymentEventType::Payment
                    | PaymentEventType::PaymentVoid
                    | PaymentEventType::CustomerWallet
                    | PaymentEventType::CustomerWalletVoid
            )
        })
        .filter(|e| window.contains(e.event_date))
        .fold(Money::zero(ptp.ptp_amount.currency()), |acc, e| {
            acc + e.amount
        })
}

fn restore_ptp_date(
    account_payments: &mut BTreeMap<AccountPaymentId, AccountPayment>,
    ptp: &Ptp,
) -> Result<(), String> {
    let account_payment = account_payments
        .get_mut(&ptp.account_payment_id)
        .ok_or_else(|| format!("account payment {} not in scope", ptp.account_payment_id))?;
    account_payment.ptp_date = Some(ptp.ptp_date);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{AccountId, Currency, PaymentId};
    use domain_servicing::TransactionType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct Fixture {
        account_payments: BTreeMap<AccountPaymentId, AccountPayment>,
        ptps: Vec<Ptp>,
        commissions: Vec<CommissionLookup>,
        events: Vec<PaymentEvent>,
        payment_owner: BTreeMap<PaymentId, AccountPaymentId>,
        original: AccountTransaction,
        reversed: BTreeMap<AccountPaymentId, Money>,
    }

    fn fixture() -> Fixture {
        let account_id = AccountId::new();
        let ap = AccountPayment::new(account_id, d(2026, 3, 1), Currency::IDR);
        let ap_id = ap.id;
        let payment_id = PaymentId::new();

        let original = AccountTransaction::new(
            account_id,
            d(2026, 2, 25),
            Money::idr(100_000),
            TransactionType::Payment,
            Money::idr(80_000),
            Money::idr(20_000),
            Money::idr(0),
        );

        // Forward event inside the PTP window
        let mut forward = PaymentEvent::new(
            payment_id,
            PaymentEventType::Payment,
            Money::idr(100_000),
            Money::idr(0),
            d(2026, 2, 25),
            None,
            None,
        );
        forward.attach_to(original.id);

        // The void created by the reversal, also dated inside the window
        let void = PaymentEvent::void(
            payment_id,
            PaymentEventType::PaymentVoid,
            Money::idr(100_000),
            Money::idr(0),
            d(2026, 2, 26),
            None,
            None,
        );

        let ptp = Ptp::new(ap_id, d(2026, 2, 20), d(2026, 3, 5), Money::idr(100_000));
        let commission = CommissionLookup::new(
            account_id,
            ap_id,
            Money::idr(100_000),
            Money::idr(5_000),
        );

        let mut account_payments = BTreeMap::new();
        account_payments.insert(ap_id, ap);
        let mut payment_owner = BTreeMap::new();
        payment_owner.insert(payment_id, ap_id);
        let mut reversed = BTreeMap::new();
        reversed.insert(ap_id, Money::idr(100_000));

        Fixture {
            account_payments,
            ptps: vec![ptp],
            commissions: vec![commission],
            events: vec![forward, void],
            payment_owner,
            original,
            reversed,
        }
    }

    #[test]
    fn test_active_ptp_unsatisfied_after_reversal() {
        let mut f = fixture();
        let today = d(2026, 2, 26); // inside the window

        let outcome = adjust_commission_and_ptp(
            &mut AdjusterScope {
                account_payments: &mut f.account_payments,
                ptps: &mut f.ptps,
                commissions: &mut f.commissions,
                events: &f.events,
                payment_owner: &f.payment_owner,
                today,
            },
            &f.original,
            &f.reversed,
        );

        assert_eq!(
            outcome,
            AdjusterOutcome::Applied {
                ptps_cleared: 1,
                commissions_adjusted: 1
            }
        );
        // Status cleared, ptp_date restored on the account payment
        assert_eq!(f.ptps[0].status, None);
        let ap = f.account_payments.values().next().unwrap();
        assert_eq!(ap.ptp_date, Some(d(2026, 3, 5)));
        // Commission decremented by the reversed magnitude, floored
        assert_eq!(f.commissions[0].payment_amount, Money::idr(0));
        assert_eq!(f.commissions[0].credited_amount, Money::idr(0));
    }

    #[test]
    fn test_expired_satisfied_ptp_restored() {
        let mut f = fixture();
        f.ptps[0].status = Some(PtpStatus::Paid);
        let today = d(2026, 3, 20); // window expired

        let outcome = adjust_commission_and_ptp(
            &mut AdjusterScope {
                account_payments: &mut f.account_payments,
                ptps: &mut f.ptps,
                commissions: &mut f.commissions,
                events: &f.events,
                payment_owner: &f.payment_owner,
                today,
            },
            &f.original,
            &f.reversed,
        );

        assert_eq!(
            outcome,
            AdjusterOutcome::Applied {
                ptps_cleared: 1,
                commissions_adjusted: 0
            }
        );
        assert_eq!(f.ptps[0].status, None);
    }

    #[test]
    fn test_failure_is_reported_not_raised() {
        let mut f = fixture();
        // Remove the account payment so ptp_date restoration fails
        f.account_payments.clear();
        let today = d(2026, 2, 26);

        let outcome = adjust_commission_and_ptp(
            &mut AdjusterScope {
                account_payments: &mut f.account_payments,
                ptps: &mut f.ptps,
                commissions: &mut f.commissions,
                events: &f.events,
                payment_owner: &f.payment_owner,
                today,
            },
            &f.original,
            &f.reversed,
        );

        assert!(matches!(outcome, AdjusterOutcome::Failed { .. }));
    }

    #[test]
    fn test_nothing_in_scope_is_skipped() {
        let mut f = fixture();
        f.ptps.clear();
        let today = d(2026, 2, 26);

        let outcome = adjust_commission_and_ptp(
            &mut AdjusterScope {
                account_payments: &mut f.account_payments,
                ptps: &mut f.ptps,
                commissions: &mut f.commissions,
                events: &f.events,
                payment_owner: &f.payment_owner,
                today,
            },
            &f.original,
            &f.reversed,
        );

        assert_eq!(outcome, AdjusterOutcome::Skipped);
    }
}
