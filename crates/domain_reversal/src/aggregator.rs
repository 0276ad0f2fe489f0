//! Account-level aggregator
//!
//! After every constituent payment of a period has been adjusted, the
//! aggregate is re-derived: status, paid date, and the due-amount ratchet.
//! A status transition records history, steps the account-level cashback
//! counter backward, and emits an account-status recompute command carrying
//! the transaction type as the override reason.

use chrono::NaiveDate;

use domain_servicing::{
    AccountPayment, CashbackCounterHistory, Payment, StatusContext, TransactionType,
};

use crate::context::CashbackScheme;
use crate::outcome::{AccountPaymentStatusHistory, AccountStatusRecompute, ReversalLog};

/// Re-derives one account payment from its adjusted payments
pub fn reconcile_account_payment(
    account_payment: &mut AccountPayment,
    group: &[Payment],
    counter_histories: &[CashbackCounterHistory],
    scheme: &CashbackScheme,
    today: NaiveDate,
    transaction_type: TransactionType,
    log: &mut ReversalLog,
) {
    let refs: Vec<&Payment> = group.iter().collect();

    let new_status = account_payment.derive_status(&refs, today, StatusContext::Reversal);
    if new_status != account_payment.status {
        log.account_payment_status_histories
            .push(AccountPaymentStatusHistory {
                account_payment_id: account_payment.id,
                status_old: account_payment.status,
                status_new: new_status,
                changed_at: chrono::Utc::now(),
            });
        log.status_changed_account_payments.push(account_payment.id);
        account_payment.status = new_status;

        // Counter moves backward on reversal-driven status changes
        if scheme.eligible {
            if let Some(row) = step_down_account_counter(account_payment, counter_histories) {
                log.counter_entries.push(row);
            }
        }
    }

    account_payment.paid_date = account_payment.derive_paid_date(&refs);
    account_payment.clamp_due_amount(&refs);

    log.account_status_recomputes.push(AccountStatusRecompute {
        account_payment_id: account_payment.id,
        reason_override: transaction_type.as_str().to_string(),
    });
}

/// Steps the account payment's own counter down one, floored at zero
///
/// Considers the newest counter row of the group regardless of which
/// payment wrote it; no row is appended when there is no history or the
/// counter already sits at zero.
fn step_down_account_counter(
    account_payment: &AccountPayment,
    counter_histories: &[CashbackCounterHistory],
) -> Option<CashbackCounterHistory> {
    let latest = counter_histories
        .iter()
        .rev()
        .find(|h| h.account_payment_id == account_payment.id)?;
    if latest.counter == 0 {
        return None;
    }
    Some(CashbackCounterHistory::new(
        account_payment.id,
        None,
        latest.counter - 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{AccountId, AccountPaymentId, Currency, LoanId, Money};
    use domain_servicing::{AccountPaymentStatus, PaymentComponent};
    use std::collections::BTreeMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn scheme() -> CashbackScheme {
        CashbackScheme {
            eligible: true,
            counter_ceiling: 4,
            percentage_mapping: BTreeMap::new(),
        }
    }

    fn reversed_group() -> (AccountPayment, Vec<Payment>) {
        let mut ap = AccountPayment::new(AccountId::new(), d(2026, 2, 1), Currency::IDR);
        ap.status = AccountPaymentStatus::PaidOnTime;
        let mut p = Payment::new(
            LoanId::new(),
            ap.id,
            Money::idr(75_000),
            Money::idr(20_000),
            d(2026, 2, 1),
        );
        p.paid_principal = Money::idr(75_000);
        p.paid_interest = Money::idr(20_000);
        p.paid_amount = Money::idr(95_000);
        p.due_amount = Money::idr(0);
        ap.paid_principal = p.paid_principal;
        ap.paid_interest = p.paid_interest;
        ap.paid_amount = p.paid_amount;
        ap.due_amount = Money::idr(0);

        // Undo the interest portion
        p.reverse_component(PaymentComponent::Interest, Money::idr(20_000))
            .unwrap();
        ap.mirror_reversal(PaymentComponent::Interest, Money::idr(20_000))
            .unwrap();
        (ap, vec![p])
    }

    #[test]
    fn test_status_transition_recorded_and_counter_stepped() {
        let (mut ap, group) = reversed_group();
        let histories = vec![CashbackCounterHistory::new(ap.id, None, 3)];
        let mut log = ReversalLog::default();

        reconcile_account_payment(
            &mut ap,
            &group,
            &histories,
            &scheme(),
            d(2026, 3, 1),
            TransactionType::PaymentVoid,
            &mut log,
        );

        assert_eq!(ap.status, AccountPaymentStatus::Overdue);
        assert_eq!(log.account_payment_status_histories.len(), 1);
        assert_eq!(log.status_changed_account_payments, vec![ap.id]);
        assert_eq!(log.counter_entries.len(), 1);
        assert_eq!(log.counter_entries[0].counter, 2);
        assert_eq!(log.account_status_recomputes.len(), 1);
        assert_eq!(log.account_status_recomputes[0].reason_override, "payment_void");
    }

    #[test]
    fn test_no_status_change_no_history() {
        let (mut ap, group) = reversed_group();
        ap.status = AccountPaymentStatus::Overdue; // already re-derived
        let mut log = ReversalLog::default();

        reconcile_account_payment(
            &mut ap,
            &group,
            &[],
            &scheme(),
            d(2026, 3, 1),
            TransactionType::PaymentVoid,
            &mut log,
        );

        assert!(log.account_payment_status_histories.is_empty());
        assert!(log.counter_entries.is_empty());
        // Recompute command still emitted
        assert_eq!(log.account_status_recomputes.len(), 1);
    }

    #[test]
    fn test_counter_at_zero_not_stepped() {
        let (mut ap, group) = reversed_group();
        let histories = vec![CashbackCounterHistory::new(ap.id, None, 0)];
        let mut log = ReversalLog::default();

        reconcile_account_payment(
            &mut ap,
            &group,
            &histories,
            &scheme(),
            d(2026, 3, 1),
            TransactionType::PaymentVoid,
            &mut log,
        );
        assert!(log.counter_entries.is_empty());
    }

    #[test]
    fn test_due_amount_ratchet_applied() {
        let (mut ap, group) = reversed_group();
        ap.due_amount = Money::idr(500_000); // drift above the bound
        let mut log = ReversalLog::default();

        reconcile_account_payment(
            &mut ap,
            &group,
            &[],
            &scheme(),
            d(2026, 3, 1),
            TransactionType::PaymentVoid,
            &mut log,
        );
        assert_eq!(ap.due_amount, Money::idr(20_000));
    }
}
