//! Shared fixtures for the reversal engine test suites
#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{
    AccountTransactionId, Currency, CustomerId, DomainPort, Money, PaymentId, PortError,
};
use domain_reversal::context::{CashbackScheme, ReversalContext};
use domain_reversal::ports::RepaymentPort;
use domain_servicing::{
    Account, AccountPayment, AccountTransaction, CustomerWallet, Loan, LoanStatus, Payment,
    PaymentEvent, PaymentEventType, PaymentStatus, PaybackTransaction, TransactionType,
};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// An account with one loan and a configurable number of monthly
/// installments, all initially unpaid
pub struct Harness {
    pub ctx: ReversalContext,
    pub loan_id: core_kernel::LoanId,
    pub payment_ids: Vec<PaymentId>,
}

pub fn unpaid_account(installments: u32) -> Harness {
    let customer_id = CustomerId::new();
    let account = Account::new(customer_id, Currency::IDR);
    let account_id = account.id;
    let loan = Loan::new(account_id, customer_id, Money::idr(300_000));
    let loan_id = loan.id;

    let mut payments = BTreeMap::new();
    let mut account_payments = BTreeMap::new();
    let mut payment_ids = Vec::new();

    for i in 0..installments {
        let due = d(2026, 3 + i, 1);
        let mut ap = AccountPayment::new(account_id, due, Currency::IDR);
        let mut p = Payment::new(loan_id, ap.id, Money::idr(75_000), Money::idr(20_000), due);
        p.late_fee_amount = Money::idr(5_000);
        p.due_amount = Money::idr(100_000);
        ap.principal_amount = Money::idr(75_000);
        ap.interest_amount = Money::idr(20_000);
        ap.late_fee_amount = Money::idr(5_000);
        ap.due_amount = Money::idr(100_000);
        payment_ids.push(p.id);
        account_payments.insert(ap.id, ap);
        payments.insert(p.id, p);
    }

    let mut loans = BTreeMap::new();
    loans.insert(loan_id, loan);

    let mut mapping = BTreeMap::new();
    mapping.insert(1u32, dec!(0.01));
    mapping.insert(3u32, dec!(0.02));
    mapping.insert(4u32, dec!(0.03));

    let ctx = ReversalContext {
        account,
        customer_id,
        wallet: CustomerWallet::new(customer_id, Currency::IDR),
        transactions: BTreeMap::new(),
        events: Vec::new(),
        payments,
        account_payments,
        loans,
        ptps: Vec::new(),
        commissions: Vec::new(),
        wallet_histories: Vec::new(),
        counter_histories: Vec::new(),
        paybacks: BTreeMap::new(),
        scheme: CashbackScheme {
            eligible: true,
            counter_ceiling: 4,
            percentage_mapping: mapping,
        },
        claim_experiment_active: false,
        proven_threshold: Money::idr(500_000),
        today: d(2026, 6, 15),
        currency: Currency::IDR,
    };

    Harness {
        ctx,
        loan_id,
        payment_ids,
    }
}

/// Applies a full payment to one installment, creating the forward event
/// and transaction the way the repayment engine would have
pub fn apply_full_payment(
    ctx: &mut ReversalContext,
    payment_id: PaymentId,
    date: NaiveDate,
    transaction_type: TransactionType,
) -> AccountTransactionId {
    let payment = ctx.payments.get_mut(&payment_id).unwrap();
    let total = payment.due_amount;
    let principal = payment.installment_principal;
    let interest = payment.installment_interest;
    let late_fee = payment.late_fee_amount;

    payment.paid_principal = principal;
    payment.paid_interest = interest;
    payment.paid_late_fee = late_fee;
    payment.paid_amount = total;
    payment.due_amount = Money::idr(0);
    payment.paid_date = Some(date);
    payment.status = PaymentStatus::PaidOnTime;
    let ap_id = payment.account_payment_id;
    let loan_id = payment.loan_id;

    let ap = ctx.account_payments.get_mut(&ap_id).unwrap();
    ap.paid_principal = principal;
    ap.paid_interest = interest;
    ap.paid_late_fee = late_fee;
    ap.paid_amount = total;
    ap.due_amount = Money::idr(0);
    ap.paid_date = Some(date);
    ap.status = domain_servicing::AccountPaymentStatus::PaidOnTime;

    let account_id = ctx.account.id;
    let txn = AccountTransaction::new(
        account_id,
        date,
        total,
        transaction_type,
        principal,
        interest,
        late_fee,
    );
    let txn_id = txn.id;

    let event_type = match transaction_type {
        TransactionType::CustomerWallet => PaymentEventType::CustomerWallet,
        _ => PaymentEventType::Payment,
    };
    let mut event = PaymentEvent::new(
        payment_id,
        event_type,
        total,
        Money::idr(0),
        date,
        Some("RCPT-1".to_string()),
        Some("bank_transfer".to_string()),
    );
    event.attach_to(txn_id);

    ctx.events.push(event);
    ctx.transactions.insert(txn_id, txn);
    ctx.paybacks.insert(
        txn_id,
        PaybackTransaction::new(ctx.customer_id, account_id, total, date, "bank_transfer"),
    );

    // Mark the loan paid off once every installment is settled
    if ctx
        .payments
        .values()
        .filter(|p| p.loan_id == loan_id)
        .all(|p| p.is_paid_off())
    {
        ctx.loans.get_mut(&loan_id).unwrap().status = LoanStatus::PaidOff;
    }

    txn_id
}

/// In-memory repayment engine: forward waterfall over the oldest unpaid
/// installments, creating the transaction and events it would in production
pub struct SimpleRepaymentEngine;

impl DomainPort for SimpleRepaymentEngine {}

impl RepaymentPort for SimpleRepaymentEngine {
    fn process_repayment_transaction(
        &self,
        ctx: &mut ReversalContext,
        payback: PaybackTransaction,
        _note: Option<&str>,
        using_cashback: bool,
    ) -> Result<AccountTransactionId, PortError> {
        let mut remaining = payback.amount;
        let zero = Money::zero(remaining.currency());
        let mut towards_principal = zero;
        let mut towards_interest = zero;
        let mut towards_late_fee = zero;
        let mut applied_events: Vec<(PaymentId, Money, Money)> = Vec::new();

        let mut order: Vec<(NaiveDate, PaymentId)> = ctx
            .payments
            .values()
            .filter(|p| !p.is_paid_off())
            .map(|p| (p.due_date, p.id))
            .collect();
        order.sort();

        for (_, payment_id) in order {
            if remaining.is_zero() {
                break;
            }
            let payment = ctx.payments.get_mut(&payment_id).unwrap();

            let late_fee_due = (payment.late_fee_amount - payment.paid_late_fee).floor_zero();
            let take_late_fee = remaining.min(late_fee_due);
            payment.paid_late_fee = payment.paid_late_fee + take_late_fee;
            remaining = remaining - take_late_fee;

            let interest_due = (payment.installment_interest - payment.paid_interest).floor_zero();
            let take_interest = remaining.min(interest_due);
            payment.paid_interest = payment.paid_interest + take_interest;
            remaining = remaining - take_interest;

            let principal_due =
                (payment.installment_principal - payment.paid_principal).floor_zero();
            let take_principal = remaining.min(principal_due);
            payment.paid_principal = payment.paid_principal + take_principal;
            remaining = remaining - take_principal;

            let applied = take_late_fee + take_interest + take_principal;
            if applied.is_zero() {
                continue;
            }
            towards_late_fee = towards_late_fee + take_late_fee;
            towards_interest = towards_interest + take_interest;
            towards_principal = towards_principal + take_principal;

            payment.paid_amount = payment.paid_amount + applied;
            payment.due_amount = (payment.due_amount - applied).floor_zero();
            payment.paid_date = Some(payback.transaction_date);
            if payment.is_paid_off() {
                payment.status = PaymentStatus::PaidOnTime;
            }
            let due_after = payment.due_amount;
            let ap_id = payment.account_payment_id;
            applied_events.push((payment_id, applied, due_after));

            let ap = ctx.account_payments.get_mut(&ap_id).unwrap();
            ap.paid_late_fee = ap.paid_late_fee + take_late_fee;
            ap.paid_interest = ap.paid_interest + take_interest;
            ap.paid_principal = ap.paid_principal + take_principal;
            ap.paid_amount = ap.paid_amount + applied;
            ap.due_amount = (ap.due_amount - applied).floor_zero();
        }

        let transaction_type = if using_cashback {
            TransactionType::CustomerWallet
        } else {
            TransactionType::Payment
        };
        let event_type = if using_cashback {
            PaymentEventType::CustomerWallet
        } else {
            PaymentEventType::Payment
        };
        let txn = AccountTransaction::new(
            ctx.account.id,
            payback.transaction_date,
            payback.amount - remaining,
            transaction_type,
            towards_principal,
            towards_interest,
            towards_late_fee,
        );
        let txn_id = txn.id;
        for (payment_id, applied, due_after) in applied_events {
            let mut event = PaymentEvent::new(
                payment_id,
                event_type,
                applied,
                due_after,
                payback.transaction_date,
                None,
                Some(payback.payback_service.clone()),
            );
            event.attach_to(txn_id);
            ctx.events.push(event);
        }
        ctx.transactions.insert(txn_id, txn);
        Ok(txn_id)
    }
}
