//! Proptest strategies for servicing data

use proptest::prelude::*;

use core_kernel::Money;
use domain_servicing::Payment;

use crate::builders::PaymentBuilder;
use crate::fixtures::TemporalFixtures;

/// A component split: (late_fee, interest, principal) in whole rupiah
pub fn component_split() -> impl Strategy<Value = (i64, i64, i64)> {
    (0i64..100_000, 0i64..200_000, 1i64..2_000_000)
}

/// A fully paid payment with an arbitrary component split
pub fn paid_payment() -> impl Strategy<Value = Payment> {
    component_split().prop_map(|(late_fee, interest, principal)| {
        let mut payment = PaymentBuilder::new()
            .with_installments(Money::idr(principal), Money::idr(interest))
            .with_late_fee(Money::idr(late_fee))
            .paid_on(TemporalFixtures::first_due_date())
            .build();
        payment.due_amount = Money::idr(0);
        payment
    })
}

/// A reversal amount, possibly exceeding any single payment's balance
pub fn reversal_amount() -> impl Strategy<Value = Money> {
    (1i64..3_000_000).prop_map(Money::idr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::assert_component_invariant;

    proptest! {
        #[test]
        fn generated_paid_payments_are_consistent(payment in paid_payment()) {
            assert_component_invariant(&payment);
            prop_assert!(payment.is_paid_off());
        }
    }
}
