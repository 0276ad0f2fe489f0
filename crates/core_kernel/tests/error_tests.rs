//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::ports::PortError;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("negative reversal amount");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "negative reversal amount"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_invalid_state() {
    let error = CoreError::invalid_state("transaction already reversed");

    match error {
        CoreError::InvalidStateTransition(msg) => assert!(msg.contains("already reversed")),
        _ => panic!("Expected InvalidStateTransition error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("IDR".to_string(), "USD".to_string());
    let core_error: CoreError = money_error.into();
    assert!(core_error.to_string().contains("Currency mismatch"));
}

#[test]
fn test_port_error_helpers() {
    let err = PortError::conflict("payback already processed");
    assert!(!err.is_transient());
    assert!(err.to_string().contains("already processed"));

    let conn = PortError::connection("collection store unreachable");
    assert!(conn.is_transient());
}
