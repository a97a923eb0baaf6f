//! Payment details format checks.
//!
//! Per-method shape validation only; whether the destination actually
//! exists or belongs to the user is out of scope. Unknown method labels are
//! passed through with just the non-empty check, since the method is an
//! opaque label to the ledger.

use rewardbot_core::LedgerError;

fn invalid(method: &str, reason: &str) -> LedgerError {
    LedgerError::InvalidDetails {
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate free-text payment details against the method's expected shape.
pub fn validate_details(method: &str, details: &str) -> Result<(), LedgerError> {
    let trimmed = details.trim();
    if trimmed.is_empty() {
        return Err(invalid(method, "details must not be empty"));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    match method {
        "card" => {
            if !(16..=19).contains(&digits.len()) {
                return Err(invalid(method, "card number must be 16-19 digits"));
            }
        }
        "qiwi" => {
            if digits.len() != 11 || !(digits.starts_with('7') || digits.starts_with('8')) {
                return Err(invalid(
                    method,
                    "phone number must be 11 digits starting with 7 or 8",
                ));
            }
        }
        "ymoney" => {
            if digits.len() != 15 || !digits.starts_with("4100") {
                return Err(invalid(
                    method,
                    "wallet number must be 15 digits starting with 4100",
                ));
            }
        }
        _ => {}
    }

    Ok(())
}
