//! # Validation Module
//!
//! Input validation utilities for QR Desk.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard (TypeScript)                                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: qrdesk-service                                               │
//! │  └── THIS MODULE: field rules before anything is stored                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: qrdesk-store                                                 │
//! │  └── Uniqueness (QR value, branch code, username)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::{MAX_REASON_LENGTH, MAX_SCORE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field and its maximum length.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a reason or note that a workflow step requires.
pub fn validate_reason(field: &str, value: &str) -> ValidationResult<()> {
    validate_text(field, value, MAX_REASON_LENGTH)
}

/// Validates a branch code such as `KTM-001`.
///
/// ## Rules
/// - 2 to 20 characters
/// - Uppercase letters, digits and hyphens only
///
/// ## Example
/// ```rust
/// use qrdesk_core::validation::validate_branch_code;
///
/// assert!(validate_branch_code("KTM-001").is_ok());
/// assert!(validate_branch_code("ktm 1").is_err());
/// ```
pub fn validate_branch_code(code: &str) -> ValidationResult<()> {
    validate_text("code", code, 20)?;
    let code = code.trim();

    if code.len() < 2 {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must be at least 2 characters".to_string(),
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only uppercase letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address (shape only, no deliverability).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_text("email", email, 254)?;
    let email = email.trim();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number: digits, optional leading `+`, 7 to 15 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_text("phone", phone, 16)?;
    let digits = phone.trim().strip_prefix('+').unwrap_or(phone.trim());

    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be 7-15 digits with an optional leading +".to_string(),
        });
    }

    Ok(())
}

/// Validates a QR payload value supplied by an upload.
///
/// ## Rules
/// - 1 to 128 characters
/// - Printable ASCII, no whitespace
pub fn validate_qr_value(value: &str) -> ValidationResult<()> {
    validate_text("qr_value", value, 128)?;

    if !value.trim().chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat {
            field: "qr_value".to_string(),
            reason: "must be printable ASCII without spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a whole upload batch: every value valid, no value twice.
pub fn validate_qr_batch(values: &[String]) -> ValidationResult<()> {
    if values.is_empty() {
        return Err(ValidationError::Required {
            field: "qr_values".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        validate_qr_value(value)?;
        if !seen.insert(value.trim()) {
            return Err(ValidationError::Duplicate {
                field: "qr_value".to_string(),
                value: value.trim().to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested or generated quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `max`
pub fn validate_quantity(quantity: u32, max: u32) -> ValidationResult<()> {
    if quantity == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::from(max),
        });
    }

    Ok(())
}

/// Validates an audit score (0-100).
pub fn validate_score(score: u8) -> ValidationResult<()> {
    if score > MAX_SCORE {
        return Err(ValidationError::OutOfRange {
            field: "score".to_string(),
            min: 0,
            max: i64::from(MAX_SCORE),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert!(validate_text("name", "Kathmandu Main", 50).is_ok());
        assert!(validate_text("name", "   ", 50).is_err());
        assert!(validate_text("name", &"A".repeat(51), 50).is_err());
    }

    #[test]
    fn test_validate_branch_code() {
        assert!(validate_branch_code("KTM-001").is_ok());
        assert!(validate_branch_code("PKR2").is_ok());
        assert!(validate_branch_code("K").is_err());
        assert!(validate_branch_code("ktm-001").is_err());
        assert!(validate_branch_code("KTM 001").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@bank.com.np").is_ok());
        assert!(validate_email("ops@bank").is_err());
        assert!(validate_email("@bank.com").is_err());
        assert!(validate_email("ops bank@x.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9801234567").is_ok());
        assert!(validate_phone("+9779801234567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98-0123-4567").is_err());
    }

    #[test]
    fn test_validate_qr_batch() {
        let ok = vec!["A-1".to_string(), "A-2".to_string()];
        assert!(validate_qr_batch(&ok).is_ok());

        let dup = vec!["A-1".to_string(), " A-1 ".to_string()];
        assert!(matches!(
            validate_qr_batch(&dup),
            Err(ValidationError::Duplicate { .. })
        ));

        let spaced = vec!["A 1".to_string()];
        assert!(validate_qr_batch(&spaced).is_err());
        assert!(validate_qr_batch(&[]).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1, 100).is_ok());
        assert!(validate_quantity(100, 100).is_ok());
        assert!(validate_quantity(0, 100).is_err());
        assert!(validate_quantity(101, 100).is_err());
    }

    #[test]
    fn test_validate_score() {
        assert!(validate_score(0).is_ok());
        assert!(validate_score(100).is_ok());
        assert!(validate_score(101).is_err());
    }
}
