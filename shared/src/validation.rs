//! Validation utilities for the Inventory Management service
//!
//! Field validators plug into `validator` derives via `#[validate(custom = "...")]`.
//! Brazilian formats (CNPJ) follow the layout printed on registration documents.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

// ============================================================================
// Numeric Validations
// ============================================================================

pub fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("non_negative", "Value must not be negative"));
    }
    Ok(())
}

pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(invalid("positive", "Value must be greater than zero"));
    }
    Ok(())
}

// ============================================================================
// Brazil-Specific Validations
// ============================================================================

/// Validate CNPJ layout `NN.NNN.NNN/NNNN-NN`
pub fn validate_cnpj(cnpj: &str) -> Result<(), ValidationError> {
    if is_cnpj_format(cnpj) {
        Ok(())
    } else {
        Err(invalid("cnpj", "Invalid CNPJ format, expected NN.NNN.NNN/NNNN-NN"))
    }
}

fn is_cnpj_format(cnpj: &str) -> bool {
    const LAYOUT: &[u8] = b"dd.ddd.ddd/dddd-dd";

    let bytes = cnpj.as_bytes();
    bytes.len() == LAYOUT.len()
        && bytes.iter().zip(LAYOUT).all(|(&c, &slot)| match slot {
            b'd' => c.is_ascii_digit(),
            sep => c == sep,
        })
}

/// Validate phone number: optional `+`, optional leading `1`, then 9-15 digits
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let all_digits = !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit());

    // A 16th digit is only accepted when it is the optional leading 1
    let valid_len = match digits.len() {
        9..=15 => true,
        16 => digits.starts_with('1'),
        _ => false,
    };

    if all_digits && valid_len {
        Ok(())
    } else {
        Err(invalid("phone", "Invalid phone number format"))
    }
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(invalid("password", "Password must be at least 8 characters"));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("password", "Password must not be entirely numeric"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cnpj() {
        assert!(validate_cnpj("12.345.678/0001-95").is_ok());
        assert!(validate_cnpj("00.000.000/0000-00").is_ok());
    }

    #[test]
    fn test_invalid_cnpj() {
        assert!(validate_cnpj("12345678000195").is_err()); // No punctuation
        assert!(validate_cnpj("12.345.678-0001/95").is_err()); // Swapped separators
        assert!(validate_cnpj("12.345.678/0001-9").is_err()); // Too short
        assert!(validate_cnpj("AB.345.678/0001-95").is_err());
    }

    #[test]
    fn test_valid_phones() {
        assert!(validate_phone("11987654321").is_ok());
        assert!(validate_phone("+5511987654321").is_ok());
        assert!(validate_phone("987654321").is_ok());
        assert!(validate_phone("1123456789012345").is_ok()); // Leading 1 + 15 digits
    }

    #[test]
    fn test_invalid_phones() {
        assert!(validate_phone("12345678").is_err()); // Too short
        assert!(validate_phone("(11) 98765-4321").is_err()); // Punctuation
        assert!(validate_phone("+").is_err());
        assert!(validate_phone("9123456789012345").is_err()); // 16 digits without leading 1
    }

    #[test]
    fn test_decimal_bounds() {
        assert!(non_negative_decimal(&Decimal::ZERO).is_ok());
        assert!(non_negative_decimal(&Decimal::new(-1, 2)).is_err());
        assert!(positive_decimal(&Decimal::new(1, 2)).is_ok());
        assert!(positive_decimal(&Decimal::ZERO).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("estoque2024").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_err());
    }
}
