//! Client-side form checks shared by the account and profile services.

use techhub_core::{Email, PhoneNumber};

use crate::error::ValidationError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Every field must be non-empty.
pub fn require_filled(fields: &[&str]) -> Result<(), ValidationError> {
    if fields.iter().any(|f| f.is_empty()) {
        Err(ValidationError::MissingFields)
    } else {
        Ok(())
    }
}

pub fn email(raw: &str) -> Result<Email, ValidationError> {
    Email::parse(raw).map_err(|_| ValidationError::InvalidEmail)
}

/// Ten digits once formatting characters are stripped.
pub fn phone(raw: &str) -> Result<PhoneNumber, ValidationError> {
    PhoneNumber::parse(raw).map_err(|_| ValidationError::InvalidPhone)
}

/// At least [`MIN_PASSWORD_LENGTH`] characters, reporting `too_short` if not.
pub fn password(raw: &str, too_short: ValidationError) -> Result<(), ValidationError> {
    if raw.chars().count() < MIN_PASSWORD_LENGTH {
        Err(too_short)
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_filled() {
        assert!(require_filled(&["a", "b"]).is_ok());
        assert_eq!(
            require_filled(&["a", ""]),
            Err(ValidationError::MissingFields)
        );
    }

    #[test]
    fn test_email_and_phone() {
        assert!(email("jane@acme.com").is_ok());
        assert_eq!(email("jane@acme").unwrap_err(), ValidationError::InvalidEmail);
        assert_eq!(phone("(555) 123-4567").unwrap().digits(), "5551234567");
        assert_eq!(phone("555-1234").unwrap_err(), ValidationError::InvalidPhone);
    }

    #[test]
    fn test_password_length_counts_characters() {
        assert!(password("123456", ValidationError::PasswordTooShort).is_ok());
        assert!(password("pässw", ValidationError::PasswordTooShort).is_err());
        assert_eq!(
            password("12345", ValidationError::NewPasswordTooShort),
            Err(ValidationError::NewPasswordTooShort)
        );
    }
}
