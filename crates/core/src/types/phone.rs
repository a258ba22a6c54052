//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not hold exactly ten digits.
    #[error("phone number must contain exactly {expected} digits, found {found}")]
    WrongDigitCount {
        /// Required digit count.
        expected: usize,
        /// Digits actually present.
        found: usize,
    },
}

/// A ten-digit phone number.
///
/// Formatting characters (spaces, dashes, parentheses, a leading `+`) are
/// tolerated on input and stripped; what remains must be exactly ten digits.
/// The original input is kept for display and for sending back to the
/// backend unchanged.
///
/// ```
/// use techhub_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("(555) 123-4567").is_ok());
/// assert!(PhoneNumber::parse("555-1234").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Number of digits a valid phone number carries.
    pub const DIGITS: usize = 10;

    /// Parse a `PhoneNumber`, counting only ASCII digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or does not contain exactly
    /// ten digits once non-digits are removed.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        if s.trim().is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let found = s.chars().filter(char::is_ascii_digit).count();
        if found != Self::DIGITS {
            return Err(PhoneNumberError::WrongDigitCount {
                expected: Self::DIGITS,
                found,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// The number as it was entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only the digits, e.g. `5551234567`.
    #[must_use]
    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
