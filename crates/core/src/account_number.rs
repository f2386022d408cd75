//! Account number value object.

use core::str::FromStr;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A bank account number: fixed-length numeric string, first digit 1–9.
///
/// Uniqueness is a store-level concern; this type only guarantees shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

/// Shape violation when parsing an account number.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid account number: {0}")]
pub struct InvalidAccountNumber(String);

impl AccountNumber {
    /// Number of digits in an account number.
    pub const LEN: usize = 10;

    /// Draw a random candidate: first digit 1–9, remaining digits 0–9.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut digits = String::with_capacity(Self::LEN);
        digits.push(char::from(b'0' + rng.random_range(1..=9u8)));
        for _ in 1..Self::LEN {
            digits.push(char::from(b'0' + rng.random_range(0..=9u8)));
        }
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = InvalidAccountNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::LEN {
            return Err(InvalidAccountNumber(format!(
                "expected {} digits, got {}",
                Self::LEN,
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidAccountNumber("non-digit character".to_string()));
        }
        if s.starts_with('0') {
            return Err(InvalidAccountNumber("leading zero".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}
