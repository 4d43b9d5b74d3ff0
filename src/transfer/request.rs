//! Transfer request validation.

use std::str::FromStr;

use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// One transfer submission, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    /// Human decimal amount, e.g. `"1.5"`.
    pub amount: String,
    /// Token symbol.
    pub token: String,
}

/// `0x` followed by exactly 40 hex digits, any case.
pub fn is_valid_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// A finite number strictly above zero.
pub fn is_positive_amount(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .is_ok_and(|n| n.is_finite() && n > 0.0)
}

impl TransferRequest {
    pub fn new(
        recipient: impl Into<String>,
        amount: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
            token: token.into(),
        }
    }

    /// Check recipient, amount and token, in that order. Returns the
    /// parsed recipient.
    pub fn validate(&self) -> Result<Address, RequestError> {
        if !is_valid_address(&self.recipient) {
            return Err(RequestError::Recipient);
        }
        let recipient = Address::from_str(&self.recipient).map_err(|_| RequestError::Recipient)?;

        if !is_positive_amount(&self.amount) {
            return Err(RequestError::Amount);
        }
        if self.token.is_empty() {
            return Err(RequestError::Token);
        }
        Ok(recipient)
    }

    /// Amount in the token's integer unit.
    pub fn amount_units(&self, decimals: u8) -> Result<U256, RequestError> {
        parse_units(self.amount.trim(), decimals)
            .map(|units| units.get_absolute())
            .map_err(|_| RequestError::Amount)
    }
}
