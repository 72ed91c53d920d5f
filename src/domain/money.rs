use crate::config::{MAX_RECHARGE_AMOUNT, MIN_RECHARGE_AMOUNT};
use crate::error::WalletError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Number of minor units in one whole currency unit, as used by the gateway.
pub const MINOR_UNITS_PER_UNIT: Decimal = dec!(100);

/// A wallet balance in whole currency units.
///
/// Transparent over `rust_decimal::Decimal` so it maps directly onto the
/// `balance` number returned by the wallet API.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// An amount as transmitted by the payment gateway (hundredths of a unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub u64);

impl MinorUnits {
    /// Converts to whole currency units.
    pub fn to_units(self) -> Decimal {
        Decimal::from(self.0) / MINOR_UNITS_PER_UNIT
    }
}

/// A recharge amount that passed input validation.
///
/// Only whole currency units inside
/// [`MIN_RECHARGE_AMOUNT`]..=[`MAX_RECHARGE_AMOUNT`] are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RechargeAmount(u64);

impl RechargeAmount {
    pub fn new(value: u64) -> Result<Self, WalletError> {
        if value == 0 {
            return Err(WalletError::ValidationError(
                "Recharge amount must be positive".to_string(),
            ));
        }
        if value < MIN_RECHARGE_AMOUNT {
            return Err(WalletError::ValidationError(format!(
                "Minimum recharge amount is {MIN_RECHARGE_AMOUNT}"
            )));
        }
        if value > MAX_RECHARGE_AMOUNT {
            return Err(WalletError::ValidationError(format!(
                "Maximum recharge amount is {MAX_RECHARGE_AMOUNT}"
            )));
        }
        Ok(Self(value))
    }

    /// Parses user input such as `"50000"`, `"50.000"` or `"1,000,000"`.
    ///
    /// Group separators are accepted only between groups of exactly three digits,
    /// so `"10000.5"` is rejected rather than read as `100005`.
    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(WalletError::ValidationError(
                "Recharge amount is required".to_string(),
            ));
        }

        let groups: Vec<&str> = trimmed.split(['.', ',', ' ']).collect();
        let well_formed = groups
            .iter()
            .all(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()))
            && (groups.len() == 1
                || (groups[0].len() <= 3 && groups[1..].iter().all(|g| g.len() == 3)));

        if !well_formed {
            return Err(WalletError::ValidationError(format!(
                "Recharge amount must be a whole number, got '{trimmed}'"
            )));
        }

        let digits: String = groups.concat();
        let value: u64 = digits.parse().map_err(|_| {
            WalletError::ValidationError(format!(
                "Maximum recharge amount is {MAX_RECHARGE_AMOUNT}"
            ))
        })?;

        Self::new(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}
