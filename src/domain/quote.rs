use crate::config::DEFAULT_BASE_RATE;
use crate::error::{Result, WalletError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a vehicle type (e.g. `"bike"`, `"car4"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleTypeKey(pub String);

impl VehicleTypeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference data describing a selectable vehicle type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleType {
    pub key: VehicleTypeKey,
    /// Price per kilometre in whole currency units.
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capacity: u8,
}

impl VehicleType {
    pub fn new(key: impl Into<String>, base_rate: Option<Decimal>) -> Self {
        Self {
            key: VehicleTypeKey::new(key),
            base_rate,
            name: String::new(),
            description: String::new(),
            capacity: 0,
        }
    }
}

/// An estimated price for a route, tied to the vehicle type it was computed for.
///
/// Quotes are values: re-estimation produces a new quote rather than editing
/// this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub estimated_price: Decimal,
    #[serde(default)]
    pub estimated_distance: Option<f64>,
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    pub vehicle_type_key: VehicleTypeKey,
}

/// Recomputes a quote when the rider switches vehicle type.
///
/// The new price is `round(price * new_rate / old_rate)`, rounded to whole
/// currency units with ties going away from zero. Missing rates (and a
/// non-positive rate on the current quote) fall back to `default_base_rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceReestimator {
    default_base_rate: Decimal,
}

impl Default for PriceReestimator {
    fn default() -> Self {
        Self {
            default_base_rate: DEFAULT_BASE_RATE,
        }
    }
}

impl PriceReestimator {
    pub fn new(default_base_rate: Decimal) -> Result<Self> {
        if default_base_rate <= Decimal::ZERO {
            return Err(WalletError::InvalidRate(format!(
                "default base rate must be positive, got {default_base_rate}"
            )));
        }
        Ok(Self { default_base_rate })
    }

    pub fn default_base_rate(&self) -> Decimal {
        self.default_base_rate
    }

    pub fn reestimate(&self, current: &PriceQuote, vehicle: &VehicleType) -> Result<PriceQuote> {
        let old_rate = current
            .base_rate
            .filter(|rate| *rate > Decimal::ZERO)
            .unwrap_or(self.default_base_rate);

        let new_rate = match vehicle.base_rate {
            Some(rate) if rate <= Decimal::ZERO => {
                return Err(WalletError::InvalidRate(format!(
                    "vehicle type '{}' has non-positive base rate {rate}",
                    vehicle.key
                )));
            }
            Some(rate) => rate,
            None => self.default_base_rate,
        };

        let estimated_price = current
            .estimated_price
            .checked_mul(new_rate)
            .and_then(|scaled| scaled.checked_div(old_rate))
            .ok_or_else(|| {
                WalletError::InvalidRate(format!(
                    "price {} cannot be rescaled from rate {old_rate} to {new_rate}",
                    current.estimated_price
                ))
            })?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        Ok(PriceQuote {
            estimated_price,
            estimated_distance: current.estimated_distance,
            base_rate: Some(new_rate),
            vehicle_type_key: vehicle.key.clone(),
        })
    }
}

/// The rider's current vehicle choice and, once a route is priced, its quote.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleSelection {
    selected: Option<VehicleTypeKey>,
    quote: Option<PriceQuote>,
}

impl VehicleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&VehicleTypeKey> {
        self.selected.as_ref()
    }

    pub fn quote(&self) -> Option<&PriceQuote> {
        self.quote.as_ref()
    }

    /// Installs a quote produced by route pricing.
    pub fn set_quote(&mut self, quote: PriceQuote) {
        self.selected = Some(quote.vehicle_type_key.clone());
        self.quote = Some(quote);
    }

    pub fn clear_quote(&mut self) {
        self.quote = None;
    }

    /// Selects `vehicle`; an active quote is replaced by its re-estimate.
    ///
    /// The selection changes even if no quote exists yet. On a rate error the
    /// previous quote is kept intact.
    pub fn select(&mut self, vehicle: &VehicleType, reestimator: &PriceReestimator) -> Result<()> {
        self.selected = Some(vehicle.key.clone());

        if let Some(current) = &self.quote {
            let next = reestimator.reestimate(current, vehicle)?;
            self.quote = Some(next);
        }

        Ok(())
    }
}
