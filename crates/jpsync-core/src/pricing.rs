//! Resale price computation.
//!
//! `target = round_to_unit(source × fx × (1 + commission) + shipping)`,
//! computed in exact decimal arithmetic so `0.21 × 10_000` is exactly `2100`.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the raw price is snapped to the configured unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Always round up to the next multiple of the unit.
    #[default]
    Up,
    /// Round to the nearest multiple, halves away from zero.
    Nearest,
}

impl FromStr for Rounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "ceil" => Ok(Self::Up),
            "nearest" | "round" => Ok(Self::Nearest),
            other => Err(format!("expected `up` or `nearest`, got `{other}`")),
        }
    }
}

/// Validated pricing parameters. Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceParams {
    fx_rate: Decimal,
    commission: Decimal,
    shipping: i64,
    round_unit: i64,
    rounding: Rounding,
}

impl PriceParams {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] when the FX rate is not
    /// positive, the commission or shipping is negative, or the rounding unit
    /// is below 1.
    pub fn new(
        fx_rate: Decimal,
        commission: Decimal,
        shipping: i64,
        round_unit: i64,
        rounding: Rounding,
    ) -> Result<Self, ConfigError> {
        let invalid = |var: &str, reason: &str| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: reason.to_string(),
        };
        if fx_rate <= Decimal::ZERO {
            return Err(invalid("FX_JPY_TO_TWD", "must be greater than zero"));
        }
        if commission < Decimal::ZERO {
            return Err(invalid("COMMISSION_RATE", "must not be negative"));
        }
        if shipping < 0 {
            return Err(invalid("SHIPPING_PER_UNIT_TWD", "must not be negative"));
        }
        if round_unit < 1 {
            return Err(invalid("PRICE_ROUND_UNIT_TWD", "must be at least 1"));
        }
        Ok(Self {
            fx_rate,
            commission,
            shipping,
            round_unit,
            rounding,
        })
    }

    #[must_use]
    pub fn fx_rate(&self) -> Decimal {
        self.fx_rate
    }

    #[must_use]
    pub fn commission(&self) -> Decimal {
        self.commission
    }

    #[must_use]
    pub fn shipping(&self) -> i64 {
        self.shipping
    }

    #[must_use]
    pub fn round_unit(&self) -> i64 {
        self.round_unit
    }

    #[must_use]
    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    /// Unrounded target price.
    #[must_use]
    pub fn raw_target(&self, source_price: i64) -> Decimal {
        Decimal::from(source_price) * self.fx_rate * (Decimal::ONE + self.commission)
            + Decimal::from(self.shipping)
    }

    /// Target price in whole TWD for a source price in yen.
    ///
    /// Non-positive source prices map to zero; the normalizer drops such
    /// variants before they get here.
    #[must_use]
    pub fn target_price(&self, source_price: i64) -> i64 {
        if source_price <= 0 {
            return 0;
        }
        let unit = Decimal::from(self.round_unit);
        let units = self.raw_target(source_price) / unit;
        let snapped = match self.rounding {
            Rounding::Up => units.ceil(),
            Rounding::Nearest => {
                units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
        };
        (snapped * unit).to_i64().unwrap_or(i64::MAX)
    }
}
