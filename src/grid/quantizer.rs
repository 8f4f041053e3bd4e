//! Price and quantity rounding to exchange increments
//!
//! All rounding here is exact decimal arithmetic. Prices snap down to the
//! instrument tick and quantities truncate toward zero, so a rounded value never
//! exceeds the raw one.

use rust_decimal::{Decimal, RoundingStrategy};

use super::errors::{GridError, GridResult};

/// Floor `price` to a multiple of `tick_size`
pub fn quantize(price: Decimal, tick_size: Decimal) -> GridResult<Decimal> {
    check_tick(tick_size)?;
    Ok((price / tick_size).floor() * tick_size)
}

/// Round `price` up to a multiple of `tick_size`
pub fn ceil_to_tick(price: Decimal, tick_size: Decimal) -> GridResult<Decimal> {
    check_tick(tick_size)?;
    Ok((price / tick_size).ceil() * tick_size)
}

/// Truncate a quantity to `decimals` places, never rounding up
pub fn truncate_quantity(quantity: Decimal, decimals: u32) -> Decimal {
    quantity.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}

fn check_tick(tick_size: Decimal) -> GridResult<()> {
    if tick_size <= Decimal::ZERO {
        return Err(GridError::InvalidConfig(format!(
            "tick size must be positive, got {}",
            tick_size
        )));
    }
    Ok(())
}

/// Tick-bound quantizer for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuantizer {
    tick_size: Decimal,
}

impl PriceQuantizer {
    pub fn new(tick_size: Decimal) -> GridResult<Self> {
        check_tick(tick_size)?;
        Ok(Self { tick_size })
    }

    pub fn tick_size(&self) -> Decimal {
        self.tick_size
    }

    pub fn quantize(&self, price: Decimal) -> Decimal {
        (price / self.tick_size).floor() * self.tick_size
    }

    pub fn ceil(&self, price: Decimal) -> Decimal {
        (price / self.tick_size).ceil() * self.tick_size
    }

    /// Whether `price` already sits on the tick grid
    pub fn is_aligned(&self, price: Decimal) -> bool {
        (price % self.tick_size).is_zero()
    }
}
