//! Core data types for grid trading

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::{GridError, GridResult};

/// Ladder side: bids are resting buys, asks are resting sells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "BUY",
            Side::Ask => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of the range receives the larger per-level notional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionBias {
    /// Lower half gets the larger notional, activation buys
    #[default]
    Long,
    /// Upper half gets the larger notional, activation sells
    Short,
}

impl fmt::Display for DirectionBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionBias::Long => f.write_str("Long"),
            DirectionBias::Short => f.write_str("Short"),
        }
    }
}

/// Opaque order identifier handed out by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for OrderId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Order status reported by the order-status feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Resting on the book
    Active,
    /// Resting with some quantity executed
    PartiallyFilled,
    /// Fully executed
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Check if the order can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Active | OrderStatus::PartiallyFilled)
    }
}

/// Status update for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub side: Side,
    /// Limit price of the order
    pub price: Decimal,
    pub status: OrderStatus,
    /// Cumulative executed quantity
    #[serde(default)]
    pub filled_quantity: Decimal,
}

impl OrderUpdate {
    pub fn new(order_id: impl Into<OrderId>, side: Side, price: Decimal, status: OrderStatus) -> Self {
        Self {
            order_id: order_id.into(),
            side,
            price,
            status,
            filled_quantity: Decimal::ZERO,
        }
    }

    /// Builder: set the cumulative filled quantity
    pub fn with_filled_quantity(mut self, quantity: Decimal) -> Self {
        self.filled_quantity = quantity;
        self
    }
}

/// Top-of-book market data update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub best_bid: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_ask: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    pub fn new(best_bid: Decimal) -> Self {
        Self {
            best_bid,
            best_ask: None,
            timestamp: Utc::now(),
        }
    }

    /// Ticks without a positive bid carry no usable price
    pub fn is_usable(&self) -> bool {
        self.best_bid > Decimal::ZERO
    }
}

/// Exchange constraints for the traded instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Minimum price increment
    pub price_tick: Decimal,
    /// Minimum order quantity; its decimal places set the quantity increment
    pub min_volume: Decimal,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, price_tick: Decimal, min_volume: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price_tick,
            min_volume,
        }
    }

    pub fn validate(&self) -> GridResult<()> {
        if self.price_tick <= Decimal::ZERO {
            return Err(GridError::InvalidConfig(format!(
                "price_tick must be positive, got {}",
                self.price_tick
            )));
        }
        if self.min_volume <= Decimal::ZERO {
            return Err(GridError::InvalidConfig(format!(
                "min_volume must be positive, got {}",
                self.min_volume
            )));
        }
        Ok(())
    }

    /// Decimal places implied by `min_volume` (0.001 -> 3)
    pub fn volume_decimals(&self) -> u32 {
        self.min_volume.normalize().scale()
    }
}

/// One (price, quantity) pair of a grid allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }

    /// Quote notional of this level
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
