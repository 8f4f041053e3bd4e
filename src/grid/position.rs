//! Net position tracking from grid fills

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Side;

/// Net position built up from fills (positive = long, negative = short)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionTracker {
    /// Signed position size
    pub size: Decimal,
    /// Average entry price of the open position
    pub avg_price: Decimal,
    /// PnL realized by closing fills
    pub realized_pnl: Decimal,
    /// Total traded quantity
    pub total_volume: Decimal,
    pub num_fills: u64,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one execution
    pub fn apply_fill(&mut self, side: Side, price: Decimal, quantity: Decimal) {
        if quantity <= Decimal::ZERO {
            return;
        }
        let signed = match side {
            Side::Bid => quantity,
            Side::Ask => -quantity,
        };

        self.num_fills += 1;
        self.total_volume += quantity;

        let same_direction = self.size.is_zero() || self.size.is_sign_positive() == signed.is_sign_positive();
        if same_direction {
            let new_size = self.size + signed;
            self.avg_price = (self.avg_price * self.size.abs() + price * quantity) / new_size.abs();
            self.size = new_size;
            return;
        }

        // Reducing, possibly flipping through zero
        let closed = quantity.min(self.size.abs());
        let direction = if self.size.is_sign_positive() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        self.realized_pnl += (price - self.avg_price) * closed * direction;
        self.size += signed;

        if self.size.is_zero() {
            self.avg_price = Decimal::ZERO;
        } else if self.size.is_sign_positive() != direction.is_sign_positive() {
            self.avg_price = price;
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    /// Side and quantity of a market order that closes the position
    pub fn flatten_order(&self) -> Option<(Side, Decimal)> {
        if self.size > Decimal::ZERO {
            Some((Side::Ask, self.size))
        } else if self.size < Decimal::ZERO {
            Some((Side::Bid, self.size.abs()))
        } else {
            None
        }
    }

    /// Mark-to-market PnL of the open position
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        (mark - self.avg_price) * self.size
    }
}
