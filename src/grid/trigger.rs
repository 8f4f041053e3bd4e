//! Start-price activation and stop-loss liquidation gates

use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::executor::OrderGateway;
use super::ledger::GridOrderLedger;
use super::position::PositionTracker;
use super::types::{DirectionBias, OrderId, Side};

/// Where the ladder stands after a tick has been evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerState {
    /// Start price not reached yet
    Waiting,
    /// Ladder may trade
    Active,
    /// Stop-loss fired; nothing more is placed this run
    Halted,
}

/// Market order sent to flatten the position
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub quantity: Decimal,
}

/// Gates ladder activation and forces liquidation on a stop-loss breach
#[derive(Debug, Clone)]
pub struct TriggerController {
    start_price: Decimal,
    stop_loss_price: Decimal,
    direction_bias: DirectionBias,
    liquidated: bool,
    /// Liquidation orders not yet handed to the caller
    issued: Vec<LiquidationOrder>,
}

impl TriggerController {
    pub fn new(start_price: Decimal, stop_loss_price: Decimal, direction_bias: DirectionBias) -> Self {
        Self {
            start_price,
            stop_loss_price,
            direction_bias,
            liquidated: false,
            issued: Vec::new(),
        }
    }

    /// Drain the liquidation orders issued since the last call
    pub fn take_liquidation_orders(&mut self) -> Vec<LiquidationOrder> {
        std::mem::take(&mut self.issued)
    }

    /// Whether the stop-loss liquidation has been issued
    pub fn has_liquidated(&self) -> bool {
        self.liquidated
    }

    /// Evaluate both gates for one best-bid update
    ///
    /// The stop-loss check runs first. Activation orders go through the
    /// ledger's submission path.
    pub fn evaluate(
        &mut self,
        best_bid: Decimal,
        ledger: &mut GridOrderLedger,
        position: &PositionTracker,
        gateway: &mut dyn OrderGateway,
    ) -> TriggerState {
        if ledger.is_stopped() {
            return TriggerState::Halted;
        }

        if self.stop_loss_price > Decimal::ZERO && best_bid <= self.stop_loss_price {
            self.liquidate(best_bid, ledger, position, gateway);
            return TriggerState::Halted;
        }

        if ledger.is_activated() {
            return TriggerState::Active;
        }

        if self.start_price.is_zero() {
            ledger.activate();
            return TriggerState::Active;
        }

        let reached = match self.direction_bias {
            DirectionBias::Long => best_bid <= self.start_price,
            DirectionBias::Short => best_bid >= self.start_price,
        };
        if !reached {
            return TriggerState::Waiting;
        }

        self.catch_up(best_bid, ledger, gateway);
        ledger.activate();
        TriggerState::Active
    }

    /// Take every level on the far side of the price in one burst
    fn catch_up(&self, best_bid: Decimal, ledger: &mut GridOrderLedger, gateway: &mut dyn OrderGateway) {
        let spec = ledger.spec().clone();
        let (side, levels) = match self.direction_bias {
            DirectionBias::Long => (Side::Bid, spec.levels_above(best_bid)),
            DirectionBias::Short => (Side::Ask, spec.levels_below(best_bid)),
        };

        info!(
            "Start price {} reached at {} ({} bias), {} {} levels at once",
            self.start_price,
            best_bid,
            self.direction_bias,
            side,
            levels.len()
        );
        for level in levels {
            ledger.submit(side, level.price, level.quantity, gateway);
        }
    }

    fn liquidate(
        &mut self,
        best_bid: Decimal,
        ledger: &mut GridOrderLedger,
        position: &PositionTracker,
        gateway: &mut dyn OrderGateway,
    ) {
        warn!(
            "Stop-loss hit: bid {} at or below {}, halting grid",
            best_bid, self.stop_loss_price
        );
        ledger.halt();
        ledger.cancel_all(gateway);

        if self.liquidated {
            return;
        }
        self.liquidated = true;

        match position.flatten_order() {
            Some((side, quantity)) => {
                let ids = gateway.submit_market(side, quantity);
                warn!("Liquidating position: market {} {} -> {:?}", side, quantity, ids);
                self.issued.extend(ids.into_iter().map(|order_id| LiquidationOrder {
                    order_id,
                    side,
                    quantity,
                }));
            }
            None => info!("Position flat, nothing to liquidate"),
        }
    }
}
