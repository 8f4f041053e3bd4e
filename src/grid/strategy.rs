//! Grid strategy - composes allocation, ladder, triggers and position
//!
//! `GridStrategy` is the synchronous core driven by the runner: one tick,
//! order update or timer tick is handled to completion per call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use super::allocator::{GridAllocator, GridSpec};
use super::config::GridConfig;
use super::errors::GridResult;
use super::executor::OrderGateway;
use super::ledger::{GridOrderLedger, TerminalOutcome};
use super::position::PositionTracker;
use super::trigger::{LiquidationOrder, TriggerController, TriggerState};
use super::types::{OrderId, OrderStatus, OrderUpdate, Side, Tick};

/// Timer ticks between two pruning passes
pub const DEFAULT_PRUNE_EVERY_TICKS: u32 = 10;

/// Reporting snapshot of a running grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub symbol: String,
    pub state: TriggerState,
    pub grid_count: u32,
    pub step: Decimal,
    pub lower: Decimal,
    pub upper: Decimal,
    pub allocated_notional: Decimal,
    pub resting_bids: usize,
    pub resting_asks: usize,
    pub fill_count: u64,
    pub position: Decimal,
    pub avg_price: Decimal,
    pub realized_pnl: Decimal,
    /// Open position marked at the last price; zero before any price
    pub unrealized_pnl: Decimal,
    pub last_price: Option<Decimal>,
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}: {} levels [{}, {}] step {}, bids={}, asks={}, fills={}, pos={} @ {}, realized={}, unrealized={}",
            self.symbol,
            self.state,
            self.grid_count,
            self.lower,
            self.upper,
            self.step,
            self.resting_bids,
            self.resting_asks,
            self.fill_count,
            self.position,
            self.avg_price,
            self.realized_pnl,
            self.unrealized_pnl
        )
    }
}

/// Grid strategy over one instrument
pub struct GridStrategy<G: OrderGateway> {
    config: GridConfig,
    gateway: G,
    allocator: GridAllocator,
    ledger: GridOrderLedger,
    trigger: TriggerController,
    position: PositionTracker,
    /// Executed quantity already applied to the position, per open order
    executed: HashMap<OrderId, Decimal>,
    /// Stop-loss market orders awaiting their final status
    liquidations: HashMap<OrderId, LiquidationOrder>,
    state: TriggerState,
    prune_every_ticks: u32,
    timer_ticks: u32,
    last_price: Option<Decimal>,
}

impl<G: OrderGateway> GridStrategy<G> {
    /// Validate `config`, allocate the grid and snapshot resting exchange orders
    ///
    /// Fails before any order is placed when the configuration or the
    /// allocation is unusable.
    pub fn start(config: GridConfig, gateway: G) -> GridResult<Self> {
        config.validate()?;
        let instrument = gateway.instrument().clone();
        let allocator = GridAllocator::new(&instrument)?;
        let spec = allocator.allocate(&config.allocation_params())?;

        let external_prices = gateway.active_order_prices();
        if !external_prices.is_empty() {
            info!(
                "{} orders already active on {}, their prices will be skipped",
                external_prices.len(),
                instrument.symbol
            );
        }

        let ledger = GridOrderLedger::new(
            spec,
            instrument.price_tick,
            config.max_open_orders,
            external_prices,
        )?;
        let trigger = TriggerController::new(config.start_price, config.stop_loss_price, config.direction_bias);

        info!(
            "Grid strategy started on {}: start_price={}, stop_loss={}, max_open_orders={}",
            instrument.symbol, config.start_price, config.stop_loss_price, config.max_open_orders
        );

        Ok(Self {
            config,
            gateway,
            allocator,
            ledger,
            trigger,
            position: PositionTracker::new(),
            executed: HashMap::new(),
            liquidations: HashMap::new(),
            state: TriggerState::Waiting,
            prune_every_ticks: DEFAULT_PRUNE_EVERY_TICKS,
            timer_ticks: 0,
            last_price: None,
        })
    }

    /// Builder: set timer ticks between pruning passes
    pub fn with_prune_every(mut self, ticks: u32) -> Self {
        self.prune_every_ticks = ticks.max(1);
        self
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn spec(&self) -> &Arc<GridSpec> {
        self.ledger.spec()
    }

    pub fn ledger(&self) -> &GridOrderLedger {
        &self.ledger
    }

    pub fn position(&self) -> &PositionTracker {
        &self.position
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == TriggerState::Halted
    }

    /// Halted with every resting order and liquidation closed out
    pub fn is_finished(&self) -> bool {
        self.is_halted()
            && self.ledger.resting_count(Side::Bid) == 0
            && self.ledger.resting_count(Side::Ask) == 0
            && self.liquidations.is_empty()
    }

    /// Handle a market data update
    pub fn on_tick(&mut self, tick: &Tick) -> TriggerState {
        if !tick.is_usable() {
            debug!("Ignoring tick without a usable bid: {:?}", tick);
            return self.state;
        }
        let price = tick.best_bid;
        self.last_price = Some(price);

        self.state = self
            .trigger
            .evaluate(price, &mut self.ledger, &self.position, &mut self.gateway);
        for order in self.trigger.take_liquidation_orders() {
            self.liquidations.insert(order.order_id.clone(), order);
        }

        if self.state == TriggerState::Active {
            self.ledger.on_market_update(price, &mut self.gateway);
        }
        self.state
    }

    /// Handle an order status update
    ///
    /// Executed quantity reaches the position whatever status carries it,
    /// so partial executions of later cancelled orders are not lost.
    pub fn on_order(&mut self, update: &OrderUpdate) -> Option<TerminalOutcome> {
        if self.liquidations.contains_key(&update.order_id) {
            self.on_liquidation_update(update);
            return None;
        }

        if !update.status.is_terminal() {
            if let Some((side, order)) = self.ledger.tracked_order(&update.order_id) {
                self.record_execution(&update.order_id, side, order.price, update.filled_quantity);
            }
            return None;
        }

        let outcome = self.ledger.on_order_terminal(update, &mut self.gateway)?;
        self.record_execution(&outcome.order_id, outcome.side, outcome.price, outcome.filled_quantity);
        self.executed.remove(&outcome.order_id);
        Some(outcome)
    }

    fn on_liquidation_update(&mut self, update: &OrderUpdate) {
        let Some(order) = self.liquidations.get(&update.order_id).cloned() else {
            return;
        };
        let price = if update.price > Decimal::ZERO {
            update.price
        } else {
            self.last_price.unwrap_or_default()
        };
        let cumulative = if update.status == OrderStatus::Filled && update.filled_quantity.is_zero() {
            order.quantity
        } else {
            update.filled_quantity
        };
        self.record_execution(&order.order_id, order.side, price, cumulative);

        if update.status.is_terminal() {
            info!("Liquidation order {} ended: {:?}", order.order_id, update.status);
            self.liquidations.remove(&order.order_id);
            self.executed.remove(&order.order_id);
        }
    }

    /// Apply the part of `cumulative` not yet seen for `order_id`
    fn record_execution(&mut self, order_id: &OrderId, side: Side, price: Decimal, cumulative: Decimal) {
        let applied = self.executed.entry(order_id.clone()).or_default();
        let delta = cumulative - *applied;
        if delta <= Decimal::ZERO {
            return;
        }
        *applied = cumulative;

        self.position.apply_fill(side, price, delta);
        info!(
            "Position after {} {} @ {}: size={}, avg_price={}, realized={}",
            side, delta, price, self.position.size, self.position.avg_price, self.position.realized_pnl
        );
    }

    /// Handle a periodic timer tick; prunes both ladders every few ticks
    pub fn on_timer(&mut self) -> Vec<OrderId> {
        if self.is_halted() {
            return Vec::new();
        }

        self.timer_ticks += 1;
        if self.timer_ticks < self.prune_every_ticks {
            return Vec::new();
        }
        self.timer_ticks = 0;

        [Side::Bid, Side::Ask]
            .into_iter()
            .filter_map(|side| self.ledger.prune_excess(side, &mut self.gateway))
            .collect()
    }

    /// Recompute the grid from `config` and swap it in
    ///
    /// Resting orders and the position carry over. On error the current grid
    /// stays in place.
    pub fn reallocate(&mut self, config: GridConfig) -> GridResult<Arc<GridSpec>> {
        config.validate()?;
        let spec = self.allocator.allocate(&config.allocation_params())?;

        self.ledger.replace_spec(Arc::clone(&spec));
        self.ledger.set_max_open_orders(config.max_open_orders);
        self.trigger = TriggerController::new(config.start_price, config.stop_loss_price, config.direction_bias);
        self.config = config;
        Ok(spec)
    }

    pub fn summary(&self) -> GridSummary {
        let spec = self.ledger.spec();
        GridSummary {
            symbol: self.gateway.instrument().symbol.clone(),
            state: self.state,
            grid_count: spec.grid_count,
            step: spec.step,
            lower: spec.lower,
            upper: spec.upper,
            allocated_notional: spec.allocated_notional(),
            resting_bids: self.ledger.resting_count(Side::Bid),
            resting_asks: self.ledger.resting_count(Side::Ask),
            fill_count: self.ledger.fill_count(),
            position: self.position.size,
            avg_price: self.position.avg_price,
            realized_pnl: self.position.realized_pnl,
            unrealized_pnl: self
                .last_price
                .map(|mark| self.position.unrealized_pnl(mark))
                .unwrap_or_default(),
            last_price: self.last_price,
        }
    }

    /// Cancel every resting ladder order
    pub fn shutdown(&mut self) -> usize {
        info!("Shutting down grid strategy");
        self.ledger.cancel_all(&mut self.gateway)
    }
}
