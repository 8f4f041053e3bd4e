//! Resting-order ledger and replenishment rules
//!
//! The ledger owns the two ladders (resting bids and asks keyed by order id)
//! and decides what to place when a resting order fills. All submissions go
//! through the `OrderGateway`; every id it returns is tracked as resting
//! until a terminal status for it arrives.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::allocator::GridSpec;
use super::errors::GridResult;
use super::executor::OrderGateway;
use super::quantizer::PriceQuantizer;
use super::types::{OrderId, OrderStatus, OrderUpdate, Side};

/// An order the ledger placed and has not seen finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingOrder {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// What a terminal update did to a tracked order
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalOutcome {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub status: OrderStatus,
    /// Cumulative executed quantity, including partial executions of
    /// orders that ended cancelled, rejected or expired
    pub filled_quantity: Decimal,
}

impl TerminalOutcome {
    pub fn is_fill(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

/// Ladder state for one run of the grid
#[derive(Debug)]
pub struct GridOrderLedger {
    spec: Arc<GridSpec>,
    quantizer: PriceQuantizer,
    max_open_orders: usize,
    bids: HashMap<OrderId, RestingOrder>,
    asks: HashMap<OrderId, RestingOrder>,
    /// Orders with a cancel in flight
    pending_cancels: HashSet<OrderId>,
    /// Prices already resting on the exchange when the run began
    external_prices: HashSet<Decimal>,
    activated: bool,
    stopped: bool,
    fill_count: u64,
}

impl GridOrderLedger {
    pub fn new(
        spec: Arc<GridSpec>,
        price_tick: Decimal,
        max_open_orders: usize,
        external_prices: Vec<Decimal>,
    ) -> GridResult<Self> {
        Ok(Self {
            spec,
            quantizer: PriceQuantizer::new(price_tick)?,
            max_open_orders,
            bids: HashMap::new(),
            asks: HashMap::new(),
            pending_cancels: HashSet::new(),
            external_prices: external_prices.into_iter().collect(),
            activated: false,
            stopped: false,
            fill_count: 0,
        })
    }

    pub fn spec(&self) -> &Arc<GridSpec> {
        &self.spec
    }

    /// Swap in a freshly allocated grid; resting orders are left untouched
    pub fn replace_spec(&mut self, spec: Arc<GridSpec>) {
        info!(
            "Replacing grid: {} levels step {} -> {} levels step {}",
            self.spec.grid_count, self.spec.step, spec.grid_count, spec.step
        );
        self.spec = spec;
    }

    pub fn max_open_orders(&self) -> usize {
        self.max_open_orders
    }

    pub fn set_max_open_orders(&mut self, max: usize) {
        self.max_open_orders = max;
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn fill_count(&self) -> u64 {
        self.fill_count
    }

    /// Mark the ladder active; one-shot
    pub fn activate(&mut self) {
        if !self.activated {
            info!("Grid ladder activated");
            self.activated = true;
        }
    }

    /// Stop all replenishment for the rest of the run
    pub fn halt(&mut self) {
        if !self.stopped {
            warn!("Grid ladder halted");
            self.stopped = true;
        }
    }

    fn ladder(&self, side: Side) -> &HashMap<OrderId, RestingOrder> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn ladder_mut(&mut self, side: Side) -> &mut HashMap<OrderId, RestingOrder> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Number of resting orders on `side`
    pub fn resting_count(&self, side: Side) -> usize {
        self.ladder(side).len()
    }

    /// Resting orders on `side` without a cancel in flight
    pub fn live_count(&self, side: Side) -> usize {
        self.ladder(side)
            .keys()
            .filter(|id| !self.pending_cancels.contains(*id))
            .count()
    }

    /// Resting prices on `side`, ascending
    pub fn resting_prices(&self, side: Side) -> Vec<Decimal> {
        let mut prices: Vec<Decimal> = self.ladder(side).values().map(|o| o.price).collect();
        prices.sort();
        prices
    }

    pub fn is_resting_at(&self, side: Side, price: Decimal) -> bool {
        self.ladder(side).values().any(|o| o.price == price)
    }

    pub fn is_tracked(&self, order_id: &OrderId) -> bool {
        self.bids.contains_key(order_id) || self.asks.contains_key(order_id)
    }

    /// Side and resting details of a tracked order
    pub fn tracked_order(&self, order_id: &OrderId) -> Option<(Side, RestingOrder)> {
        if let Some(order) = self.bids.get(order_id) {
            Some((Side::Bid, *order))
        } else {
            self.asks.get(order_id).map(|order| (Side::Ask, *order))
        }
    }

    /// Submit a limit order and track every id the gateway hands back
    pub fn submit(
        &mut self,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        gateway: &mut dyn OrderGateway,
    ) -> Vec<OrderId> {
        let ids = gateway.submit(side, price, quantity);
        if ids.is_empty() {
            warn!("Gateway returned no order id for {} {} @ {}", side, quantity, price);
            return ids;
        }
        debug!("Submitted {} {} @ {} -> {:?}", side, quantity, price, ids);
        let ladder = self.ladder_mut(side);
        for id in &ids {
            ladder.insert(id.clone(), RestingOrder { price, quantity });
        }
        ids
    }

    /// Populate empty ladders with the levels nearest `current_price`
    ///
    /// Level-triggered: a side that already has resting orders is left alone.
    /// Returns the number of orders submitted.
    pub fn on_market_update(&mut self, current_price: Decimal, gateway: &mut dyn OrderGateway) -> usize {
        if !self.activated || self.stopped || self.spec.is_degenerate() {
            return 0;
        }

        let spec = Arc::clone(&self.spec);
        let mut placed = 0;

        if self.bids.is_empty() {
            let below = spec.levels_below(current_price);
            for level in below.iter().rev().take(self.max_open_orders) {
                if self.external_prices.contains(&level.price) {
                    debug!("Bid level {} already active on exchange, skipping", level.price);
                    continue;
                }
                placed += self.submit(Side::Bid, level.price, level.quantity, gateway).len();
            }
        }

        if self.asks.is_empty() {
            let above = spec.levels_above(current_price);
            for level in above.iter().take(self.max_open_orders) {
                if self.external_prices.contains(&level.price) {
                    debug!("Ask level {} already active on exchange, skipping", level.price);
                    continue;
                }
                placed += self.submit(Side::Ask, level.price, level.quantity, gateway).len();
            }
        }

        if placed > 0 {
            info!(
                "Ladder populated around {}: {} bids, {} asks resting",
                current_price,
                self.bids.len(),
                self.asks.len()
            );
        }
        placed
    }

    /// Apply a status update for one order
    ///
    /// Returns `None` for ids this ledger does not track and for non-terminal
    /// statuses.
    pub fn on_order_terminal(
        &mut self,
        update: &OrderUpdate,
        gateway: &mut dyn OrderGateway,
    ) -> Option<TerminalOutcome> {
        if !update.status.is_terminal() {
            return None;
        }

        let (side, order) = if let Some(order) = self.bids.remove(&update.order_id) {
            (Side::Bid, order)
        } else if let Some(order) = self.asks.remove(&update.order_id) {
            (Side::Ask, order)
        } else {
            debug!("Ignoring update for untracked order {}", update.order_id);
            return None;
        };
        self.pending_cancels.remove(&update.order_id);

        let filled_quantity = match update.status {
            OrderStatus::Filled if update.filled_quantity.is_zero() => order.quantity,
            _ => update.filled_quantity.max(Decimal::ZERO),
        };

        if update.status == OrderStatus::Filled {
            self.fill_count += 1;
            info!(
                "{} order {} filled at {} (fill #{})",
                side, update.order_id, order.price, self.fill_count
            );
            if !self.stopped {
                self.replenish(side, order.price, gateway);
            }
        } else if filled_quantity > Decimal::ZERO {
            info!(
                "{} order {} at {} ended {:?} after executing {}",
                side, update.order_id, order.price, update.status, filled_quantity
            );
        } else {
            debug!("{} order {} at {} ended: {:?}", side, update.order_id, order.price, update.status);
        }

        Some(TerminalOutcome {
            order_id: update.order_id.clone(),
            side,
            price: order.price,
            status: update.status,
            filled_quantity,
        })
    }

    /// Place the opposite-side order one step away and refill the filled side
    fn replenish(&mut self, filled_side: Side, fill_price: Decimal, gateway: &mut dyn OrderGateway) {
        let step = self.spec.step;
        let remaining = self.resting_count(filled_side);
        let wants_refill = remaining < self.max_open_orders;
        let refill_offset = step * Decimal::from(remaining + 1);

        let (opposite_price, refill_price) = match filled_side {
            Side::Bid => (fill_price + step, fill_price - refill_offset),
            Side::Ask => (fill_price - step, fill_price + refill_offset),
        };
        let opposite_price = self.quantizer.quantize(opposite_price);
        let refill_price = self.quantizer.quantize(refill_price);

        let opposite_ok = self.spec.in_range(opposite_price);
        let refill_ok = !wants_refill || self.spec.in_range(refill_price);
        if !opposite_ok || !refill_ok {
            debug!(
                "Replacement for {} fill at {} leaves range [{}, {}] (opposite {}, refill {}), skipping",
                filled_side, fill_price, self.spec.lower, self.spec.upper, opposite_price, refill_price
            );
            return;
        }

        self.place_level(filled_side.opposite(), opposite_price, gateway);
        if wants_refill {
            self.place_level(filled_side, refill_price, gateway);
        }
    }

    /// Place one replacement using the nearest grid quantity
    fn place_level(&mut self, side: Side, price: Decimal, gateway: &mut dyn OrderGateway) -> bool {
        let quantity = match self.spec.nearest_level(price) {
            Ok(level) if self.spec.in_range(level.price) => level.quantity,
            Ok(level) => {
                info!(
                    "Nearest grid price {} to {} is out of range, skipping {}",
                    level.price, price, side
                );
                return false;
            }
            Err(e) => {
                warn!("{}, skipping {} at {}", e, side, price);
                return false;
            }
        };

        if self.is_resting_at(side, price) {
            info!("{} already resting at {}, skipping duplicate", side, price);
            return false;
        }

        !self.submit(side, price, quantity, gateway).is_empty()
    }

    /// Cancel one order from an over-full side
    ///
    /// Bids give up their lowest price, asks their highest. Orders already
    /// being cancelled neither count nor get picked again.
    pub fn prune_excess(&mut self, side: Side, gateway: &mut dyn OrderGateway) -> Option<OrderId> {
        if self.live_count(side) <= self.max_open_orders {
            return None;
        }

        let live = self
            .ladder(side)
            .iter()
            .filter(|(id, _)| !self.pending_cancels.contains(*id));
        let victim = match side {
            Side::Bid => live.min_by(|a, b| a.1.price.cmp(&b.1.price).then_with(|| a.0.cmp(b.0))),
            Side::Ask => live.max_by(|a, b| a.1.price.cmp(&b.1.price).then_with(|| b.0.cmp(a.0))),
        }
        .map(|(id, order)| (id.clone(), order.price))?;

        let (order_id, price) = victim;
        info!(
            "{} ladder over {} orders, cancelling {} at {}",
            side, self.max_open_orders, order_id, price
        );
        gateway.cancel(&order_id);
        self.pending_cancels.insert(order_id.clone());
        Some(order_id)
    }

    /// Cancel every resting order; returns how many cancels were sent
    pub fn cancel_all(&mut self, gateway: &mut dyn OrderGateway) -> usize {
        let ids: Vec<OrderId> = self
            .bids
            .keys()
            .chain(self.asks.keys())
            .filter(|id| !self.pending_cancels.contains(*id))
            .cloned()
            .collect();

        for id in &ids {
            gateway.cancel(id);
        }
        if !ids.is_empty() {
            info!("Cancelled {} resting grid orders", ids.len());
        }
        self.pending_cancels.extend(ids.iter().cloned());
        ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::allocator::{AllocationParams, GridAllocator};
    use crate::grid::executor::mock::MockGateway;
    use crate::grid::types::{DirectionBias, Instrument};
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument::new("BTCUSDT", dec!(0.01), dec!(0.001))
    }

    /// Levels at 100, 110, ..., 190
    fn spec() -> Arc<GridSpec> {
        let allocator = GridAllocator::new(&instrument()).unwrap();
        let params = AllocationParams::new(dec!(100), dec!(200), dec!(10000), DirectionBias::Long)
            .with_grid_count_hint(10);
        allocator.allocate(&params).unwrap()
    }

    fn ledger(max_open_orders: usize) -> GridOrderLedger {
        let mut ledger = GridOrderLedger::new(spec(), dec!(0.01), max_open_orders, vec![]).unwrap();
        ledger.activate();
        ledger
    }

    fn fill(id: &OrderId, side: Side, price: Decimal) -> OrderUpdate {
        OrderUpdate::new(id.clone(), side, price, OrderStatus::Filled)
    }

    fn id_at(ledger: &GridOrderLedger, side: Side, price: Decimal) -> OrderId {
        ledger
            .ladder(side)
            .iter()
            .find(|(_, o)| o.price == price)
            .map(|(id, _)| id.clone())
            .unwrap()
    }

    #[test]
    fn test_inactive_ladder_places_nothing() {
        let mut ledger = GridOrderLedger::new(spec(), dec!(0.01), 3, vec![]).unwrap();
        let mut gateway = MockGateway::new(instrument());

        assert_eq!(ledger.on_market_update(dec!(150), &mut gateway), 0);
        assert!(gateway.submitted().is_empty());
    }

    #[test]
    fn test_market_update_populates_nearest_levels() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());

        assert_eq!(ledger.on_market_update(dec!(150), &mut gateway), 6);
        assert_eq!(ledger.resting_prices(Side::Bid), vec![dec!(120), dec!(130), dec!(140)]);
        assert_eq!(ledger.resting_prices(Side::Ask), vec![dec!(160), dec!(170), dec!(180)]);

        // Level-triggered: populated sides are left alone
        assert_eq!(ledger.on_market_update(dec!(150), &mut gateway), 0);
        assert_eq!(gateway.submitted().len(), 6);
    }

    #[test]
    fn test_market_update_skips_external_prices() {
        let mut ledger = GridOrderLedger::new(spec(), dec!(0.01), 3, vec![dec!(140), dec!(160)]).unwrap();
        ledger.activate();
        let mut gateway = MockGateway::new(instrument());

        ledger.on_market_update(dec!(150), &mut gateway);
        assert_eq!(ledger.resting_prices(Side::Bid), vec![dec!(120), dec!(130)]);
        assert_eq!(ledger.resting_prices(Side::Ask), vec![dec!(170), dec!(180)]);
    }

    #[test]
    fn test_buy_fill_places_sell_and_refill() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        gateway.clear();

        let id = id_at(&ledger, Side::Bid, dec!(140));
        let outcome = ledger.on_order_terminal(&fill(&id, Side::Bid, dec!(140)), &mut gateway).unwrap();

        assert!(outcome.is_fill());
        assert_eq!(outcome.side, Side::Bid);
        assert!(outcome.filled_quantity > Decimal::ZERO);
        assert_eq!(ledger.fill_count(), 1);

        let sells = gateway.limit_orders(Side::Ask);
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].price, Some(dec!(150)));
        assert_eq!(Some(sells[0].quantity), ledger.spec().quantity_at(dec!(150)));

        // Two bids remain, refill goes three steps below the fill
        let buys = gateway.limit_orders(Side::Bid);
        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].price, Some(dec!(110)));
        assert_eq!(ledger.resting_count(Side::Bid), 3);
    }

    #[test]
    fn test_sell_fill_places_buy_and_refill() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        gateway.clear();

        let id = id_at(&ledger, Side::Ask, dec!(160));
        ledger.on_order_terminal(&fill(&id, Side::Ask, dec!(160)), &mut gateway);

        assert_eq!(gateway.limit_orders(Side::Bid)[0].price, Some(dec!(150)));
        assert_eq!(gateway.limit_orders(Side::Ask)[0].price, Some(dec!(190)));
    }

    #[test]
    fn test_fill_skips_duplicate_price() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        ledger.submit(Side::Ask, dec!(150), dec!(0.01), &mut gateway);
        gateway.clear();

        let id = id_at(&ledger, Side::Bid, dec!(140));
        ledger.on_order_terminal(&fill(&id, Side::Bid, dec!(140)), &mut gateway);

        assert!(gateway.limit_orders(Side::Ask).is_empty());
        assert_eq!(gateway.limit_orders(Side::Bid).len(), 1);
    }

    #[test]
    fn test_fill_near_boundary_skips_replacement() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(125), &mut gateway);
        assert_eq!(ledger.resting_prices(Side::Bid), vec![dec!(100), dec!(110), dec!(120)]);
        gateway.clear();

        // Refill would land at 70, below the range
        let id = id_at(&ledger, Side::Bid, dec!(100));
        let outcome = ledger.on_order_terminal(&fill(&id, Side::Bid, dec!(100)), &mut gateway);

        assert!(outcome.is_some());
        assert_eq!(ledger.fill_count(), 1);
        assert!(gateway.submitted().is_empty());
    }

    #[test]
    fn test_full_side_gets_no_refill() {
        let mut ledger = ledger(1);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        ledger.submit(Side::Bid, dec!(130), dec!(0.01), &mut gateway);
        gateway.clear();

        let id = id_at(&ledger, Side::Bid, dec!(140));
        ledger.on_order_terminal(&fill(&id, Side::Bid, dec!(140)), &mut gateway);

        // One bid still rests, so only the sell goes out
        assert_eq!(gateway.submitted().len(), 1);
        assert_eq!(gateway.limit_orders(Side::Ask)[0].price, Some(dec!(150)));
    }

    #[test]
    fn test_fill_price_off_grid_uses_nearest_quantity() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.submit(Side::Bid, dec!(143.004), dec!(0.01), &mut gateway);
        gateway.clear();

        let id = id_at(&ledger, Side::Bid, dec!(143.004));
        ledger.on_order_terminal(&fill(&id, Side::Bid, dec!(143.004)), &mut gateway);

        let sells = gateway.limit_orders(Side::Ask);
        assert_eq!(sells[0].price, Some(dec!(153.00)));
        assert_eq!(Some(sells[0].quantity), ledger.spec().quantity_at(dec!(150)));
    }

    #[test]
    fn test_unknown_and_non_terminal_updates_ignored() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        gateway.clear();

        let stale = OrderUpdate::new("foreign-1", Side::Bid, dec!(140), OrderStatus::Filled);
        assert!(ledger.on_order_terminal(&stale, &mut gateway).is_none());

        let id = id_at(&ledger, Side::Bid, dec!(140));
        let partial = OrderUpdate::new(id.clone(), Side::Bid, dec!(140), OrderStatus::PartiallyFilled);
        assert!(ledger.on_order_terminal(&partial, &mut gateway).is_none());

        assert!(ledger.is_tracked(&id));
        assert_eq!(ledger.fill_count(), 0);
        assert!(gateway.submitted().is_empty());
    }

    #[test]
    fn test_cancel_removes_without_replacement() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        gateway.clear();

        for status in [OrderStatus::Cancelled, OrderStatus::Rejected, OrderStatus::Expired] {
            let id = id_at(&ledger, Side::Ask, *ledger.resting_prices(Side::Ask).first().unwrap());
            let update = OrderUpdate::new(id.clone(), Side::Ask, dec!(0), status);
            let outcome = ledger.on_order_terminal(&update, &mut gateway).unwrap();
            assert_eq!(outcome.filled_quantity, Decimal::ZERO);
            assert!(!ledger.is_tracked(&id));
        }

        assert_eq!(ledger.resting_count(Side::Ask), 0);
        assert_eq!(ledger.fill_count(), 0);
        assert!(gateway.submitted().is_empty());
    }

    #[test]
    fn test_cancel_after_partial_execution_reports_quantity() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        gateway.clear();

        let id = id_at(&ledger, Side::Bid, dec!(140));
        let (side, order) = ledger.tracked_order(&id).unwrap();
        assert_eq!(side, Side::Bid);
        assert_eq!(order.price, dec!(140));

        let update = OrderUpdate::new(id.clone(), Side::Bid, dec!(140), OrderStatus::Cancelled)
            .with_filled_quantity(dec!(0.03));
        let outcome = ledger.on_order_terminal(&update, &mut gateway).unwrap();

        assert_eq!(outcome.filled_quantity, dec!(0.03));
        assert!(!outcome.is_fill());
        assert!(ledger.tracked_order(&id).is_none());
        assert_eq!(ledger.fill_count(), 0);
        assert!(gateway.submitted().is_empty());
    }

    #[test]
    fn test_prune_cancels_lowest_bid_one_at_a_time() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        for price in [dec!(100), dec!(110), dec!(120), dec!(130), dec!(140)] {
            ledger.submit(Side::Bid, price, dec!(0.01), &mut gateway);
        }

        let first = ledger.prune_excess(Side::Bid, &mut gateway).unwrap();
        assert_eq!(first, id_at(&ledger, Side::Bid, dec!(100)));

        let second = ledger.prune_excess(Side::Bid, &mut gateway).unwrap();
        assert_eq!(second, id_at(&ledger, Side::Bid, dec!(110)));

        assert!(ledger.prune_excess(Side::Bid, &mut gateway).is_none());
        assert_eq!(gateway.cancelled(), vec![first.clone(), second]);

        // Confirmation removes the order for good
        let update = OrderUpdate::new(first.clone(), Side::Bid, dec!(100), OrderStatus::Cancelled);
        ledger.on_order_terminal(&update, &mut gateway);
        assert_eq!(ledger.resting_count(Side::Bid), 4);
        assert_eq!(ledger.live_count(Side::Bid), 3);
    }

    #[test]
    fn test_prune_cancels_highest_ask() {
        let mut ledger = ledger(1);
        let mut gateway = MockGateway::new(instrument());
        ledger.submit(Side::Ask, dec!(160), dec!(0.01), &mut gateway);
        ledger.submit(Side::Ask, dec!(170), dec!(0.01), &mut gateway);

        let cancelled = ledger.prune_excess(Side::Ask, &mut gateway).unwrap();
        assert_eq!(cancelled, id_at(&ledger, Side::Ask, dec!(170)));
        assert!(ledger.prune_excess(Side::Ask, &mut gateway).is_none());
    }

    #[test]
    fn test_halted_ledger_stops_replenishing() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        ledger.on_market_update(dec!(150), &mut gateway);
        ledger.halt();

        assert_eq!(ledger.cancel_all(&mut gateway), 6);
        assert_eq!(ledger.cancel_all(&mut gateway), 0);
        gateway.clear();

        let id = id_at(&ledger, Side::Bid, dec!(140));
        let outcome = ledger.on_order_terminal(&fill(&id, Side::Bid, dec!(140)), &mut gateway);
        assert!(outcome.unwrap().is_fill());
        assert!(gateway.submitted().is_empty());
        assert_eq!(ledger.on_market_update(dec!(150), &mut gateway), 0);
    }

    #[test]
    fn test_rejected_submission_not_tracked() {
        let mut ledger = ledger(3);
        let mut gateway = MockGateway::new(instrument());
        gateway.reject_all = true;

        assert!(ledger.submit(Side::Bid, dec!(100), dec!(0.01), &mut gateway).is_empty());
        assert_eq!(ledger.resting_count(Side::Bid), 0);
    }
}
