//! Paper trading market
//!
//! Replays a list of bid prices and simulates order execution locally by
//! checking each price against resting limit orders. Fills and cancels are
//! reported on the order feed before the tick that caused them.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::time::interval;

use crate::grid::errors::{GridError, GridResult};
use crate::grid::executor::{OrderFeed, OrderGateway, PriceFeed, Subscription};
use crate::grid::types::{Instrument, OrderId, OrderStatus, OrderUpdate, Side, Tick};

/// Internal order tracking for paper trading
#[derive(Debug, Clone)]
struct PaperOrder {
    order_id: OrderId,
    side: Side,
    price: Decimal,
    quantity: Decimal,
}

impl PaperOrder {
    /// Check if this order should be filled at the given bid
    fn should_fill(&self, bid: Decimal) -> bool {
        match self.side {
            Side::Bid => bid <= self.price,
            Side::Ask => bid >= self.price,
        }
    }
}

/// Shared book behind the paper feeds and gateway
#[derive(Debug, Default)]
struct PaperBook {
    next_id: u64,
    resting: Vec<PaperOrder>,
    last_price: Option<Decimal>,
    fills: u64,
    order_tx: Option<UnboundedSender<OrderUpdate>>,
}

impl PaperBook {
    fn next_order_id(&mut self) -> OrderId {
        self.next_id += 1;
        OrderId::from(self.next_id)
    }

    fn publish(&self, update: OrderUpdate) {
        if let Some(tx) = &self.order_tx {
            if tx.send(update).is_err() {
                debug!("Paper order feed has no subscriber");
            }
        }
    }

    fn place(&mut self, side: Side, price: Decimal, quantity: Decimal) -> OrderId {
        let order_id = self.next_order_id();
        debug!("Paper {} {} @ {} accepted as {}", side, quantity, price, order_id);
        self.resting.push(PaperOrder {
            order_id: order_id.clone(),
            side,
            price,
            quantity,
        });
        order_id
    }

    /// Fill every resting order crossed by `bid`
    fn match_price(&mut self, bid: Decimal) -> usize {
        self.last_price = Some(bid);
        let (filled, resting): (Vec<PaperOrder>, Vec<PaperOrder>) =
            self.resting.drain(..).partition(|o| o.should_fill(bid));
        self.resting = resting;

        for order in &filled {
            self.fills += 1;
            info!(
                "Paper fill: {} {} {} @ {} (bid {})",
                order.order_id, order.side, order.quantity, order.price, bid
            );
            self.publish(
                OrderUpdate::new(order.order_id.clone(), order.side, order.price, OrderStatus::Filled)
                    .with_filled_quantity(order.quantity),
            );
        }
        filled.len()
    }

    fn cancel(&mut self, order_id: &OrderId) {
        let Some(idx) = self.resting.iter().position(|o| &o.order_id == order_id) else {
            debug!("Paper cancel for unknown order {}", order_id);
            return;
        };
        let order = self.resting.remove(idx);
        self.publish(OrderUpdate::new(order.order_id, order.side, order.price, OrderStatus::Cancelled));
    }
}

fn lock(book: &Mutex<PaperBook>) -> MutexGuard<'_, PaperBook> {
    book.lock().unwrap_or_else(|e| e.into_inner())
}

/// Local exchange simulation fed by a fixed price path
pub struct PaperExchange {
    instrument: Instrument,
    prices: Vec<Decimal>,
    tick_interval: Duration,
    book: Arc<Mutex<PaperBook>>,
}

impl PaperExchange {
    pub fn new(instrument: Instrument, prices: Vec<Decimal>, tick_interval: Duration) -> Self {
        Self {
            instrument,
            prices,
            tick_interval,
            book: Arc::new(Mutex::new(PaperBook::default())),
        }
    }

    /// Build from a JSON array of prices (numbers or strings)
    pub fn from_ticks_file(
        instrument: Instrument,
        path: impl AsRef<Path>,
        tick_interval: Duration,
    ) -> GridResult<Self> {
        let prices = load_prices(path)?;
        if prices.is_empty() {
            return Err(GridError::Feed("ticks file holds no prices".into()));
        }
        Ok(Self::new(instrument, prices, tick_interval))
    }

    /// Gateway routing orders into this exchange's book
    pub fn gateway(&self) -> PaperGateway {
        PaperGateway {
            instrument: self.instrument.clone(),
            book: Arc::clone(&self.book),
        }
    }

    pub fn fill_count(&self) -> u64 {
        lock(&self.book).fills
    }

    pub fn resting_count(&self) -> usize {
        lock(&self.book).resting.len()
    }

    pub fn last_price(&self) -> Option<Decimal> {
        lock(&self.book).last_price
    }
}

/// Read a JSON array of prices
pub fn load_prices(path: impl AsRef<Path>) -> GridResult<Vec<Decimal>> {
    let content = std::fs::read_to_string(path)?;
    let prices: Vec<Decimal> = serde_json::from_str(&content)?;
    Ok(prices)
}

#[async_trait]
impl PriceFeed for PaperExchange {
    async fn subscribe_ticks(&self) -> GridResult<Subscription<Tick>> {
        let (tx, rx) = unbounded_channel();
        let book = Arc::clone(&self.book);
        let prices = self.prices.clone();
        let period = self.tick_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            for price in prices {
                ticker.tick().await;
                lock(&book).match_price(price);
                if tx.send(Tick::new(price)).is_err() {
                    break;
                }
            }
            info!("Paper price path exhausted");
            // Closing the order feed lets the consumer wind down
            lock(&book).order_tx = None;
        });

        Ok(Subscription::new("paper price", rx).with_task(task))
    }
}

#[async_trait]
impl OrderFeed for PaperExchange {
    async fn subscribe_orders(&self) -> GridResult<Subscription<OrderUpdate>> {
        let mut book = lock(&self.book);
        if book.order_tx.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(GridError::Gateway("paper order feed already has a subscriber".into()));
        }
        let (tx, rx) = unbounded_channel();
        book.order_tx = Some(tx);
        Ok(Subscription::new("paper order", rx))
    }
}

/// Order gateway backed by a `PaperExchange`
#[derive(Debug, Clone)]
pub struct PaperGateway {
    instrument: Instrument,
    book: Arc<Mutex<PaperBook>>,
}

impl OrderGateway for PaperGateway {
    fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    fn active_order_prices(&self) -> Vec<Decimal> {
        lock(&self.book).resting.iter().map(|o| o.price).collect()
    }

    fn submit_buy(&mut self, price: Decimal, quantity: Decimal) -> Vec<OrderId> {
        vec![lock(&self.book).place(Side::Bid, price, quantity)]
    }

    fn submit_sell(&mut self, price: Decimal, quantity: Decimal) -> Vec<OrderId> {
        vec![lock(&self.book).place(Side::Ask, price, quantity)]
    }

    fn submit_market(&mut self, side: Side, quantity: Decimal) -> Vec<OrderId> {
        let mut book = lock(&self.book);
        let Some(price) = book.last_price else {
            info!("Paper market {} {} rejected: no price yet", side, quantity);
            return Vec::new();
        };
        let order_id = book.next_order_id();
        book.fills += 1;
        info!("Paper market fill: {} {} {} @ {}", order_id, side, quantity, price);
        book.publish(
            OrderUpdate::new(order_id.clone(), side, price, OrderStatus::Filled).with_filled_quantity(quantity),
        );
        vec![order_id]
    }

    fn cancel(&mut self, order_id: &OrderId) {
        lock(&self.book).cancel(order_id);
    }
}
