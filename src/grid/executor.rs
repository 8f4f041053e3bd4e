//! Order gateway and event feed abstractions - enables mocking for tests

use async_trait::async_trait;
use log::debug;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::errors::GridResult;
use super::types::{Instrument, OrderId, OrderUpdate, Side, Tick};

/// Order routing operations used by the grid core
///
/// Submission is fire-and-forget: returned ids are treated as resting at once.
/// An empty vector means the gateway did not accept the order.
pub trait OrderGateway: Send {
    /// Exchange constraints of the traded instrument
    fn instrument(&self) -> &Instrument;

    /// Prices of orders already resting on the exchange
    fn active_order_prices(&self) -> Vec<Decimal>;

    /// Place a limit buy
    fn submit_buy(&mut self, price: Decimal, quantity: Decimal) -> Vec<OrderId>;

    /// Place a limit sell
    fn submit_sell(&mut self, price: Decimal, quantity: Decimal) -> Vec<OrderId>;

    /// Place a market order
    fn submit_market(&mut self, side: Side, quantity: Decimal) -> Vec<OrderId>;

    /// Cancel an order by id
    fn cancel(&mut self, order_id: &OrderId);

    /// Place a limit order on `side`
    fn submit(&mut self, side: Side, price: Decimal, quantity: Decimal) -> Vec<OrderId> {
        match side {
            Side::Bid => self.submit_buy(price, quantity),
            Side::Ask => self.submit_sell(price, quantity),
        }
    }
}

/// Scoped handle on an event stream
///
/// Dropping the handle aborts the producer task, so a feed is released on
/// every exit path of its owner.
pub struct Subscription<T> {
    name: &'static str,
    receiver: mpsc::UnboundedReceiver<T>,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    pub fn new(name: &'static str, receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self {
            name,
            receiver,
            task: None,
        }
    }

    /// Attach the task feeding this subscription
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Next event, or `None` once the producer is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!("Released {} subscription", self.name);
    }
}

/// Market data source
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn subscribe_ticks(&self) -> GridResult<Subscription<Tick>>;
}

/// Order status source
#[async_trait]
pub trait OrderFeed: Send + Sync {
    async fn subscribe_orders(&self) -> GridResult<Subscription<OrderUpdate>>;
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Mock gateway and feeds for testing grid logic without an exchange.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard};

    /// One order seen by the mock gateway
    #[derive(Debug, Clone, PartialEq)]
    pub struct SubmittedOrder {
        pub order_id: OrderId,
        pub side: Side,
        /// `None` for market orders
        pub price: Option<Decimal>,
        pub quantity: Decimal,
    }

    #[derive(Debug, Default)]
    pub struct MockGatewayLog {
        pub submitted: Vec<SubmittedOrder>,
        pub cancelled: Vec<OrderId>,
    }

    /// Recording gateway; clones share the same log
    #[derive(Debug, Clone)]
    pub struct MockGateway {
        instrument: Instrument,
        pub active_prices: Vec<Decimal>,
        pub log: Arc<Mutex<MockGatewayLog>>,
        next_oid: Arc<AtomicU64>,
        /// Return no ids for every submission
        pub reject_all: bool,
    }

    impl MockGateway {
        pub fn new(instrument: Instrument) -> Self {
            Self {
                instrument,
                active_prices: Vec::new(),
                log: Arc::new(Mutex::new(MockGatewayLog::default())),
                next_oid: Arc::new(AtomicU64::new(1)),
                reject_all: false,
            }
        }

        pub fn with_active_prices(mut self, prices: Vec<Decimal>) -> Self {
            self.active_prices = prices;
            self
        }

        fn log(&self) -> MutexGuard<'_, MockGatewayLog> {
            self.log.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn submitted(&self) -> Vec<SubmittedOrder> {
            self.log().submitted.clone()
        }

        /// Limit orders on one side, in submission order
        pub fn limit_orders(&self, side: Side) -> Vec<SubmittedOrder> {
            self.log()
                .submitted
                .iter()
                .filter(|o| o.side == side && o.price.is_some())
                .cloned()
                .collect()
        }

        pub fn market_orders(&self) -> Vec<SubmittedOrder> {
            self.log()
                .submitted
                .iter()
                .filter(|o| o.price.is_none())
                .cloned()
                .collect()
        }

        pub fn cancelled(&self) -> Vec<OrderId> {
            self.log().cancelled.clone()
        }

        pub fn clear(&self) {
            let mut log = self.log();
            log.submitted.clear();
            log.cancelled.clear();
        }

        fn record(&mut self, side: Side, price: Option<Decimal>, quantity: Decimal) -> Vec<OrderId> {
            if self.reject_all {
                return Vec::new();
            }
            let order_id = OrderId::from(self.next_oid.fetch_add(1, Ordering::SeqCst));
            self.log().submitted.push(SubmittedOrder {
                order_id: order_id.clone(),
                side,
                price,
                quantity,
            });
            vec![order_id]
        }
    }

    impl OrderGateway for MockGateway {
        fn instrument(&self) -> &Instrument {
            &self.instrument
        }

        fn active_order_prices(&self) -> Vec<Decimal> {
            self.active_prices.clone()
        }

        fn submit_buy(&mut self, price: Decimal, quantity: Decimal) -> Vec<OrderId> {
            self.record(Side::Bid, Some(price), quantity)
        }

        fn submit_sell(&mut self, price: Decimal, quantity: Decimal) -> Vec<OrderId> {
            self.record(Side::Ask, Some(price), quantity)
        }

        fn submit_market(&mut self, side: Side, quantity: Decimal) -> Vec<OrderId> {
            self.record(side, None, quantity)
        }

        fn cancel(&mut self, order_id: &OrderId) {
            self.log().cancelled.push(order_id.clone());
        }
    }

    /// Feed that replays a fixed list of events, then closes
    pub struct MockFeed<T> {
        events: Vec<T>,
    }

    impl<T: Clone + Send + 'static> MockFeed<T> {
        pub fn new(events: Vec<T>) -> Self {
            Self { events }
        }

        fn replay(&self, name: &'static str) -> Subscription<T> {
            let (tx, rx) = mpsc::unbounded_channel();
            for event in &self.events {
                // Receiver is alive until the subscription is returned
                let _ = tx.send(event.clone());
            }
            Subscription::new(name, rx)
        }
    }

    pub type MockPriceFeed = MockFeed<Tick>;
    pub type MockOrderFeed = MockFeed<OrderUpdate>;

    #[async_trait]
    impl PriceFeed for MockFeed<Tick> {
        async fn subscribe_ticks(&self) -> GridResult<Subscription<Tick>> {
            Ok(self.replay("mock price"))
        }
    }

    #[async_trait]
    impl OrderFeed for MockFeed<OrderUpdate> {
        async fn subscribe_orders(&self) -> GridResult<Subscription<OrderUpdate>> {
            Ok(self.replay("mock order"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument::new("BTCUSDT", dec!(0.01), dec!(0.001))
    }

    #[test]
    fn test_mock_gateway_records_orders() {
        let mut gateway = MockGateway::new(instrument());
        let shared = gateway.clone();

        let buy = gateway.submit(Side::Bid, dec!(100), dec!(1));
        let sell = gateway.submit(Side::Ask, dec!(110), dec!(1));
        gateway.submit_market(Side::Ask, dec!(2));
        gateway.cancel(&buy[0]);

        assert_ne!(buy, sell);
        assert_eq!(shared.limit_orders(Side::Bid).len(), 1);
        assert_eq!(shared.limit_orders(Side::Ask)[0].price, Some(dec!(110)));
        assert_eq!(shared.market_orders()[0].quantity, dec!(2));
        assert_eq!(shared.cancelled(), buy);
    }

    #[test]
    fn test_mock_gateway_reject_all() {
        let mut gateway = MockGateway::new(instrument());
        gateway.reject_all = true;
        assert!(gateway.submit_buy(dec!(100), dec!(1)).is_empty());
        assert!(gateway.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_mock_feed_replays_then_closes() {
        let feed = MockPriceFeed::new(vec![Tick::new(dec!(1)), Tick::new(dec!(2))]);
        let mut sub = feed.subscribe_ticks().await.unwrap();

        assert_eq!(sub.recv().await.unwrap().best_bid, dec!(1));
        assert_eq!(sub.recv().await.unwrap().best_bid, dec!(2));
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_drop_aborts_task() {
        let (tx, rx) = mpsc::unbounded_channel::<u32>();
        let task = tokio::spawn(async move {
            loop {
                if tx.send(1).is_err() {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        });
        let abort = task.abort_handle();
        let sub = Subscription::new("test", rx).with_task(task);
        assert_eq!(sub.name(), "test");

        drop(sub);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(abort.is_finished());
    }
}
