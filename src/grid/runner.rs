//! Grid runner - main execution loop

use std::time::Duration;

use log::{debug, info};
use tokio::time::{interval, MissedTickBehavior};

use super::config::GridConfig;
use super::errors::GridResult;
use super::executor::{OrderFeed, OrderGateway, PriceFeed, Subscription};
use super::strategy::{GridStrategy, GridSummary, DEFAULT_PRUNE_EVERY_TICKS};
use super::types::{OrderUpdate, Tick};

/// Grid runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Period of the housekeeping timer
    pub timer_interval: Duration,
    /// Timer ticks between pruning passes
    pub prune_every_ticks: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timer_interval: Duration::from_secs(1),
            prune_every_ticks: DEFAULT_PRUNE_EVERY_TICKS,
        }
    }
}

/// Drives a `GridStrategy` from its price feed, order feed and timer
///
/// Events are handled one at a time. The loop ends once both feeds have
/// closed, or once the grid is halted with no orders left resting.
pub struct GridRunner<G: OrderGateway> {
    strategy: GridStrategy<G>,
    prices: Subscription<Tick>,
    orders: Subscription<OrderUpdate>,
    config: RunnerConfig,
}

impl<G: OrderGateway> GridRunner<G> {
    pub fn new(
        strategy: GridStrategy<G>,
        prices: Subscription<Tick>,
        orders: Subscription<OrderUpdate>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            strategy,
            prices,
            orders,
            config,
        }
    }

    /// Subscribe to both feeds, then start the strategy
    ///
    /// The subscriptions are taken first so a failing start releases them.
    pub async fn start<P, F>(
        grid_config: GridConfig,
        gateway: G,
        price_feed: &P,
        order_feed: &F,
        config: RunnerConfig,
    ) -> GridResult<Self>
    where
        P: PriceFeed + ?Sized,
        F: OrderFeed + ?Sized,
    {
        let prices = price_feed.subscribe_ticks().await?;
        let orders = order_feed.subscribe_orders().await?;
        let strategy = GridStrategy::start(grid_config, gateway)?.with_prune_every(config.prune_every_ticks);
        Ok(Self::new(strategy, prices, orders, config))
    }

    pub fn strategy(&self) -> &GridStrategy<G> {
        &self.strategy
    }

    /// Run until the feeds close or the halted grid has nothing left resting
    pub async fn run(mut self) -> GridResult<GridSummary> {
        info!(
            "Starting grid runner (timer {:?}, prune every {} ticks)",
            self.config.timer_interval, self.config.prune_every_ticks
        );

        let mut timer = interval(self.config.timer_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut prices_open = true;
        let mut orders_open = true;

        while prices_open || orders_open {
            let halted = self.strategy.is_halted();

            tokio::select! {
                tick = self.prices.recv(), if prices_open => match tick {
                    Some(tick) => {
                        self.strategy.on_tick(&tick);
                    }
                    None => {
                        info!("Price feed closed");
                        prices_open = false;
                    }
                },
                update = self.orders.recv(), if orders_open => match update {
                    Some(update) => {
                        self.strategy.on_order(&update);
                    }
                    None => {
                        info!("Order feed closed");
                        orders_open = false;
                    }
                },
                _ = timer.tick(), if !halted => {
                    let pruned = self.strategy.on_timer();
                    if !pruned.is_empty() {
                        debug!("Timer pruned {:?}", pruned);
                    }
                }
            }

            if self.strategy.is_finished() {
                info!("Grid halted and all orders closed");
                break;
            }
        }

        self.strategy.shutdown();
        let summary = self.strategy.summary();
        info!("Grid runner finished: {}", summary);
        Ok(summary)
    }
}
