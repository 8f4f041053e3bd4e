//! Grid Trading Module
//!
//! Allocation engine and order-replenishment state machine for running a
//! grid on a single instrument.
//!
//! # Architecture
//!
//! - [`quantizer`] - Tick rounding in exact decimal arithmetic
//! - [`allocator`] - Grid levels and per-level order sizes
//! - [`ledger`] - Resting-order ladders and fill replenishment
//! - [`trigger`] - Start-price activation and stop-loss liquidation
//! - [`position`] - Net position from fills
//! - [`strategy`] - Facade composing the pieces above
//! - [`executor`] - Gateway and feed abstractions (mockable for testing)
//! - [`runner`] - Main execution loop
//! - [`config`] - Grid configuration and validation
//! - [`types`] - Core data types (Side, OrderUpdate, Tick, ...)
//! - [`errors`] - Grid-specific error types
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use gridtrader::grid::{DirectionBias, GridConfig, GridRunner, RunnerConfig};
//! use rust_decimal_macros::dec;
//!
//! // 5000 USDT spread over 40000 - 50000, lower half weighted
//! let config = GridConfig::new(dec!(40000), dec!(50000), dec!(5000))
//!     .with_direction_bias(DirectionBias::Long)
//!     .with_max_open_orders(5)
//!     .with_stop_loss_price(dec!(38000));
//!
//! let runner = GridRunner::start(config, gateway, &price_feed, &order_feed, RunnerConfig::default()).await?;
//! let summary = runner.run().await?;
//! ```
//!
//! # Testing
//!
//! ```rust,ignore
//! use gridtrader::grid::executor::mock::{MockGateway, MockOrderFeed, MockPriceFeed};
//!
//! let gateway = MockGateway::new(Instrument::new("BTCUSDT", dec!(0.01), dec!(0.001)));
//! let prices = MockPriceFeed::new(vec![Tick::new(dec!(45000))]);
//! let orders = MockOrderFeed::new(vec![]);
//! ```

pub mod allocator;
pub mod config;
pub mod errors;
pub mod executor;
pub mod ledger;
pub mod position;
pub mod quantizer;
pub mod runner;
pub mod strategy;
pub mod trigger;
pub mod types;

// Re-export commonly used types
pub use allocator::{AllocationParams, GridAllocator, GridSpec};
pub use config::GridConfig;
pub use errors::{GridError, GridResult};
pub use executor::{OrderFeed, OrderGateway, PriceFeed, Subscription};
pub use ledger::{GridOrderLedger, TerminalOutcome};
pub use position::PositionTracker;
pub use quantizer::{quantize, PriceQuantizer};
pub use runner::{GridRunner, RunnerConfig};
pub use strategy::{GridStrategy, GridSummary};
pub use trigger::{LiquidationOrder, TriggerController, TriggerState};
pub use types::{DirectionBias, Instrument, OrderId, OrderStatus, OrderUpdate, PriceLevel, Side, Tick};
