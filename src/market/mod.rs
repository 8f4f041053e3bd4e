//! Market Simulation Module
//!
//! Local stand-ins for an exchange connection. The paper market implements
//! the grid's `PriceFeed`, `OrderFeed` and `OrderGateway` seams so a grid can
//! run end to end without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use gridtrader::market::PaperExchange;
//!
//! let exchange = PaperExchange::from_ticks_file(instrument, "demos/ticks.json", Duration::from_millis(200))?;
//! let gateway = exchange.gateway();
//! let runner = GridRunner::start(config, gateway, &exchange, &exchange, RunnerConfig::default()).await?;
//! ```

mod paper;

pub use paper::{load_prices, PaperExchange, PaperGateway};
