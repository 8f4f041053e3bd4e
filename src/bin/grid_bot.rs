//! Grid Trading Bot Binary
//!
//! Runs the grid strategy against the paper market, replaying a price path
//! from a JSON file.
//!
//! ## Setup
//!
//! 1. Copy `demos/config.toml` and adjust the `[grid]` section.
//!
//! 2. Run the bot:
//!    ```bash
//!    cargo run --bin grid_bot -- demos/config.toml
//!    ```
//!
//! Any setting can be overridden from the environment, e.g.
//! `APP__GRID__STOP_LOSS_PRICE=38000`.

use std::env;
use std::process;

use log::{error, info};

use gridtrader::{
    grid::{GridResult, GridRunner, GridSummary},
    market::PaperExchange,
    Settings,
};

async fn run(settings: Settings) -> GridResult<GridSummary> {
    settings.validate()?;

    let exchange = PaperExchange::from_ticks_file(
        settings.instrument.clone(),
        &settings.paper.ticks_file,
        settings.paper.tick_interval(),
    )?;
    info!(
        "Paper market on {} replaying {}",
        settings.instrument.symbol, settings.paper.ticks_file
    );

    let runner = GridRunner::start(
        settings.grid,
        exchange.gateway(),
        &exchange,
        &exchange,
        settings.runner.runner_config(),
    )
    .await?;
    let summary = runner.run().await?;

    info!(
        "Paper market: {} fills, {} orders still resting, last price {:?}",
        exchange.fill_count(),
        exchange.resting_count(),
        exchange.last_price()
    );
    Ok(summary)
}

#[tokio::main]
async fn main() {
    // Load .env file
    let dotenv = dotenvy::dotenv();

    let args: Vec<String> = env::args().collect();
    let default_config = "config.toml".to_string();
    let config_path = args.get(1).unwrap_or(&default_config);

    let settings = match Settings::new(config_path) {
        Ok(settings) => settings,
        Err(e) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
            error!("Failed to load config '{}': {}", config_path, e);
            process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log.level.as_str()))
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment from: {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }
    info!("Loaded config from {}", config_path);

    match run(settings).await {
        Ok(summary) => {
            info!("Final summary: {}", summary);
            if let Ok(json) = serde_json::to_string_pretty(&summary) {
                println!("{}", json);
            }
        }
        Err(e) if e.is_fatal() => {
            error!("Grid rejected before placing orders: {}", e);
            process::exit(2);
        }
        Err(e) => {
            error!("Grid bot failed: {}", e);
            process::exit(1);
        }
    }
}
