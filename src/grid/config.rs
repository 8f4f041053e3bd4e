//! Grid strategy configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocator::{AllocationParams, DEFAULT_SPACING_FRACTION};
use super::errors::{GridError, GridResult};
use super::types::DirectionBias;

/// Grid strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Upper price boundary of the grid
    pub upper_price: Decimal,

    /// Lower price boundary of the grid
    pub bottom_price: Decimal,

    /// Maximum resting orders per side
    #[serde(default = "default_max_open_orders")]
    pub max_open_orders: usize,

    /// Total quote notional spread across all levels
    pub order_amount: Decimal,

    /// Price that activates the ladder; 0 starts immediately
    #[serde(default)]
    pub start_price: Decimal,

    /// Bid price that triggers liquidation; 0 disables
    #[serde(default)]
    pub stop_loss_price: Decimal,

    #[serde(default)]
    pub direction_bias: DirectionBias,

    /// Seed spacing between levels as a fraction of `upper_price`
    #[serde(default = "default_grid_spacing_pct")]
    pub grid_spacing_pct: Decimal,

    /// Explicit starting grid count; overrides the spacing seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_count_hint: Option<u32>,
}

fn default_max_open_orders() -> usize {
    5
}

fn default_grid_spacing_pct() -> Decimal {
    DEFAULT_SPACING_FRACTION
}

impl GridConfig {
    /// Create a configuration with required parameters
    ///
    /// # Arguments
    /// * `bottom_price` - Lower price boundary
    /// * `upper_price` - Upper price boundary
    /// * `order_amount` - Total quote notional to allocate
    pub fn new(bottom_price: Decimal, upper_price: Decimal, order_amount: Decimal) -> Self {
        Self {
            upper_price,
            bottom_price,
            max_open_orders: default_max_open_orders(),
            order_amount,
            start_price: Decimal::ZERO,
            stop_loss_price: Decimal::ZERO,
            direction_bias: DirectionBias::default(),
            grid_spacing_pct: default_grid_spacing_pct(),
            grid_count_hint: None,
        }
    }

    /// Builder: set the per-side resting order cap
    pub fn with_max_open_orders(mut self, max: usize) -> Self {
        self.max_open_orders = max;
        self
    }

    /// Builder: set activation price
    pub fn with_start_price(mut self, price: Decimal) -> Self {
        self.start_price = price;
        self
    }

    /// Builder: set stop-loss price
    pub fn with_stop_loss_price(mut self, price: Decimal) -> Self {
        self.stop_loss_price = price;
        self
    }

    pub fn with_direction_bias(mut self, bias: DirectionBias) -> Self {
        self.direction_bias = bias;
        self
    }

    /// Builder: set seed spacing fraction
    pub fn with_grid_spacing_pct(mut self, pct: Decimal) -> Self {
        self.grid_spacing_pct = pct;
        self
    }

    /// Builder: set starting grid count
    pub fn with_grid_count_hint(mut self, count: u32) -> Self {
        self.grid_count_hint = Some(count);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> GridResult<()> {
        if self.bottom_price >= self.upper_price {
            return Err(GridError::InvalidRange {
                lower: self.bottom_price,
                upper: self.upper_price,
            });
        }

        if self.bottom_price <= Decimal::ZERO {
            return Err(GridError::InvalidConfig("bottom_price must be positive".into()));
        }

        if self.order_amount <= Decimal::ZERO {
            return Err(GridError::InvalidConfig("order_amount must be positive".into()));
        }

        if self.max_open_orders == 0 {
            return Err(GridError::InvalidConfig(
                "max_open_orders must be at least 1".into(),
            ));
        }

        if self.start_price < Decimal::ZERO || self.stop_loss_price < Decimal::ZERO {
            return Err(GridError::InvalidConfig(
                "start_price and stop_loss_price cannot be negative".into(),
            ));
        }

        if self.grid_spacing_pct <= Decimal::ZERO || self.grid_spacing_pct >= Decimal::ONE {
            return Err(GridError::InvalidConfig(
                "grid_spacing_pct must be between 0 and 1".into(),
            ));
        }

        if self.grid_count_hint == Some(0) {
            return Err(GridError::InvalidConfig(
                "grid_count_hint must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Allocator inputs for this configuration
    pub fn allocation_params(&self) -> AllocationParams {
        let params = AllocationParams::new(
            self.bottom_price,
            self.upper_price,
            self.order_amount,
            self.direction_bias,
        )
        .with_spacing_fraction(self.grid_spacing_pct);

        match self.grid_count_hint {
            Some(count) => params.with_grid_count_hint(count),
            None => params,
        }
    }

    /// Load config from JSON file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> GridResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to JSON file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> GridResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> GridConfig {
        GridConfig::new(dec!(40000), dec!(50000), dec!(5000))
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let inverted = GridConfig::new(dec!(50000), dec!(40000), dec!(5000));
        assert!(matches!(inverted.validate(), Err(GridError::InvalidRange { .. })));

        let no_money = GridConfig::new(dec!(40000), dec!(50000), dec!(0));
        assert!(matches!(no_money.validate(), Err(GridError::InvalidConfig(_))));

        assert!(config().with_max_open_orders(0).validate().is_err());
        assert!(config().with_stop_loss_price(dec!(-1)).validate().is_err());
        assert!(config().with_grid_spacing_pct(dec!(0)).validate().is_err());
        assert!(config().with_grid_count_hint(0).validate().is_err());
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let json = r#"{"upper_price": "50000", "bottom_price": "40000", "order_amount": "5000"}"#;
        let config: GridConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.max_open_orders, 5);
        assert_eq!(config.start_price, Decimal::ZERO);
        assert_eq!(config.stop_loss_price, Decimal::ZERO);
        assert_eq!(config.direction_bias, DirectionBias::Long);
        assert_eq!(config.grid_spacing_pct, dec!(0.006));
        assert_eq!(config.grid_count_hint, None);
    }

    #[test]
    fn test_numeric_json_fields() {
        let json = r#"{"upper_price": 2.5, "bottom_price": 1.5, "order_amount": 100, "direction_bias": "short"}"#;
        let config: GridConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.upper_price, dec!(2.5));
        assert_eq!(config.direction_bias, DirectionBias::Short);
    }

    #[test]
    fn test_allocation_params() {
        let params = config()
            .with_direction_bias(DirectionBias::Short)
            .with_grid_count_hint(12)
            .allocation_params();

        assert_eq!(params.lower, dec!(40000));
        assert_eq!(params.upper, dec!(50000));
        assert_eq!(params.total_notional, dec!(5000));
        assert_eq!(params.grid_count_hint, Some(12));
        assert_eq!(params.direction_bias, DirectionBias::Short);
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("grid_config_test_{}.json", std::process::id()));
        let original = config().with_start_price(dec!(45000)).with_stop_loss_price(dec!(39000));

        original.save_to_file(&path).unwrap();
        let loaded = GridConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, original);
    }
}
