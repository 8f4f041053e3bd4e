//! Grid allocation - price levels and per-level order sizes
//!
//! The allocator walks the grid count down from a seed until every level clears
//! the instrument's minimum order size. The range is split into a lower and an
//! upper half; the half favoured by the direction bias gets 1.1x the per-level
//! notional of the other, solved in closed form so the halves sum to the target.

use std::sync::Arc;

use log::{debug, info};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::errors::{GridError, GridResult};
use super::quantizer::{truncate_quantity, PriceQuantizer};
use super::types::{DirectionBias, Instrument, PriceLevel};

/// Notional ratio between the favoured and the other half
pub const ASYMMETRY_MULTIPLIER: Decimal = dec!(1.1);

/// Default seed spacing as a fraction of the upper bound
pub const DEFAULT_SPACING_FRACTION: Decimal = dec!(0.006);

/// Inputs to one allocation pass
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationParams {
    pub lower: Decimal,
    pub upper: Decimal,
    /// Starting grid count; derived from `spacing_fraction` when absent
    pub grid_count_hint: Option<u32>,
    pub total_notional: Decimal,
    pub direction_bias: DirectionBias,
    pub spacing_fraction: Decimal,
}

impl AllocationParams {
    pub fn new(lower: Decimal, upper: Decimal, total_notional: Decimal, direction_bias: DirectionBias) -> Self {
        Self {
            lower,
            upper,
            grid_count_hint: None,
            total_notional,
            direction_bias,
            spacing_fraction: DEFAULT_SPACING_FRACTION,
        }
    }

    /// Builder: seed the refinement loop with an explicit grid count
    pub fn with_grid_count_hint(mut self, count: u32) -> Self {
        self.grid_count_hint = Some(count);
        self
    }

    /// Builder: set the seed spacing fraction
    pub fn with_spacing_fraction(mut self, fraction: Decimal) -> Self {
        self.spacing_fraction = fraction;
        self
    }

    fn validate(&self) -> GridResult<()> {
        if self.upper <= self.lower {
            return Err(GridError::InvalidRange {
                lower: self.lower,
                upper: self.upper,
            });
        }
        if self.lower <= Decimal::ZERO {
            return Err(GridError::InvalidConfig(format!(
                "lower price must be positive, got {}",
                self.lower
            )));
        }
        if self.total_notional <= Decimal::ZERO {
            return Err(GridError::InvalidConfig(format!(
                "total notional must be positive, got {}",
                self.total_notional
            )));
        }
        if self.spacing_fraction <= Decimal::ZERO {
            return Err(GridError::InvalidConfig(format!(
                "spacing fraction must be positive, got {}",
                self.spacing_fraction
            )));
        }
        if self.grid_count_hint == Some(0) {
            return Err(GridError::InvalidConfig("grid count hint must be at least 1".into()));
        }
        Ok(())
    }
}

/// Immutable result of one allocation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Levels in ascending price order
    pub levels: Vec<PriceLevel>,
    pub step: Decimal,
    pub grid_count: u32,
    pub direction_bias: DirectionBias,
    pub lower: Decimal,
    pub upper: Decimal,
    /// Summed quantity of the lower half
    pub lower_total_volume: Decimal,
    /// Summed quantity of the upper half
    pub upper_total_volume: Decimal,
}

impl GridSpec {
    /// Sum of price * quantity across all levels
    pub fn allocated_notional(&self) -> Decimal {
        self.levels.iter().map(PriceLevel::notional).sum()
    }

    pub fn in_range(&self, price: Decimal) -> bool {
        price >= self.lower && price <= self.upper
    }

    pub fn is_degenerate(&self) -> bool {
        self.upper <= self.lower || self.levels.is_empty()
    }

    /// Levels strictly below `price`, ascending
    pub fn levels_below(&self, price: Decimal) -> &[PriceLevel] {
        let end = self.levels.partition_point(|l| l.price < price);
        &self.levels[..end]
    }

    /// Levels strictly above `price`, ascending
    pub fn levels_above(&self, price: Decimal) -> &[PriceLevel] {
        let start = self.levels.partition_point(|l| l.price <= price);
        &self.levels[start..]
    }

    /// Exact quantity lookup
    pub fn quantity_at(&self, price: Decimal) -> Option<Decimal> {
        self.levels
            .binary_search_by(|l| l.price.cmp(&price))
            .ok()
            .map(|idx| self.levels[idx].quantity)
    }

    /// Level whose price is closest to `price`; ties go to the lower level
    pub fn nearest_level(&self, price: Decimal) -> GridResult<&PriceLevel> {
        let idx = self.levels.partition_point(|l| l.price < price);
        let above = self.levels.get(idx);
        let below = idx.checked_sub(1).and_then(|i| self.levels.get(i));

        match (below, above) {
            (Some(b), Some(a)) => {
                if (a.price - price).abs() < (price - b.price).abs() {
                    Ok(a)
                } else {
                    Ok(b)
                }
            }
            (Some(b), None) => Ok(b),
            (None, Some(a)) => Ok(a),
            (None, None) => Err(GridError::PriceNotFound(price)),
        }
    }
}

/// Computes `GridSpec`s under one instrument's constraints
#[derive(Debug, Clone)]
pub struct GridAllocator {
    quantizer: PriceQuantizer,
    min_volume: Decimal,
    volume_decimals: u32,
}

impl GridAllocator {
    pub fn new(instrument: &Instrument) -> GridResult<Self> {
        instrument.validate()?;
        Ok(Self {
            quantizer: PriceQuantizer::new(instrument.price_tick)?,
            min_volume: instrument.min_volume,
            volume_decimals: instrument.volume_decimals(),
        })
    }

    /// Run the full allocation: seed, shrink until feasible, rescale
    pub fn allocate(&self, params: &AllocationParams) -> GridResult<Arc<GridSpec>> {
        params.validate()?;

        let base = self.quantizer.ceil(params.lower);
        if base >= params.upper {
            return Err(GridError::InfeasibleAllocation(format!(
                "no tick-aligned price inside [{}, {}]",
                params.lower, params.upper
            )));
        }

        let mut count = self.seed_count(params);
        debug!("Allocation seed grid count: {}", count);

        while count > 0 {
            let raw_step = (params.upper - params.lower) / Decimal::from(count);
            let step = self.quantizer.quantize(raw_step);
            if step.is_zero() {
                debug!("Grid count {} finer than tick, shrinking", count);
                count -= 1;
                continue;
            }

            if let Some(spec) = self.try_allocate(params, count, step, base) {
                check_levels(&spec, &self.quantizer)?;
                log_summary(&spec, params.total_notional);
                return Ok(Arc::new(spec));
            }
            count -= 1;
        }

        Err(GridError::InfeasibleAllocation(format!(
            "notional {} cannot meet minimum order size {} in [{}, {}]",
            params.total_notional, self.min_volume, params.lower, params.upper
        )))
    }

    fn seed_count(&self, params: &AllocationParams) -> u32 {
        let range = params.upper - params.lower;
        let max_count = (range / self.quantizer.tick_size())
            .floor()
            .to_u32()
            .unwrap_or(u32::MAX)
            .max(1);

        // Every level needs at least min_volume * lower of notional
        let notional_cap = params
            .total_notional
            .checked_div(self.min_volume * params.lower)
            .and_then(|n| n.floor().to_u32())
            .unwrap_or(u32::MAX);

        let seed = match params.grid_count_hint {
            Some(hint) => hint,
            None => (range / (params.upper * params.spacing_fraction))
                .floor()
                .to_u32()
                .unwrap_or(u32::MAX)
                .max(1),
        };
        let capped = seed.min(max_count).min(notional_cap);
        if capped < seed {
            info!(
                "Grid count seed {} clamped to {} (tick cap {}, notional cap {})",
                seed, capped, max_count, notional_cap
            );
        }
        capped
    }

    /// Allocate at a fixed count; `None` when a level misses the minimum size
    fn try_allocate(&self, params: &AllocationParams, count: u32, step: Decimal, base: Decimal) -> Option<GridSpec> {
        let lower_count = count / 2;
        let upper_count = count - lower_count;
        let (a_lower, a_upper) = split_notional(
            params.total_notional,
            lower_count,
            upper_count,
            params.direction_bias,
        );

        let mut levels = Vec::with_capacity(count as usize);
        for i in 0..count {
            let price = self.quantizer.quantize(base + step * Decimal::from(i));
            let notional = if i < lower_count { a_lower } else { a_upper };
            let quantity = truncate_quantity(notional / price, self.volume_decimals);
            if quantity < self.min_volume {
                debug!(
                    "Grid count {}: level {} at {} sized {} below minimum {}",
                    count, i, price, quantity, self.min_volume
                );
                return None;
            }
            levels.push(PriceLevel::new(price, quantity));
        }

        let allocated: Decimal = levels.iter().map(PriceLevel::notional).sum();
        if allocated > params.total_notional {
            let scale = params.total_notional / allocated;
            debug!(
                "Allocated {} exceeds target {}, scaling quantities by {}",
                allocated, params.total_notional, scale
            );
            rescale_levels(&mut levels, scale, self.volume_decimals);
            if levels.iter().any(|l| l.quantity < self.min_volume) {
                return None;
            }
        }

        let lower_count = lower_count as usize;
        let lower_total_volume = levels[..lower_count].iter().map(|l| l.quantity).sum();
        let upper_total_volume = levels[lower_count..].iter().map(|l| l.quantity).sum();

        Some(GridSpec {
            levels,
            step,
            grid_count: count,
            direction_bias: params.direction_bias,
            lower: params.lower,
            upper: params.upper,
            lower_total_volume,
            upper_total_volume,
        })
    }
}

/// Per-level notional for the lower and upper half
///
/// Solves `lower_count * a_lower + upper_count * a_upper = total` with the
/// favoured half fixed at `ASYMMETRY_MULTIPLIER` times the other.
pub fn split_notional(
    total: Decimal,
    lower_count: u32,
    upper_count: u32,
    bias: DirectionBias,
) -> (Decimal, Decimal) {
    let lc = Decimal::from(lower_count);
    let uc = Decimal::from(upper_count);
    match bias {
        DirectionBias::Long => {
            let a_upper = total / (ASYMMETRY_MULTIPLIER * lc + uc);
            (a_upper * ASYMMETRY_MULTIPLIER, a_upper)
        }
        DirectionBias::Short => {
            let a_lower = total / (lc + ASYMMETRY_MULTIPLIER * uc);
            (a_lower, a_lower * ASYMMETRY_MULTIPLIER)
        }
    }
}

fn rescale_levels(levels: &mut [PriceLevel], scale: Decimal, decimals: u32) {
    for level in levels.iter_mut() {
        level.quantity = truncate_quantity(level.quantity * scale, decimals);
    }
}

fn check_levels(spec: &GridSpec, quantizer: &PriceQuantizer) -> GridResult<()> {
    for pair in spec.levels.windows(2) {
        if pair[0].price >= pair[1].price {
            return Err(GridError::DuplicateLevelPrice(pair[1].price));
        }
    }
    if let Some(level) = spec.levels.iter().find(|l| !quantizer.is_aligned(l.price)) {
        return Err(GridError::InfeasibleAllocation(format!(
            "level price {} is off the {} tick",
            level.price,
            quantizer.tick_size()
        )));
    }
    if let Some(level) = spec.levels.iter().find(|l| !spec.in_range(l.price)) {
        return Err(GridError::InfeasibleAllocation(format!(
            "level price {} outside [{}, {}]",
            level.price, spec.lower, spec.upper
        )));
    }
    Ok(())
}

fn log_summary(spec: &GridSpec, target: Decimal) {
    info!(
        "Calculated grid: range=[{}, {}], grid_count={}, step={}, mode={}, allocated={}/{}",
        spec.lower,
        spec.upper,
        spec.grid_count,
        spec.step,
        spec.direction_bias,
        spec.allocated_notional(),
        target
    );
    info!(
        "Grid volumes: lower half {}, upper half {}",
        spec.lower_total_volume, spec.upper_total_volume
    );
    debug!("Grid levels: {:?}", spec.levels);
}
