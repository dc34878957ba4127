//! DCF recalculation engine.
//!
//! Pure, synchronous and stateless: rate resolution, ten-year projection,
//! discounting, the enterprise-to-equity bridge and the WACC / terminal-growth
//! sensitivity grid. Every call is a deterministic function of its inputs.

pub mod aggregation;
pub mod assumptions;
pub mod capm;
pub mod config;
pub mod discounting;
pub mod engine;
pub mod projection;
pub mod rates;
pub mod sensitivity;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use aggregation::{aggregate, equity_bridge, round_to, Valuation};
pub use assumptions::Assumptions;
pub use capm::weighted_average_cost_of_capital;
pub use config::EngineConfig;
pub use discounting::{discount, discount_factor, present_value, terminal_value};
pub use engine::DcfEngine;
pub use projection::{project, FcfMarginSchedule, ProjectedYear};
pub use rates::resolve_rate;
pub use sensitivity::{
    sensitivity_grid, SensitivityTable, ValuationBand, DEFAULT_GROWTH_STEPS, DEFAULT_WACC_STEPS,
};
pub use snapshot::{
    driver_highlights, flex_highlights, projection_growth, recommendation_context,
    segment_snapshots, valuation_summary, yoy_growth, ComponentSnapshot, DriverHighlight,
    FlexHighlight, ProjectionGrowth, RecommendationContext, SegmentSnapshot, ValuationSummary,
};
