//! Projection snapshot summary.
//!
//! The narrative layer has no access to engine internals, so everything it
//! needs (segment mix, applied vs. base growth, the largest drivers) is
//! derived here from a [`DcfModel`] plus the company's base data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use valuation_core::{CompanyModel, DcfModel, RateOverrides, Rating, Segment};

use crate::rates::resolve_rate;

/// Components whose rate moved less than this are not "flexed"
pub const FLEX_DELTA_THRESHOLD: f64 = 0.002;
pub const FLEX_HIGHLIGHT_LIMIT: usize = 4;
pub const DRIVER_HIGHLIGHT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub name: String,
    pub base_revenue: f64,
    pub base_growth: f64,
    pub applied_growth: f64,
    pub delta_from_base: f64,
    #[serde(default)]
    pub transcript_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub segment_id: String,
    pub name: String,
    pub percent_of_total: f64,
    /// Sum of component base revenues
    pub fy_revenue: f64,
    /// First projected year's revenue for the segment
    pub projected_revenue: f64,
    /// `(projected_revenue - fy_revenue) / fy_revenue`, 0 when the base is 0
    pub implied_growth: f64,
    pub components: Vec<ComponentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverHighlight {
    pub segment: String,
    pub component: String,
    pub base_revenue: f64,
    pub applied_growth: f64,
    pub delta_from_base: f64,
    /// One-year forward revenue at the applied rate
    pub revenue_contribution: f64,
    #[serde(default)]
    pub transcript_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexHighlight {
    pub segment: String,
    pub component: String,
    pub base_rate: f64,
    pub rate: f64,
    pub delta: f64,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Everything the narrative collaborator receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub symbol: String,
    pub company_name: String,
    pub fair_value: f64,
    pub current_price: f64,
    pub enterprise_value: f64,
    pub wacc: f64,
    pub terminal_growth: f64,
    /// `(fair_value - current_price) / current_price`
    pub implied_upside: f64,
    pub segment_snapshots: Vec<SegmentSnapshot>,
    pub driver_highlights: Vec<DriverHighlight>,
}

fn component_snapshots(company: &CompanyModel, segment: &Segment, overrides: &RateOverrides) -> Vec<ComponentSnapshot> {
    segment
        .components
        .iter()
        .map(|c| {
            let applied_growth = resolve_rate(overrides, &segment.id, c);
            ComponentSnapshot {
                name: c.name.clone(),
                base_revenue: c.revenue,
                base_growth: c.growth_rate,
                applied_growth,
                delta_from_base: applied_growth - c.growth_rate,
                transcript_summary: company
                    .insight_for(&segment.key_for(c))
                    .map(|i| i.summary.clone()),
            }
        })
        .collect()
}

pub fn segment_snapshots(company: &CompanyModel, overrides: &RateOverrides, model: &DcfModel) -> Vec<SegmentSnapshot> {
    let first_year = model.projections.first();

    company
        .segments
        .iter()
        .map(|segment| {
            let components = component_snapshots(company, segment, overrides);
            let fy_revenue: f64 = components.iter().map(|c| c.base_revenue).sum();
            let projected_revenue = first_year
                .and_then(|p| p.segment_revenue.get(&segment.id).copied())
                .unwrap_or_else(|| {
                    components
                        .iter()
                        .map(|c| c.base_revenue * (1.0 + c.applied_growth))
                        .sum()
                });
            let implied_growth = if fy_revenue > 0.0 {
                (projected_revenue - fy_revenue) / fy_revenue
            } else {
                0.0
            };

            SegmentSnapshot {
                segment_id: segment.id.clone(),
                name: segment.name.clone(),
                percent_of_total: segment.percent_of_total,
                fy_revenue,
                projected_revenue,
                implied_growth,
                components,
            }
        })
        .collect()
}

/// Largest components by one-year forward revenue
pub fn driver_highlights(snapshots: &[SegmentSnapshot], limit: usize) -> Vec<DriverHighlight> {
    let mut drivers: Vec<DriverHighlight> = snapshots
        .iter()
        .flat_map(|segment| {
            segment.components.iter().map(move |c| DriverHighlight {
                segment: segment.name.clone(),
                component: c.name.clone(),
                base_revenue: c.base_revenue,
                applied_growth: c.applied_growth,
                delta_from_base: c.delta_from_base,
                revenue_contribution: c.base_revenue * (1.0 + c.applied_growth),
                transcript_summary: c.transcript_summary.clone(),
            })
        })
        .collect();

    drivers.sort_by(|a, b| b.revenue_contribution.total_cmp(&a.revenue_contribution));
    drivers.truncate(limit);
    drivers
}

/// Components the user has moved away from base, largest move first
pub fn flex_highlights(company: &CompanyModel, overrides: &RateOverrides) -> Vec<FlexHighlight> {
    let mut flexed: Vec<FlexHighlight> = company
        .segments
        .iter()
        .flat_map(|segment| {
            segment.components.iter().filter_map(move |c| {
                let rate = resolve_rate(overrides, &segment.id, c);
                let delta = rate - c.growth_rate;
                (delta.abs() >= FLEX_DELTA_THRESHOLD).then(|| FlexHighlight {
                    segment: segment.name.clone(),
                    component: c.name.clone(),
                    base_rate: c.growth_rate,
                    rate,
                    delta,
                    summary: company.insight_for(&segment.key_for(c)).map(|i| i.summary.clone()),
                })
            })
        })
        .collect();

    flexed.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));
    flexed.truncate(FLEX_HIGHLIGHT_LIMIT);
    flexed
}

pub fn valuation_summary(company: &CompanyModel, overrides: &RateOverrides, model: &DcfModel) -> ValuationSummary {
    let current_price = company.market_data.current_price;
    let implied_upside = if current_price > 0.0 {
        (model.fair_value_per_share - current_price) / current_price
    } else {
        0.0
    };
    let segment_snapshots = segment_snapshots(company, overrides, model);
    let driver_highlights = driver_highlights(&segment_snapshots, DRIVER_HIGHLIGHT_LIMIT);

    ValuationSummary {
        symbol: company.symbol.clone(),
        company_name: company.name.clone(),
        fair_value: model.fair_value_per_share,
        current_price,
        enterprise_value: model.enterprise_value,
        wacc: model.wacc,
        terminal_growth: model.terminal_growth,
        implied_upside,
        segment_snapshots,
        driver_highlights,
    }
}

/// Published recommendation set against the live model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub rating: Rating,
    pub target_price: f64,
    pub published_upside: f64,
    /// `fair_value / current_price - 1`
    pub live_upside: f64,
    pub entry_low: f64,
    pub entry_high: f64,
    /// Entry range ends relative to the current price
    pub entry_low_diff: f64,
    pub entry_high_diff: f64,
}

fn relative_to(value: f64, price: f64) -> f64 {
    if price > 0.0 {
        value / price - 1.0
    } else {
        0.0
    }
}

pub fn recommendation_context(company: &CompanyModel, model: &DcfModel) -> RecommendationContext {
    let rec = &company.recommendation;
    let price = company.market_data.current_price;
    let (entry_low, entry_high) = rec.suggested_entry;

    RecommendationContext {
        rating: rec.rating,
        target_price: rec.target_price,
        published_upside: rec.upside,
        live_upside: relative_to(model.fair_value_per_share, price),
        entry_low,
        entry_high,
        entry_low_diff: relative_to(entry_low, price),
        entry_high_diff: relative_to(entry_high, price),
    }
}

/// Period-over-period growth; the first period and any period following a
/// zero value have none.
pub fn yoy_growth(values: &[f64]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(values.windows(2).map(|w| {
            if w[0] != 0.0 {
                Some((w[1] - w[0]) / w[0])
            } else {
                None
            }
        }))
        .take(values.len())
        .collect()
}

/// YoY growth rows for the projection table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionGrowth {
    pub segment_revenue: BTreeMap<String, Vec<Option<f64>>>,
    pub total_revenue: Vec<Option<f64>>,
    pub fcf: Vec<Option<f64>>,
}

pub fn projection_growth(model: &DcfModel) -> ProjectionGrowth {
    let mut segment_ids: Vec<&String> = model
        .projections
        .iter()
        .flat_map(|p| p.segment_revenue.keys())
        .collect();
    segment_ids.sort();
    segment_ids.dedup();

    let segment_revenue = segment_ids
        .into_iter()
        .map(|id| {
            let series: Vec<f64> = model
                .projections
                .iter()
                .map(|p| p.segment_revenue.get(id).copied().unwrap_or(0.0))
                .collect();
            (id.clone(), yoy_growth(&series))
        })
        .collect();

    let totals: Vec<f64> = model.projections.iter().map(|p| p.total_revenue).collect();
    let fcfs: Vec<f64> = model.fcf_series().collect();

    ProjectionGrowth {
        segment_revenue,
        total_revenue: yoy_growth(&totals),
        fcf: yoy_growth(&fcfs),
    }
}
