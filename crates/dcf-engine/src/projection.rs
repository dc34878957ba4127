use std::collections::BTreeMap;

use valuation_core::{BaseCase, DcfModel, RateOverrides, Segment};

use crate::rates::resolve_rate;

/// FCF margin per projection year, looked up by year index with an explicit
/// fallback for any index the schedule does not cover.
#[derive(Debug, Clone, PartialEq)]
pub struct FcfMarginSchedule {
    margins: Vec<f64>,
    fallback: f64,
}

impl FcfMarginSchedule {
    pub fn new(margins: Vec<f64>, fallback: f64) -> Self {
        Self { margins, fallback }
    }

    pub fn from_base_case(base: &BaseCase, fallback: f64) -> Self {
        Self::new(base.fcf_margins.clone(), fallback)
    }

    /// Reuse the margins of a previously computed model
    pub fn from_model(model: &DcfModel, fallback: f64) -> Self {
        Self::new(model.projections.iter().map(|p| p.fcf_margin).collect(), fallback)
    }

    pub fn margin_for(&self, year_index: usize) -> f64 {
        self.margins.get(year_index).copied().unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    /// Number of years with an explicit margin
    pub fn len(&self) -> usize {
        self.margins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.margins.is_empty()
    }
}

/// A projected year before discounting
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedYear {
    pub year: i32,
    pub segment_revenue: BTreeMap<String, f64>,
    pub total_revenue: f64,
    pub fcf_margin: f64,
    pub fcf: f64,
}

/// Project every component forward `years` times at its effective rate.
///
/// Growth compounds on the previous projected year, so a component with
/// revenue `R` and rate `g` reaches `R * (1 + g)^n` in year `n`.
pub fn project(
    segments: &[Segment],
    overrides: &RateOverrides,
    schedule: &FcfMarginSchedule,
    start_year: i32,
    years: usize,
) -> Vec<ProjectedYear> {
    // Effective rates are fixed over the horizon; resolve them once
    let rates: Vec<Vec<f64>> = segments
        .iter()
        .map(|segment| {
            segment
                .components
                .iter()
                .map(|c| resolve_rate(overrides, &segment.id, c))
                .collect()
        })
        .collect();

    let mut running: Vec<Vec<f64>> = segments
        .iter()
        .map(|segment| segment.components.iter().map(|c| c.revenue).collect())
        .collect();

    if years > schedule.len() {
        tracing::debug!(
            scheduled = schedule.len(),
            years,
            fallback = schedule.fallback(),
            "FCF margin schedule shorter than horizon, using fallback margin"
        );
    }

    let mut projected = Vec::with_capacity(years);

    for i in 0..years {
        let mut segment_revenue = BTreeMap::new();
        let mut total_revenue = 0.0;

        for (s, segment) in segments.iter().enumerate() {
            let mut segment_sum = 0.0;
            for (c, revenue) in running[s].iter_mut().enumerate() {
                *revenue *= 1.0 + rates[s][c];
                segment_sum += *revenue;
            }
            *segment_revenue.entry(segment.id.clone()).or_insert(0.0) += segment_sum;
            total_revenue += segment_sum;
        }

        let fcf_margin = schedule.margin_for(i);
        projected.push(ProjectedYear {
            year: start_year + i as i32,
            segment_revenue,
            total_revenue,
            fcf_margin,
            fcf: total_revenue * fcf_margin,
        });
    }

    projected
}
