use valuation_core::YearProjection;

use crate::projection::ProjectedYear;

/// End-of-year discount factor; year index 0 is one full period out.
pub fn discount_factor(wacc: f64, year_index: usize) -> f64 {
    1.0 / (1.0 + wacc).powi(year_index as i32 + 1)
}

pub fn present_value(future_value: f64, rate: f64, years: usize) -> f64 {
    future_value / (1.0 + rate).powi(years as i32)
}

/// Gordon growth terminal value.
///
/// Returns `NaN` when `wacc <= terminal_growth`: the formula has no
/// economic meaning there and a finite number would look valid downstream.
pub fn terminal_value(final_year_fcf: f64, terminal_growth: f64, wacc: f64) -> f64 {
    let spread = wacc - terminal_growth;
    if spread.is_nan() || spread <= 0.0 {
        return f64::NAN;
    }
    final_year_fcf * (1.0 + terminal_growth) / spread
}

/// Attach discount factor and present value to each projected year.
pub fn discount(years: Vec<ProjectedYear>, wacc: f64) -> Vec<YearProjection> {
    years
        .into_iter()
        .enumerate()
        .map(|(i, y)| {
            let discount_factor = discount_factor(wacc, i);
            YearProjection {
                year: y.year,
                segment_revenue: y.segment_revenue,
                total_revenue: y.total_revenue,
                fcf_margin: y.fcf_margin,
                fcf: y.fcf,
                discount_factor,
                present_value: y.fcf * discount_factor,
            }
        })
        .collect()
}
