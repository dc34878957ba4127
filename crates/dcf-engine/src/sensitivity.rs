use serde::{Deserialize, Serialize};
use valuation_core::DcfModel;

use crate::aggregation::equity_bridge;
use crate::discounting::discount_factor;

pub const DEFAULT_WACC_STEPS: [f64; 4] = [0.084, 0.089, 0.094, 0.099];
pub const DEFAULT_GROWTH_STEPS: [f64; 4] = [0.030, 0.035, 0.040, 0.045];

/// Fair value per share for every `(wacc, growth)` pair, holding the model's
/// FCF series, cash, debt and share count fixed.
///
/// `grid[r][c]` is priced at `wacc_steps[r]` and `growth_steps[c]`, rounded
/// to whole currency units. Pairs the model cannot price (for example
/// `wacc <= growth`) come back as `NaN`; the remaining cells are still
/// evaluated.
pub fn sensitivity_grid(model: &DcfModel, wacc_steps: &[f64], growth_steps: &[f64]) -> Vec<Vec<f64>> {
    let final_fcf = model.final_year().map(|p| p.fcf);
    let horizon = model.projections.len();
    let mut invalid_cells = 0usize;

    let grid: Vec<Vec<f64>> = wacc_steps
        .iter()
        .map(|&wacc| {
            let sum_pv_fcf: f64 = model
                .fcf_series()
                .enumerate()
                .map(|(i, fcf)| fcf * discount_factor(wacc, i))
                .sum();

            growth_steps
                .iter()
                .map(|&growth| {
                    let price = final_fcf.and_then(|fcf| {
                        equity_bridge(
                            sum_pv_fcf,
                            fcf,
                            horizon,
                            wacc,
                            growth,
                            model.cash,
                            model.debt,
                            model.shares_outstanding,
                        )
                        .ok()
                    });
                    match price {
                        Some(v) => v.fair_value_per_share.round(),
                        None => {
                            invalid_cells += 1;
                            f64::NAN
                        }
                    }
                })
                .collect()
        })
        .collect();

    if invalid_cells > 0 {
        tracing::debug!(invalid_cells, "Sensitivity grid contains unpriceable cells");
    }

    grid
}

/// Sensitivity grid together with its axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub wacc_steps: Vec<f64>,
    pub growth_steps: Vec<f64>,
    /// Rows follow `wacc_steps`, columns follow `growth_steps`. Unpriceable
    /// cells are `NaN` (serialized as `null`).
    pub values: Vec<Vec<f64>>,
}

impl SensitivityTable {
    pub fn evaluate(model: &DcfModel, wacc_steps: &[f64], growth_steps: &[f64]) -> Self {
        Self {
            wacc_steps: wacc_steps.to_vec(),
            growth_steps: growth_steps.to_vec(),
            values: sensitivity_grid(model, wacc_steps, growth_steps),
        }
    }

    pub fn with_default_steps(model: &DcfModel) -> Self {
        Self::evaluate(model, &DEFAULT_WACC_STEPS, &DEFAULT_GROWTH_STEPS)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied()
    }

    /// Cells classified against the current market price
    pub fn bands(&self, current_price: f64) -> Vec<Vec<ValuationBand>> {
        self.values
            .iter()
            .map(|row| row.iter().map(|&v| ValuationBand::classify(v, current_price)).collect())
            .collect()
    }
}

/// Where an implied price sits relative to the market price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationBand {
    /// More than 10% above the market price
    Undervalued,
    Fair,
    /// More than 10% below the market price
    Overvalued,
    Undefined,
}

impl ValuationBand {
    pub fn classify(implied_price: f64, current_price: f64) -> Self {
        if !implied_price.is_finite() || !current_price.is_finite() || current_price <= 0.0 {
            return ValuationBand::Undefined;
        }
        if implied_price > current_price * 1.1 {
            ValuationBand::Undervalued
        } else if implied_price < current_price * 0.9 {
            ValuationBand::Overvalued
        } else {
            ValuationBand::Fair
        }
    }
}
