use serde::{Deserialize, Serialize};
use valuation_core::{ValuationError, ValuationResult, YearProjection};

use crate::discounting::{present_value, terminal_value};

/// Enterprise-to-equity bridge output. `fair_value_per_share` is unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub sum_pv_fcf: f64,
    pub terminal_value: f64,
    pub pv_terminal_value: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub fair_value_per_share: f64,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Reject discount parameters the Gordon growth model cannot price.
pub fn validate_discount_parameters(wacc: f64, terminal_growth: f64) -> ValuationResult<()> {
    if !wacc.is_finite() || !terminal_growth.is_finite() || wacc <= -1.0 || wacc <= terminal_growth {
        return Err(ValuationError::InvalidDiscountParameters {
            wacc,
            terminal_growth,
        });
    }
    Ok(())
}

pub fn validate_shares(shares_outstanding: f64) -> ValuationResult<()> {
    if !shares_outstanding.is_finite() || shares_outstanding <= 0.0 {
        return Err(ValuationError::InvalidShares(shares_outstanding));
    }
    Ok(())
}

/// Value a discounted cash-flow stream: terminal value on the final year's
/// FCF, discounted over the full horizon, then cash and debt to equity.
#[allow(clippy::too_many_arguments)]
pub fn equity_bridge(
    sum_pv_fcf: f64,
    final_year_fcf: f64,
    horizon_years: usize,
    wacc: f64,
    terminal_growth: f64,
    cash: f64,
    debt: f64,
    shares_outstanding: f64,
) -> ValuationResult<Valuation> {
    validate_discount_parameters(wacc, terminal_growth)?;
    validate_shares(shares_outstanding)?;

    let terminal_value = terminal_value(final_year_fcf, terminal_growth, wacc);
    let pv_terminal_value = present_value(terminal_value, wacc, horizon_years);
    let enterprise_value = sum_pv_fcf + pv_terminal_value;
    let equity_value = enterprise_value + cash - debt;
    let fair_value_per_share = equity_value / shares_outstanding;

    let valuation = Valuation {
        sum_pv_fcf,
        terminal_value,
        pv_terminal_value,
        enterprise_value,
        equity_value,
        fair_value_per_share,
    };

    for (field, value) in [
        ("sum_pv_fcf", valuation.sum_pv_fcf),
        ("terminal_value", valuation.terminal_value),
        ("pv_terminal_value", valuation.pv_terminal_value),
        ("enterprise_value", valuation.enterprise_value),
        ("equity_value", valuation.equity_value),
        ("fair_value_per_share", valuation.fair_value_per_share),
    ] {
        if !value.is_finite() {
            return Err(ValuationError::NonFiniteResult(format!("{} = {}", field, value)));
        }
    }

    Ok(valuation)
}

/// Sum the already-discounted projections and run the equity bridge.
pub fn aggregate(
    projections: &[YearProjection],
    wacc: f64,
    terminal_growth: f64,
    cash: f64,
    debt: f64,
    shares_outstanding: f64,
) -> ValuationResult<Valuation> {
    let final_year = projections.last().ok_or(ValuationError::EmptyProjection)?;
    let sum_pv_fcf: f64 = projections.iter().map(|p| p.present_value).sum();

    equity_bridge(
        sum_pv_fcf,
        final_year.fcf,
        projections.len(),
        wacc,
        terminal_growth,
        cash,
        debt,
        shares_outstanding,
    )
}
