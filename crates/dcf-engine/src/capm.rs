/// WACC from a CAPM cost of equity and an after-tax cost of debt.
///
/// Capital weights come from the debt-to-equity ratio:
/// `E/V = 1 / (1 + D/E)`, `D/V = (D/E) / (1 + D/E)`.
pub fn weighted_average_cost_of_capital(
    risk_free_rate: f64,
    beta: f64,
    market_risk_premium: f64,
    cost_of_debt: f64,
    tax_rate: f64,
    debt_to_equity: f64,
) -> f64 {
    let cost_of_equity = risk_free_rate + beta * market_risk_premium;
    let weight_of_equity = 1.0 / (1.0 + debt_to_equity);
    let weight_of_debt = debt_to_equity / (1.0 + debt_to_equity);
    let after_tax_cost_of_debt = cost_of_debt * (1.0 - tax_rate);

    cost_of_equity * weight_of_equity + after_tax_cost_of_debt * weight_of_debt
}
