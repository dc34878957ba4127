use valuation_core::{
    BaseCase, CompanyModel, DcfModel, RateOverrides, Segment, ValuationResult, YearProjection,
};

use crate::aggregation::{
    aggregate, round_to, validate_discount_parameters, validate_shares, Valuation,
};
use crate::assumptions::Assumptions;
use crate::config::EngineConfig;
use crate::discounting::discount;
use crate::projection::{project, FcfMarginSchedule, ProjectedYear};

/// Balance-sheet inputs carried unchanged into every recalculation
#[derive(Debug, Clone, Copy, PartialEq)]
struct CapitalStructure {
    cash: f64,
    debt: f64,
    shares_outstanding: f64,
}

/// Stateless DCF recalculation engine.
///
/// Holds only its horizon configuration; every call regenerates a complete
/// [`DcfModel`] from its arguments and keeps nothing between calls.
#[derive(Debug, Clone, Default)]
pub struct DcfEngine {
    config: EngineConfig,
}

impl DcfEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recalculate against a dataset base case. `None` for WACC or terminal
    /// growth falls back to the base case value.
    pub fn recalculate(
        &self,
        segments: &[Segment],
        overrides: &RateOverrides,
        wacc: Option<f64>,
        terminal_growth: Option<f64>,
        base: &BaseCase,
    ) -> ValuationResult<DcfModel> {
        let schedule = FcfMarginSchedule::from_base_case(base, self.config.fallback_fcf_margin);
        self.run(
            segments,
            overrides,
            &schedule,
            wacc.unwrap_or(base.wacc),
            terminal_growth.unwrap_or(base.terminal_growth),
            CapitalStructure {
                cash: base.cash,
                debt: base.debt,
                shares_outstanding: base.shares_outstanding,
            },
        )
    }

    /// Recalculate using a previously computed model as the base: its FCF
    /// margins, cash, debt and share count are reused.
    pub fn recalculate_from_model(
        &self,
        segments: &[Segment],
        overrides: &RateOverrides,
        wacc: Option<f64>,
        terminal_growth: Option<f64>,
        base_model: &DcfModel,
    ) -> ValuationResult<DcfModel> {
        let schedule = FcfMarginSchedule::from_model(base_model, self.config.fallback_fcf_margin);
        self.run(
            segments,
            overrides,
            &schedule,
            wacc.unwrap_or(base_model.wacc),
            terminal_growth.unwrap_or(base_model.terminal_growth),
            CapitalStructure {
                cash: base_model.cash,
                debt: base_model.debt,
                shares_outstanding: base_model.shares_outstanding,
            },
        )
    }

    /// Engine-computed base case: no overrides, dataset WACC and growth
    pub fn base_case(&self, company: &CompanyModel) -> ValuationResult<DcfModel> {
        self.recalculate(
            &company.segments,
            &RateOverrides::new(),
            None,
            None,
            &company.base_case,
        )
    }

    /// Price the dataset's published projection series at the base-case WACC
    /// and terminal growth. `None` when the dataset ships no series.
    ///
    /// Published FCFs are taken as given and re-discounted end-of-year.
    pub fn published_case(&self, base: &BaseCase) -> ValuationResult<Option<DcfModel>> {
        if base.published_projections.is_empty() {
            return Ok(None);
        }

        let years = base
            .published_projections
            .iter()
            .map(|p| ProjectedYear {
                year: p.year,
                segment_revenue: p.segment_revenue.clone(),
                total_revenue: p.total_revenue,
                fcf_margin: p.fcf_margin,
                fcf: p.fcf,
            })
            .collect();
        let projections = discount(years, base.wacc);
        let capital = CapitalStructure {
            cash: base.cash,
            debt: base.debt,
            shares_outstanding: base.shares_outstanding,
        };
        let valuation = aggregate(
            &projections,
            base.wacc,
            base.terminal_growth,
            capital.cash,
            capital.debt,
            capital.shares_outstanding,
        )?;

        Ok(Some(assemble(
            projections,
            base.wacc,
            base.terminal_growth,
            capital,
            valuation,
        )))
    }

    pub fn recalculate_company(
        &self,
        company: &CompanyModel,
        assumptions: &Assumptions,
    ) -> ValuationResult<DcfModel> {
        self.recalculate(
            &company.segments,
            &assumptions.overrides,
            Some(assumptions.wacc),
            Some(assumptions.terminal_growth),
            &company.base_case,
        )
    }

    fn run(
        &self,
        segments: &[Segment],
        overrides: &RateOverrides,
        schedule: &FcfMarginSchedule,
        wacc: f64,
        terminal_growth: f64,
        capital: CapitalStructure,
    ) -> ValuationResult<DcfModel> {
        // Reject before projecting so no partial snapshot is ever built
        if let Err(e) = validate_discount_parameters(wacc, terminal_growth)
            .and_then(|_| validate_shares(capital.shares_outstanding))
        {
            tracing::warn!(wacc, terminal_growth, error = %e, "Rejected DCF inputs");
            return Err(e);
        }

        let projected = project(
            segments,
            overrides,
            schedule,
            self.config.start_year,
            self.config.years_to_project,
        );
        let projections = discount(projected, wacc);

        let valuation = aggregate(
            &projections,
            wacc,
            terminal_growth,
            capital.cash,
            capital.debt,
            capital.shares_outstanding,
        )?;

        tracing::debug!(
            overrides = overrides.len(),
            wacc,
            terminal_growth,
            enterprise_value = valuation.enterprise_value,
            fair_value = valuation.fair_value_per_share,
            "DCF recalculated"
        );

        Ok(assemble(projections, wacc, terminal_growth, capital, valuation))
    }
}

fn assemble(
    projections: Vec<YearProjection>,
    wacc: f64,
    terminal_growth: f64,
    capital: CapitalStructure,
    valuation: Valuation,
) -> DcfModel {
    DcfModel {
        projections,
        wacc,
        terminal_growth,
        terminal_value: valuation.terminal_value,
        pv_terminal_value: valuation.pv_terminal_value,
        enterprise_value: valuation.enterprise_value,
        cash: capital.cash,
        debt: capital.debt,
        equity_value: valuation.equity_value,
        shares_outstanding: capital.shares_outstanding,
        fair_value_per_share: round_to(valuation.fair_value_per_share, 2),
    }
}
