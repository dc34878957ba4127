use std::collections::BTreeMap;

use approx::assert_relative_eq;
use valuation_core::{
    BaseCase, CompanyModel, Component, ComponentKey, RateOverrides, Rating, Segment, TranscriptInsight,
    ValuationError, YearProjection,
};

use crate::aggregation::aggregate;
use crate::discounting::discount_factor;
use crate::engine::DcfEngine;
use crate::sensitivity::{sensitivity_grid, DEFAULT_GROWTH_STEPS, DEFAULT_WACC_STEPS};
use crate::snapshot::{flex_highlights, projection_growth, recommendation_context, valuation_summary};
use crate::{Assumptions, EngineConfig, SensitivityTable};

/// Helper: a component with no description.
fn comp(name: &str, revenue: f64, growth_rate: f64) -> Component {
    Component {
        name: name.to_string(),
        revenue,
        growth_rate,
        description: None,
    }
}

/// Helper: a segment whose display aggregates are irrelevant to the projection.
fn segment(id: &str, name: &str, components: Vec<Component>) -> Segment {
    let revenue = components.iter().map(|c| c.revenue).sum();
    Segment {
        id: id.to_string(),
        name: name.to_string(),
        fy2025_revenue: revenue,
        fy2024_revenue: revenue,
        growth_rate: 0.0,
        operating_margin: 0.0,
        percent_of_total: 0.0,
        components,
        growth_drivers: vec![],
        challenges: vec![],
    }
}

/// Helper: the Microsoft base dataset.
fn msft_segments() -> Vec<Segment> {
    vec![
        segment(
            "productivity",
            "Productivity",
            vec![
                comp("Office Commercial", 60.0, 0.13),
                comp("Office Consumer", 8.0, 0.05),
                comp("LinkedIn", 20.0, 0.10),
                comp("Dynamics 365", 33.0, 0.16),
            ],
        ),
        segment(
            "intelligent-cloud",
            "Intelligent Cloud",
            vec![
                comp("Azure & Cloud Services", 75.0, 0.33),
                comp("Server Products", 20.0, -0.03),
                comp("GitHub", 3.0, 0.25),
                comp("Nuance", 3.0, 0.12),
                comp("Enterprise Services", 5.0, 0.02),
            ],
        ),
        segment(
            "personal-computing",
            "Personal Computing",
            vec![
                comp("Windows OEM", 14.0, 0.00),
                comp("Windows Commercial", 10.0, 0.06),
                comp("Search & News Ads", 13.0, 0.18),
                comp("Gaming", 21.0, 0.05),
                comp("Devices", 6.0, -0.05),
            ],
        ),
    ]
}

/// Helper: the analyst-published FCF series, year 2026 first.
const PUBLISHED_FCF: [f64; 10] = [83.6, 97.2, 113.9, 132.0, 150.7, 166.9, 184.7, 203.6, 223.8, 244.9];

/// Helper: published years carrying only FCF; discounting is left to the engine.
fn published_projections() -> Vec<YearProjection> {
    PUBLISHED_FCF
        .iter()
        .enumerate()
        .map(|(i, &fcf)| YearProjection {
            year: 2026 + i as i32,
            segment_revenue: BTreeMap::new(),
            total_revenue: 0.0,
            fcf_margin: 0.0,
            fcf,
            discount_factor: 0.0,
            present_value: 0.0,
        })
        .collect()
}

fn msft_base_case() -> BaseCase {
    BaseCase {
        wacc: 0.089,
        terminal_growth: 0.035,
        cash: 80.0,
        debt: 75.0,
        shares_outstanding: 7.43,
        fcf_margins: vec![0.255, 0.255, 0.260, 0.265, 0.270, 0.270, 0.270, 0.270, 0.270, 0.270],
        published_fair_value: Some(398.0),
        published_projections: published_projections(),
    }
}

/// Helper: the Microsoft company with market data and one transcript insight.
fn msft_company() -> CompanyModel {
    CompanyModel {
        symbol: "MSFT".to_string(),
        name: "Microsoft Corporation".to_string(),
        description: None,
        segments: msft_segments(),
        base_case: msft_base_case(),
        market_data: serde_json::from_str(
            r#"{"current_price": 494.0, "market_cap": 3670.0, "shares_outstanding": 7.43, "date_updated": "2025-11-19"}"#,
        )
        .unwrap(),
        recommendation: serde_json::from_str(
            r#"{"rating": "HOLD", "target_price": 398.0, "upside": -0.19, "suggested_entry": [420.0, 450.0]}"#,
        )
        .unwrap(),
        transcript_insights: vec![TranscriptInsight {
            segment_id: "intelligent-cloud".to_string(),
            component: "Azure & Cloud Services".to_string(),
            summary: "Azure grew 40% YoY.".to_string(),
            metrics: vec![],
            time_series: vec![],
            source: None,
        }],
    }
}

fn azure() -> ComponentKey {
    ComponentKey::new("intelligent-cloud", "Azure & Cloud Services")
}

#[test]
fn test_base_case_fair_value() {
    let engine = DcfEngine::default();
    let model = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), None, None, &msft_base_case())
        .unwrap();

    assert_eq!(model.projections.len(), 10);
    assert_eq!(model.projections[0].year, 2026);
    assert_eq!(model.projections[9].year, 2035);
    assert_relative_eq!(model.projections[0].total_revenue, 335.53, max_relative = 1e-9);
    assert_relative_eq!(model.projections[0].fcf, 85.56015, max_relative = 1e-9);
    assert_relative_eq!(model.enterprise_value, 5538.8191, max_relative = 1e-6);
    assert_eq!(model.fair_value_per_share, 746.14);
    assert_eq!(model.cash, 80.0);
    assert_eq!(model.debt, 75.0);
    assert_eq!(model.shares_outstanding, 7.43);
}

#[test]
fn test_published_series_reproduces_published_fair_value() {
    let projections: Vec<YearProjection> = published_projections()
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            p.discount_factor = discount_factor(0.089, i);
            p.present_value = p.fcf * p.discount_factor;
            p
        })
        .collect();
    let valuation = aggregate(&projections, 0.089, 0.035, 80.0, 75.0, 7.43).unwrap();
    assert!((valuation.fair_value_per_share - 398.0).abs() <= 0.5);

    let base = msft_base_case();
    let engine = DcfEngine::default();
    let published = engine.published_case(&base).unwrap().unwrap();
    assert_eq!(published.fair_value_per_share, 398.14);
    assert_relative_eq!(published.enterprise_value, valuation.enterprise_value, max_relative = 1e-12);
    assert_relative_eq!(published.projections[0].discount_factor, 1.0 / 1.089);
    assert_eq!(published.projections[9].year, 2035);

    // The segment build-up on the same base case lands far above the published figure
    let rebuilt = engine.base_case(&msft_company()).unwrap();
    assert_eq!(rebuilt.fair_value_per_share, 746.14);
}

#[test]
fn test_published_case_absent_without_series() {
    let mut base = msft_base_case();
    base.published_projections.clear();
    assert!(DcfEngine::default().published_case(&base).unwrap().is_none());

    let mut base = msft_base_case();
    base.terminal_growth = base.wacc;
    assert!(matches!(
        DcfEngine::default().published_case(&base),
        Err(ValuationError::InvalidDiscountParameters { .. })
    ));
}

#[test]
fn test_aggregation_identity_holds_on_engine_output() {
    let engine = DcfEngine::default();
    let model = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), Some(0.095), Some(0.03), &msft_base_case())
        .unwrap();

    let sum_pv: f64 = model.projections.iter().map(|p| p.present_value).sum();
    assert_relative_eq!(model.enterprise_value, sum_pv + model.pv_terminal_value, max_relative = 1e-6);
    assert_relative_eq!(model.equity_value, model.enterprise_value + model.cash - model.debt, max_relative = 1e-9);
    assert_relative_eq!(
        model.fair_value_per_share,
        model.equity_value / model.shares_outstanding,
        epsilon = 0.005
    );

    for p in &model.projections {
        let segment_sum: f64 = p.segment_revenue.values().sum();
        assert_relative_eq!(segment_sum, p.total_revenue, max_relative = 1e-12);
        assert_relative_eq!(p.fcf, p.total_revenue * p.fcf_margin, max_relative = 1e-12);
        assert!(p.discount_factor.is_finite() && p.present_value.is_finite());
    }
}

#[test]
fn test_zero_azure_growth_lowers_every_year_and_fair_value() {
    let engine = DcfEngine::default();
    let base = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), None, None, &msft_base_case())
        .unwrap();

    let mut overrides = RateOverrides::new();
    overrides.insert(azure(), 0.0);
    let flexed = engine
        .recalculate(&msft_segments(), &overrides, None, None, &msft_base_case())
        .unwrap();

    for (b, f) in base.projections.iter().zip(&flexed.projections) {
        assert!(f.total_revenue < b.total_revenue, "year {}", b.year);
        assert_relative_eq!(f.segment_revenue["productivity"], b.segment_revenue["productivity"]);
    }
    assert!(flexed.fair_value_per_share < base.fair_value_per_share);
    assert_eq!(flexed.fair_value_per_share, 304.62);
}

#[test]
fn test_recalculation_is_idempotent() {
    let engine = DcfEngine::default();
    let mut overrides = RateOverrides::new();
    overrides.insert(azure(), 0.25);
    overrides.insert(ComponentKey::new("personal-computing", "Gaming"), 0.08);

    let first = engine
        .recalculate(&msft_segments(), &overrides, Some(0.092), Some(0.031), &msft_base_case())
        .unwrap();
    let second = engine
        .recalculate(&msft_segments(), &overrides.clone(), Some(0.092), Some(0.031), &msft_base_case())
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.enterprise_value.to_bits(), second.enterprise_value.to_bits());
    // Caller's map is untouched
    assert_eq!(overrides.len(), 2);
}

#[test]
fn test_fair_value_falls_as_wacc_rises() {
    let engine = DcfEngine::default();
    let prices: Vec<f64> = [0.07, 0.08, 0.089, 0.10, 0.12]
        .iter()
        .map(|&w| {
            engine
                .recalculate(&msft_segments(), &RateOverrides::new(), Some(w), None, &msft_base_case())
                .unwrap()
                .fair_value_per_share
        })
        .collect();

    assert!(prices.windows(2).all(|w| w[1] < w[0]), "{:?}", prices);
}

#[test]
fn test_fair_value_rises_with_terminal_growth() {
    let engine = DcfEngine::default();
    let prices: Vec<f64> = [0.0, 0.02, 0.035, 0.05, 0.08]
        .iter()
        .map(|&g| {
            engine
                .recalculate(&msft_segments(), &RateOverrides::new(), None, Some(g), &msft_base_case())
                .unwrap()
                .fair_value_per_share
        })
        .collect();

    assert!(prices.windows(2).all(|w| w[1] > w[0]), "{:?}", prices);
}

#[test]
fn test_rejects_terminal_growth_at_or_above_wacc() {
    let engine = DcfEngine::default();

    let err = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), Some(0.05), Some(0.05), &msft_base_case())
        .unwrap_err();
    assert_eq!(
        err,
        ValuationError::InvalidDiscountParameters {
            wacc: 0.05,
            terminal_growth: 0.05
        }
    );

    assert!(engine
        .recalculate(&msft_segments(), &RateOverrides::new(), Some(0.05), Some(0.051), &msft_base_case())
        .is_err());
}

#[test]
fn test_rejects_non_positive_shares() {
    let engine = DcfEngine::default();
    let mut base = msft_base_case();
    base.shares_outstanding = 0.0;

    let err = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), None, None, &base)
        .unwrap_err();
    assert_eq!(err, ValuationError::InvalidShares(0.0));
}

#[test]
fn test_recalculate_from_previous_model() {
    let engine = DcfEngine::default();
    let base = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), None, None, &msft_base_case())
        .unwrap();

    let again = engine
        .recalculate_from_model(&msft_segments(), &RateOverrides::new(), None, None, &base)
        .unwrap();
    assert_eq!(again, base);
}

#[test]
fn test_longer_horizon_uses_fallback_margin() {
    let engine = DcfEngine::new(EngineConfig::new(2026, 12, 0.27).unwrap());
    let model = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), None, None, &msft_base_case())
        .unwrap();

    assert_eq!(model.projections.len(), 12);
    assert_eq!(model.projections[11].year, 2037);
    assert_eq!(model.projections[10].fcf_margin, 0.27);
    assert_eq!(model.projections[11].fcf_margin, 0.27);
}

#[test]
fn test_sensitivity_matches_model_at_its_own_assumptions() {
    let engine = DcfEngine::default();
    let model = engine
        .recalculate(&msft_segments(), &RateOverrides::new(), None, None, &msft_base_case())
        .unwrap();

    let grid = sensitivity_grid(&model, &DEFAULT_WACC_STEPS, &DEFAULT_GROWTH_STEPS);
    assert_eq!(grid.len(), 4);
    assert!(grid.iter().all(|row| row.len() == 4));
    // Row 1 / column 1 is WACC 8.9%, growth 3.5%
    assert_eq!(grid[1][1], model.fair_value_per_share.round());
    assert_eq!(grid[3][0], 572.0);
    assert_eq!(grid[0][3], 1014.0);
}

#[test]
fn test_sensitivity_holds_cash_flows_fixed() {
    let engine = DcfEngine::default();
    let mut overrides = RateOverrides::new();
    overrides.insert(azure(), 0.0);
    let model = engine
        .recalculate(&msft_segments(), &overrides, None, None, &msft_base_case())
        .unwrap();

    let table = SensitivityTable::evaluate(&model, &[model.wacc], &[model.terminal_growth]);
    assert_eq!(table.cell(0, 0), Some(model.fair_value_per_share.round()));
}

#[test]
fn test_company_assumptions_round_trip_through_engine() {
    let engine = DcfEngine::default();
    let company = msft_company();
    let mut assumptions = Assumptions::from_base_case(&company.base_case);

    let base = engine.recalculate_company(&company, &assumptions).unwrap();
    assert_eq!(base, engine.base_case(&company).unwrap());

    assumptions.set_rate(azure(), 0.0);
    let flexed = engine.recalculate_company(&company, &assumptions).unwrap();
    assert_eq!(flexed.fair_value_per_share, 304.62);

    assumptions.reset(&company.base_case);
    assert_eq!(engine.recalculate_company(&company, &assumptions).unwrap(), base);
}

#[test]
fn test_valuation_summary_reflects_overrides() {
    let engine = DcfEngine::default();
    let company = msft_company();
    let model = engine.base_case(&company).unwrap();
    let summary = valuation_summary(&company, &RateOverrides::new(), &model);

    assert_eq!(summary.symbol, "MSFT");
    assert_eq!(summary.fair_value, 746.14);
    assert_relative_eq!(summary.implied_upside, 746.14 / 494.0 - 1.0, max_relative = 1e-12);
    assert_eq!(summary.segment_snapshots.len(), 3);

    let cloud = &summary.segment_snapshots[1];
    assert_eq!(cloud.segment_id, "intelligent-cloud");
    assert_relative_eq!(cloud.fy_revenue, 106.0, max_relative = 1e-12);
    assert_relative_eq!(cloud.projected_revenue, 131.36, max_relative = 1e-9);
    assert_relative_eq!(cloud.implied_growth, 25.36 / 106.0, max_relative = 1e-9);
    assert_eq!(
        cloud.components[0].transcript_summary.as_deref(),
        Some("Azure grew 40% YoY.")
    );

    let drivers: Vec<&str> = summary
        .driver_highlights
        .iter()
        .map(|d| d.component.as_str())
        .collect();
    assert_eq!(
        drivers,
        vec!["Azure & Cloud Services", "Office Commercial", "Dynamics 365", "Gaming", "LinkedIn"]
    );
}

#[test]
fn test_flex_highlights_only_report_moved_components() {
    let company = msft_company();
    assert!(flex_highlights(&company, &RateOverrides::new()).is_empty());

    let mut overrides = RateOverrides::new();
    overrides.insert(azure(), 0.0);
    overrides.insert(ComponentKey::new("personal-computing", "Gaming"), 0.051);
    overrides.insert(ComponentKey::new("productivity", "LinkedIn"), 0.15);

    let flexed = flex_highlights(&company, &overrides);
    assert_eq!(flexed.len(), 2);
    assert_eq!(flexed[0].component, "Azure & Cloud Services");
    assert_relative_eq!(flexed[0].delta, -0.33, max_relative = 1e-12);
    assert_eq!(flexed[0].summary.as_deref(), Some("Azure grew 40% YoY."));
    assert_eq!(flexed[1].component, "LinkedIn");
}

#[test]
fn test_recommendation_context_against_live_model() {
    let engine = DcfEngine::default();
    let company = msft_company();
    let model = engine.base_case(&company).unwrap();
    let ctx = recommendation_context(&company, &model);

    assert_eq!(ctx.rating, Rating::Hold);
    assert_eq!(ctx.target_price, 398.0);
    assert_relative_eq!(ctx.live_upside, 746.14 / 494.0 - 1.0, max_relative = 1e-12);
    assert_relative_eq!(ctx.entry_low_diff, 420.0 / 494.0 - 1.0, max_relative = 1e-12);
    assert_relative_eq!(ctx.entry_high_diff, 450.0 / 494.0 - 1.0, max_relative = 1e-12);
}

#[test]
fn test_projection_growth_rows() {
    let engine = DcfEngine::default();
    let model = engine.base_case(&msft_company()).unwrap();
    let growth = projection_growth(&model);

    assert_eq!(growth.total_revenue.len(), 10);
    assert_eq!(growth.total_revenue[0], None);
    assert_eq!(growth.segment_revenue.len(), 3);
    // Constant margin years: FCF grows with revenue
    assert_relative_eq!(
        growth.fcf[6].unwrap(),
        growth.total_revenue[6].unwrap(),
        max_relative = 1e-9
    );
}
