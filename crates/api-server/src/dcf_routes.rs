//! DCF scenario routes
//!
//! Every request carries the full scenario (component overrides plus optional
//! WACC and terminal growth); the server keeps no per-user state.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use dcf_engine::{
    flex_highlights, projection_growth, recommendation_context, valuation_summary, FlexHighlight,
    ProjectionGrowth, RecommendationContext, SensitivityTable, ValuationBand, ValuationSummary,
    DEFAULT_GROWTH_STEPS, DEFAULT_WACC_STEPS,
};
use futures_util::TryStreamExt;
use narrative_client::{build_prompt, NarrativeError};
use serde::{Deserialize, Serialize};
use valuation_core::{CompanyModel, DcfModel, RateOverrides};

use crate::request_id::RequestId;
use crate::{ApiResponse, AppError, AppState};

/// Upper bound on either sensitivity axis
pub const MAX_SENSITIVITY_STEPS: usize = 25;

/// Scenario inputs shared by every DCF route
#[derive(Debug, Default, Deserialize)]
pub struct ScenarioRequest {
    #[serde(default)]
    pub overrides: RateOverrides,
    pub wacc: Option<f64>,
    pub terminal_growth: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SensitivityRequest {
    #[serde(flatten)]
    pub scenario: ScenarioRequest,
    pub wacc_steps: Option<Vec<f64>>,
    pub growth_steps: Option<Vec<f64>>,
}

#[derive(Serialize)]
pub struct RecalculateResponse {
    #[serde(flatten)]
    pub model: DcfModel,
    pub yoy_growth: ProjectionGrowth,
    pub recommendation: RecommendationContext,
}

#[derive(Serialize)]
pub struct SensitivityResponse {
    #[serde(flatten)]
    pub table: SensitivityTable,
    pub current_price: f64,
    pub bands: Vec<Vec<ValuationBand>>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: ValuationSummary,
    pub flex_highlights: Vec<FlexHighlight>,
    pub recommendation: RecommendationContext,
}

pub fn dcf_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dcf/:symbol/recalculate", post(recalculate))
        .route("/api/dcf/:symbol/sensitivity", post(sensitivity))
        .route("/api/dcf/:symbol/summary", post(summary))
        .route("/api/dcf/:symbol/narrative", post(narrative))
}

/// Overrides must name components of this company
fn check_overrides(company: &CompanyModel, overrides: &RateOverrides) -> Result<(), AppError> {
    for (key, rate) in overrides.iter() {
        if company.component(key).is_none() {
            return Err(AppError::bad_request(format!(
                "Unknown component for {}: {}",
                company.symbol, key
            )));
        }
        if !rate.is_finite() {
            return Err(AppError::bad_request(format!("Rate for {} is not finite", key)));
        }
    }
    Ok(())
}

fn check_steps(name: &str, steps: &[f64]) -> Result<(), AppError> {
    if steps.is_empty() || steps.len() > MAX_SENSITIVITY_STEPS {
        return Err(AppError::bad_request(format!(
            "{} must have between 1 and {} entries",
            name, MAX_SENSITIVITY_STEPS
        )));
    }
    if steps.iter().any(|s| !s.is_finite()) {
        return Err(AppError::bad_request(format!("{} must be finite", name)));
    }
    Ok(())
}

/// Resolve the company and price the scenario
fn price_scenario(
    state: &AppState,
    symbol: &str,
    scenario: &ScenarioRequest,
) -> Result<(Arc<CompanyModel>, DcfModel), AppError> {
    let company = state.registry.require(symbol)?;
    check_overrides(&company, &scenario.overrides)?;

    let model = state.engine.recalculate(
        &company.segments,
        &scenario.overrides,
        scenario.wacc,
        scenario.terminal_growth,
        &company.base_case,
    )?;

    tracing::debug!(
        symbol = %company.symbol,
        overrides = scenario.overrides.len(),
        fair_value = model.fair_value_per_share,
        "Priced scenario"
    );
    Ok((company, model))
}

async fn recalculate(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(scenario): Json<ScenarioRequest>,
) -> Result<Json<ApiResponse<RecalculateResponse>>, AppError> {
    let (company, model) = price_scenario(&state, &symbol, &scenario)?;

    Ok(Json(ApiResponse::success(RecalculateResponse {
        yoy_growth: projection_growth(&model),
        recommendation: recommendation_context(&company, &model),
        model,
    })))
}

async fn sensitivity(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(request): Json<SensitivityRequest>,
) -> Result<Json<ApiResponse<SensitivityResponse>>, AppError> {
    let wacc_steps = request.wacc_steps.unwrap_or_else(|| DEFAULT_WACC_STEPS.to_vec());
    let growth_steps = request
        .growth_steps
        .unwrap_or_else(|| DEFAULT_GROWTH_STEPS.to_vec());
    check_steps("wacc_steps", &wacc_steps)?;
    check_steps("growth_steps", &growth_steps)?;

    let (company, model) = price_scenario(&state, &symbol, &request.scenario)?;
    let table = SensitivityTable::evaluate(&model, &wacc_steps, &growth_steps);
    let current_price = company.market_data.current_price;

    Ok(Json(ApiResponse::success(SensitivityResponse {
        bands: table.bands(current_price),
        current_price,
        table,
    })))
}

async fn summary(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(scenario): Json<ScenarioRequest>,
) -> Result<Json<ApiResponse<SummaryResponse>>, AppError> {
    let (company, model) = price_scenario(&state, &symbol, &scenario)?;

    Ok(Json(ApiResponse::success(SummaryResponse {
        summary: valuation_summary(&company, &scenario.overrides, &model),
        flex_highlights: flex_highlights(&company, &scenario.overrides),
        recommendation: recommendation_context(&company, &model),
    })))
}

/// Streams commentary as `text/plain`. Errors before the first byte are
/// regular JSON error responses; a mid-stream failure aborts the body.
async fn narrative(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Extension(request_id): Extension<RequestId>,
    Json(scenario): Json<ScenarioRequest>,
) -> Result<Response, AppError> {
    let narrator = state.narrator.clone().ok_or_else(|| {
        AppError::from(NarrativeError::NotConfigured(
            "no narrative backend configured".to_string(),
        ))
    })?;

    let (company, model) = price_scenario(&state, &symbol, &scenario)?;
    let summary = valuation_summary(&company, &scenario.overrides, &model);
    let flexed = flex_highlights(&company, &scenario.overrides);
    let prompt = build_prompt(&summary, &flexed);

    tracing::info!(
        symbol = %company.symbol,
        backend = narrator.backend_name(),
        request_id = %request_id.as_str(),
        "Starting narrative stream"
    );

    let request_id = request_id.0;
    let stream = narrator.generate(&prompt).await?.inspect_err(move |e| {
        tracing::error!(error = %e, request_id = %request_id, "Narrative stream failed");
    });

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
