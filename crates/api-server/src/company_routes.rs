//! Company catalog routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use dcf_engine::{recommendation_context, RecommendationContext, SensitivityTable};
use serde::Serialize;
use valuation_core::{CompanyModel, CompanyOption, DcfModel};

use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize)]
pub struct CompanyListResponse {
    pub default_symbol: String,
    pub companies: Vec<CompanyOption>,
}

/// Base dataset together with its engine-computed base case
#[derive(Serialize)]
pub struct CompanyDetailResponse {
    pub company: CompanyModel,
    pub base_case: DcfModel,
    /// The published projection series priced at base-case WACC and growth
    pub published_case: Option<DcfModel>,
    pub sensitivity: SensitivityTable,
    pub recommendation: RecommendationContext,
}

pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/api/companies", get(list_companies))
        .route("/api/companies/:symbol", get(get_company))
}

async fn list_companies(State(state): State<AppState>) -> Json<ApiResponse<CompanyListResponse>> {
    Json(ApiResponse::success(CompanyListResponse {
        default_symbol: state.registry.default_symbol().to_string(),
        companies: state.registry.options(),
    }))
}

async fn get_company(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<CompanyDetailResponse>>, AppError> {
    let company = state.registry.require(&symbol)?;
    let base_case = state.engine.base_case(&company)?;
    let published_case = state.engine.published_case(&company.base_case)?;

    if let Some(published) = &published_case {
        tracing::debug!(
            symbol = %company.symbol,
            published = published.fair_value_per_share,
            computed = base_case.fair_value_per_share,
            "Serving engine-computed base case"
        );
    }

    Ok(Json(ApiResponse::success(CompanyDetailResponse {
        sensitivity: SensitivityTable::with_default_steps(&base_case),
        recommendation: recommendation_context(&company, &base_case),
        published_case,
        company: CompanyModel::clone(&company),
        base_case,
    })))
}
