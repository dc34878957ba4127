//! HTTP service for the DCF workbench.
//!
//! Exposes the company catalog, scenario recalculation, the sensitivity grid,
//! the narrative summary input and the streamed commentary. Request handling
//! is stateless: every request carries its own overrides and WACC / terminal
//! growth, and only the immutable company datasets are shared.

pub mod company_routes;
pub mod dcf_routes;
pub mod request_id;
pub mod security_headers;


use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use company_data::{CompanyRegistry, DatasetError};
use dcf_engine::DcfEngine;
use narrative_client::{AnthropicClient, NarrativeConfig, NarrativeError, NarrativeGenerator};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use valuation_core::ValuationError;

use crate::request_id::request_id_middleware;
use crate::security_headers::security_headers_middleware;

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CompanyRegistry>,
    pub engine: DcfEngine,
    /// `None` when no narrative backend is configured
    pub narrator: Option<Arc<dyn NarrativeGenerator>>,
}

impl AppState {
    pub fn new(
        registry: CompanyRegistry,
        engine: DcfEngine,
        narrator: Option<Arc<dyn NarrativeGenerator>>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            engine,
            narrator,
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to answer with
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "Request failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.error, "Request rejected");
        }
        (
            self.status,
            Json(ApiResponse::<()>::error(self.error.to_string())),
        )
            .into_response()
    }
}

impl From<ValuationError> for AppError {
    fn from(e: ValuationError) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, e.into())
    }
}

impl From<DatasetError> for AppError {
    fn from(e: DatasetError) -> Self {
        let status = match e {
            DatasetError::UnknownSymbol(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, e.into())
    }
}

impl From<NarrativeError> for AppError {
    fn from(e: NarrativeError) -> Self {
        let status = match e {
            NarrativeError::NotConfigured(_) | NarrativeError::ServiceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, e.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

/// Server settings, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of extra company datasets
    pub data_dir: Option<PathBuf>,
    pub default_symbol: String,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: None,
            default_symbol: "MSFT".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("DCF_PORT") {
            Ok(v) => v.parse().with_context(|| format!("Invalid DCF_PORT: {}", v))?,
            Err(_) => defaults.port,
        };
        let timeout_secs = match std::env::var("DCF_REQUEST_TIMEOUT_SECS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("Invalid DCF_REQUEST_TIMEOUT_SECS: {}", v))?,
            Err(_) => defaults.request_timeout.as_secs(),
        };

        Ok(Self {
            host: std::env::var("DCF_HOST").unwrap_or(defaults.host),
            port,
            data_dir: std::env::var("DCF_DATA_DIR")
                .ok()
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            default_symbol: std::env::var("DCF_DEFAULT_SYMBOL").unwrap_or(defaults.default_symbol),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: std::net::IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid DCF_HOST: {}", self.host))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    companies: usize,
    narrative_backend: Option<&'static str>,
    timestamp: String,
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        companies: state.registry.len(),
        narrative_backend: state.narrator.as_ref().map(|n| n.backend_name()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(health))
        .merge(company_routes::company_routes())
        .merge(dcf_routes::dcf_routes())
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,dcf_engine=info,narrative_client=info".into()),
        )
        .init();
}

fn narrator_from_config(
    config: NarrativeConfig,
) -> anyhow::Result<Option<Arc<dyn NarrativeGenerator>>> {
    if !config.is_configured() {
        tracing::warn!("ANTHROPIC_API_KEY is not set; narrative backend disabled");
        return Ok(None);
    }

    let client = AnthropicClient::new(config).context("Failed to create narrative client")?;
    tracing::info!(model = %client.model(), "Narrative backend enabled");
    let narrator: Arc<dyn NarrativeGenerator> = Arc::new(client);
    Ok(Some(narrator))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let registry = CompanyRegistry::load(config.data_dir.as_deref(), Some(&config.default_symbol))
        .context("Failed to load company datasets")?;
    let state = AppState::new(registry, DcfEngine::default(), narrator_from_config(NarrativeConfig::default())?);

    let addr = config.socket_addr()?;
    let app = build_router(state, config.request_timeout);

    tracing::info!("Starting DCF API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
