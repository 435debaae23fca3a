use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asa_core::analytics::{self, PeerRentEstimator, ScenarioInput, ScenarioResult, YieldScanOptions};
use asa_core::analytics::scenario::ScenarioRequest;
use asa_core::config::Settings;
use asa_core::domain::portfolio::{
    PortfolioRollup, PortfolioSnapshot, PropertySummary, TenantRisk, YieldOpportunity,
};
use asa_core::error::{AnalyticsError, UpstreamError};
use asa_core::ingest::source::{self, Dataset, FsRecordSource, RecordSource};
use asa_core::llm::{NarrativeClient, NarrativeContext};
use asa_core::predict::http::HttpPredictionClient;
use asa_core::predict::{
    ChurnFeatures, ChurnPrediction, PredictionClient, RentEstimate, RentFeatures,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let predictor: Option<Arc<dyn PredictionClient>> =
        match HttpPredictionClient::from_settings(&settings) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "prediction service not configured; /predict routes disabled and yield scans use the peer rent model");
                None
            }
        };
    let narrator = asa_core::llm::client_from_settings(&settings)?;
    let source: Arc<dyn RecordSource> = Arc::new(FsRecordSource::new(settings.data_dir.clone()));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let state = AppState {
        settings: Arc::new(settings),
        source,
        predictor,
        narrator,
    };

    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/dashboard", get(get_dashboard))
        .route("/tenants", get(get_tenants))
        .route("/properties", get(get_properties))
        .route("/portfolio/rollup", get(get_rollup))
        .route("/properties/:id/yield", get(get_yield))
        .route("/analytics/scenario", post(run_scenario))
        .route("/predict/rent", post(predict_rent))
        .route("/predict/churn", post(predict_churn))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    source: Arc<dyn RecordSource>,
    predictor: Option<Arc<dyn PredictionClient>>,
    narrator: Arc<dyn NarrativeClient>,
}

impl AppState {
    async fn dataset(&self) -> Result<Dataset, ApiError> {
        source::load_dataset(self.source.as_ref(), self.settings.record_format)
            .await
            .map_err(ApiError::Internal)
    }

    fn yield_options(&self) -> YieldScanOptions {
        YieldScanOptions {
            min_annual_gain: self.settings.yield_min_annual_gain.unwrap_or(0.0),
            limit: self.settings.yield_max_results,
        }
    }
}

#[derive(Debug)]
enum ApiError {
    Unavailable(&'static str),
    InvalidInput(String),
    Upstream(anyhow::Error),
    Internal(anyhow::Error),
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::InvalidInput(msg) => Self::InvalidInput(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unavailable(what) => (StatusCode::SERVICE_UNAVAILABLE, format!("{what} is not configured")),
            Self::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Upstream(e) => {
                sentry_anyhow::capture_anyhow(&e);
                if let Some(diag) = e.downcast_ref::<UpstreamError>() {
                    tracing::error!(service = ?diag.service, stage = diag.stage, raw = ?diag.raw_output, "upstream service failed");
                }
                tracing::error!(error = %e, "upstream request failed");
                (StatusCode::BAD_GATEWAY, format!("{e:#}"))
            }
            Self::Internal(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to load portfolio data".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<PortfolioSnapshot>, ApiError> {
    let ds = state.dataset().await?;
    Ok(Json(analytics::summarize(&ds.units, &ds.tenants)))
}

async fn get_tenants(State(state): State<AppState>) -> Result<Json<Vec<TenantRisk>>, ApiError> {
    let ds = state.dataset().await?;
    Ok(Json(analytics::assess_tenants(&ds.units, &ds.tenants)))
}

async fn get_properties(
    State(state): State<AppState>,
) -> Result<Json<Vec<PropertySummary>>, ApiError> {
    let ds = state.dataset().await?;
    Ok(Json(analytics::summarize_properties(
        &ds.properties,
        &ds.units,
        &ds.tenants,
    )))
}

async fn get_rollup(State(state): State<AppState>) -> Result<Json<PortfolioRollup>, ApiError> {
    let ds = state.dataset().await?;
    let properties = analytics::summarize_properties(&ds.properties, &ds.units, &ds.tenants);
    Ok(Json(analytics::roll_up(&properties)))
}

#[derive(Debug, Default, Deserialize)]
struct YieldQuery {
    #[serde(default)]
    narrate: bool,
}

#[derive(Debug, Serialize)]
struct YieldResponse {
    property_id: String,
    estimate_source: &'static str,
    opportunities: Vec<YieldOpportunity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    narrative: Option<String>,
}

async fn get_yield(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Query(query): Query<YieldQuery>,
) -> Result<Json<YieldResponse>, ApiError> {
    let ds = state.dataset().await?;
    let options = state.yield_options();

    let (estimate_source, opportunities) = match &state.predictor {
        Some(predictor) => {
            let estimates = asa_core::predict::collect_rent_estimates(
                predictor.as_ref(),
                &property_id,
                &ds.units,
                &ds.properties,
            )
            .await
            .map_err(ApiError::Upstream)?;
            (
                "prediction_service",
                analytics::find_opportunities(&property_id, &ds.units, &estimates, &options),
            )
        }
        None => {
            let peers = PeerRentEstimator::from_units(&ds.units);
            (
                "peer_model",
                analytics::find_opportunities(&property_id, &ds.units, &peers, &options),
            )
        }
    };

    let narrative = if query.narrate && !opportunities.is_empty() {
        let ctx = NarrativeContext::YieldScan {
            property_id: property_id.clone(),
            opportunities: opportunities.clone(),
        };
        Some(
            state
                .narrator
                .narrate(&ctx)
                .await
                .map_err(ApiError::Upstream)?,
        )
    } else {
        None
    };

    Ok(Json(YieldResponse {
        property_id,
        estimate_source,
        opportunities,
        narrative,
    }))
}

async fn run_scenario(
    State(state): State<AppState>,
    Json(req): Json<ScenarioRequest>,
) -> Result<Json<ScenarioResult>, ApiError> {
    let input = ScenarioInput::try_from(req)?;
    let ds = state.dataset().await?;
    let baseline = analytics::summarize(&ds.units, &ds.tenants);
    let delta = analytics::simulate(&baseline, &input);

    let ctx = NarrativeContext::Scenario {
        rent_change_pct: input.rent_change_pct(),
        occupancy_change_pct: input.occupancy_change_pct(),
        revenue_delta: delta,
    };
    let narrative = state
        .narrator
        .narrate(&ctx)
        .await
        .map_err(ApiError::Upstream)?;

    tracing::info!(
        rent_change_pct = input.rent_change_pct(),
        occupancy_change_pct = input.occupancy_change_pct(),
        revenue_delta = delta,
        "scenario simulated"
    );

    Ok(Json(ScenarioResult::new(&baseline, &input, narrative)))
}

async fn predict_rent(
    State(state): State<AppState>,
    Json(features): Json<RentFeatures>,
) -> Result<Json<RentEstimate>, ApiError> {
    let Some(predictor) = &state.predictor else {
        return Err(ApiError::Unavailable("prediction service"));
    };
    let estimate = predictor
        .predict_rent(&features)
        .await
        .map_err(ApiError::Upstream)?;
    Ok(Json(estimate))
}

async fn predict_churn(
    State(state): State<AppState>,
    Json(features): Json<ChurnFeatures>,
) -> Result<Json<ChurnPrediction>, ApiError> {
    let Some(predictor) = &state.predictor else {
        return Err(ApiError::Unavailable("prediction service"));
    };
    let prediction = predictor
        .predict_churn(&features)
        .await
        .map_err(ApiError::Upstream)?;
    Ok(Json(prediction))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
