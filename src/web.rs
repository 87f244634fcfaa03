use crate::api_errors::AppError;
use crate::config::ServiceConfig;
use crate::importance::ContributingFactor;
use crate::inference::{InferenceEngine, PredictionResult, DISCLAIMER};
use crate::schema::{FeatureSchema, RawInput};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared handler state. `engine` is `None` when artifacts failed to load;
/// the server still answers health checks in that case.
#[derive(Clone)]
pub struct AppState {
    engine: Option<Arc<InferenceEngine>>,
}

impl AppState {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine: Some(Arc::new(engine)),
        }
    }

    pub fn without_model() -> Self {
        Self { engine: None }
    }

    fn engine(&self) -> Result<&InferenceEngine, AppError> {
        self.engine
            .as_deref()
            .ok_or_else(|| AppError::service_unavailable("Model not loaded"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub features_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
    pub feature_descriptions: BTreeMap<String, String>,
}

impl FeaturesResponse {
    pub fn from_schema(schema: &FeatureSchema) -> Self {
        Self {
            features: schema.names().to_vec(),
            feature_descriptions: schema.descriptions(),
        }
    }
}

/// Wire form of a prediction
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub stress_level: usize,
    pub stress_label: &'static str,
    /// Percentage rounded to one decimal place
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub contributing_factors: Vec<ContributingFactor>,
    pub disclaimer: &'static str,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            stress_level: result.class_index,
            stress_label: result.label(),
            confidence: (result.confidence * 1000.0).round() / 10.0,
            recommendations: result.recommendations,
            contributing_factors: result.contributing_factors,
            disclaimer: DISCLAIMER,
        }
    }
}

/// Build the HTTP router: `/health`, `/predict`, `/features`
pub fn build_router(state: AppState, config: &ServiceConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/features", get(features))
        .layer(cors_layer(&config.cors_allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // tower-http refuses "*" inside an explicit list
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{o}'");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let features_count = state.engine.as_ref().map_or(0, |e| e.schema().len());
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.engine.is_some(),
        features_count,
    })
}

async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, AppError> {
    let engine = state.engine()?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::bad_request("No data provided"));
    }
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Invalid JSON body: {e}")))?;

    let input = RawInput::from_json(value)?;
    match engine.infer(&input) {
        Ok(result) => {
            info!(
                "Prediction: {} ({:.3})",
                result.label(),
                result.confidence
            );
            Ok(Json(result.into()))
        }
        Err(e) if e.is_client_error() => {
            debug!("Rejected prediction request: {e}");
            Err(e.into())
        }
        Err(e) => {
            error!("Inference failed: {e}");
            Err(e.into())
        }
    }
}

async fn features(State(state): State<AppState>) -> Result<Json<FeaturesResponse>, AppError> {
    Ok(Json(FeaturesResponse::from_schema(state.engine()?.schema())))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &ServiceConfig, state: AppState) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let app = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
