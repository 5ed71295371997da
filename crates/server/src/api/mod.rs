//! # Pitchcraft API
//!
//! Router, shared state, OpenAPI document and the embedded form.

pub mod runs;
pub mod settings;
pub mod strategy;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use pitchcraft_core::config::AppConfig;
use pitchcraft_core::crew::{CrewEvent, RunProgress};
use pitchcraft_core::history::RunStore;
use pitchcraft_core::llm::LlmClient;
use rust_embed::RustEmbed;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use utoipa::{OpenApi, ToSchema};

/// Embedded form
#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// What the server knows about the current (or last) run
#[derive(Debug, Default, Clone)]
pub struct RunState {
    pub progress: RunProgress,
    pub active_agent: Option<String>,
    pub active_task: Option<String>,
    pub run_id: Option<String>,
}

/// Reads the variables API keys live in
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Application state
pub struct AppState {
    pub run: RwLock<RunState>,
    pub event_tx: broadcast::Sender<CrewEvent>,
    pub runs: RunStore,
    /// Holds `config.json` and `.env`
    pub data_dir: PathBuf,
    /// Client used instead of the configured provider
    pub llm: Option<Arc<dyn LlmClient>>,
    /// Credential lookup, the process environment unless replaced
    pub env: EnvLookup,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(data_dir: PathBuf, runs: RunStore) -> Self {
        let (event_tx, _) = broadcast::channel::<CrewEvent>(100);
        Self {
            run: RwLock::new(RunState::default()),
            event_tx,
            runs,
            data_dir,
            llm: None,
            env: Arc::new(|name: &str| std::env::var(name).ok()),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Current config, falling back to defaults when the file is unreadable
    pub fn config(&self) -> AppConfig {
        AppConfig::load_from(&self.data_dir).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable config: {}", e);
            AppConfig::default()
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pitchcraft API",
        version = "1.0.0",
        description = "Generate marketing strategies with a crew of LLM agents"
    ),
    paths(
        strategy::get_status,
        strategy::create_strategy,
        strategy::get_crew,
        settings::get_config,
        settings::update_config,
        settings::get_providers,
        settings::save_api_keys,
        runs::list_runs,
        runs::get_run
    ),
    components(
        schemas(
            ApiResponse,
            strategy::CrewStatus,
            strategy::StrategyBody,
            strategy::StrategyResponse,
            strategy::TaskResult,
            settings::ConfigBody,
            settings::ConfigResponse,
            settings::ProviderInfo,
            settings::ProvidersResponse,
            settings::ApiKeysRequest,
            runs::RunSummary
        )
    ),
    tags(
        (name = "strategy", description = "Strategy generation"),
        (name = "config", description = "Configuration management"),
        (name = "providers", description = "LLM provider discovery"),
        (name = "runs", description = "Run history")
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => ([(header::CONTENT_TYPE, "application/json")], spec).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// === Static File Serving ===

async fn serve_static(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    if let Some(file) = Assets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return (
            [(header::CONTENT_TYPE, mime.as_ref().to_string())],
            Body::from(file.data.to_vec()),
        )
            .into_response();
    }

    // SPA fallback
    if let Some(file) = Assets::get("index.html") {
        return (
            [(header::CONTENT_TYPE, "text/html".to_string())],
            Body::from(file.data.to_vec()),
        )
            .into_response();
    }

    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Build the full application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(strategy::strategy_routes())
        .nest("/api/v1/settings", settings::settings_routes())
        .nest("/api/v1/runs", runs::run_routes())
        .route(
            "/api/v1/config",
            get(settings::get_config).patch(settings::update_config),
        )
        .route("/api/v1/providers", get(settings::get_providers))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .fallback(get(serve_static))
        .with_state(state)
}
