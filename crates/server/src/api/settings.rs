//! # Settings API
//!
//! Persisted configuration, provider discovery and API key storage.

use std::path::PathBuf;

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use pitchcraft_core::config::{self, ApiKeys, AppConfig, ConfigDefaults};
use pitchcraft_core::error::CrewError;
use pitchcraft_core::models::LlmProvider;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ApiResponse, SharedState};

pub fn settings_routes() -> Router<SharedState> {
    Router::new().route("/api-keys", post(save_api_keys))
}

/// Config as exchanged with the UI; unset fields are left alone on PATCH
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConfigBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_search_results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_max_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crew_file: Option<String>,
}

impl From<AppConfig> for ConfigBody {
    fn from(config: AppConfig) -> Self {
        Self {
            provider: config.provider,
            model: config.model,
            base_url: config.base_url,
            search_enabled: config.search_enabled,
            searxng_url: config.searxng_url,
            max_search_results: config.max_search_results,
            scrape_max_chars: config.scrape_max_chars,
            crew_file: config.crew_file.map(|p| p.display().to_string()),
        }
    }
}

impl From<ConfigBody> for AppConfig {
    fn from(body: ConfigBody) -> Self {
        Self {
            provider: body.provider,
            model: body.model,
            base_url: body.base_url,
            search_enabled: body.search_enabled,
            searxng_url: body.searxng_url,
            max_search_results: body.max_search_results,
            scrape_max_chars: body.scrape_max_chars,
            crew_file: body.crew_file.map(PathBuf::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub config: ConfigBody,
    #[schema(value_type = Object)]
    pub defaults: ConfigDefaults,
}

impl ConfigResponse {
    fn new(config: AppConfig) -> Self {
        Self {
            config: config.into(),
            defaults: ConfigDefaults::default(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub default_model: String,
    pub supports_base_url: bool,
    pub env_var: String,
    /// Whether the key is present in the process environment
    pub configured: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}

fn get_provider_info() -> Vec<ProviderInfo> {
    LlmProvider::all()
        .into_iter()
        .map(|p| ProviderInfo {
            id: p.id().to_string(),
            name: p.display_name().to_string(),
            default_model: p.default_model().to_string(),
            supports_base_url: p.supports_base_url(),
            env_var: p.api_key_env().to_string(),
            configured: std::env::var(p.api_key_env()).is_ok_and(|v| !v.trim().is_empty()),
        })
        .collect()
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApiKeysRequest {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
    pub grok: Option<String>,
    pub deepseek: Option<String>,
    /// Serper web search
    pub serper: Option<String>,
}

impl From<ApiKeysRequest> for ApiKeys {
    fn from(req: ApiKeysRequest) -> Self {
        Self {
            openai: req.openai,
            anthropic: req.anthropic,
            gemini: req.gemini,
            openrouter: req.openrouter,
            grok: req.grok,
            deepseek: req.deepseek,
            serper: req.serper,
        }
    }
}

// === Config Handlers ===

/// Get current configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration and defaults", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse::new(state.config()))
}

/// Update configuration (partial merge)
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body = ConfigBody,
    responses(
        (status = 200, description = "Updated configuration", body = ConfigResponse),
        (status = 500, description = "Configuration could not be saved", body = ApiResponse)
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(updates): Json<ConfigBody>,
) -> Result<Json<ConfigResponse>, (StatusCode, Json<ApiResponse>)> {
    let mut config = state.config();
    config.merge(updates.into());

    if let Err(e) = config.save_to(&state.data_dir) {
        tracing::error!("Failed to save config: {}", e);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse {
                success: false,
                message: format!("Failed to save config: {}", e),
            }),
        ));
    }
    config.apply_to_env();

    Ok(Json(ConfigResponse::new(config)))
}

/// Get available LLM providers
#[utoipa::path(
    get,
    path = "/api/v1/providers",
    tag = "providers",
    responses(
        (status = 200, description = "List of supported LLM providers", body = ProvidersResponse)
    )
)]
pub async fn get_providers() -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: get_provider_info(),
    })
}

/// Save API keys to .pitchcraft/.env
#[utoipa::path(
    post,
    path = "/api/v1/settings/api-keys",
    tag = "config",
    request_body = ApiKeysRequest,
    responses(
        (status = 200, description = "API keys saved", body = ApiResponse),
        (status = 400, description = "A key contains characters that cannot be stored", body = ApiResponse),
        (status = 500, description = "The key file could not be written", body = ApiResponse)
    )
)]
pub async fn save_api_keys(
    State(state): State<SharedState>,
    Json(req): Json<ApiKeysRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    match config::write_env_file(&state.data_dir, &req.into()) {
        Ok(0) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                message: "No API keys provided".to_string(),
            }),
        ),
        Ok(count) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                message: format!("Saved {} API key(s)", count),
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to save API keys: {}", e);
            let status = match e {
                CrewError::Config(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ApiResponse {
                    success: false,
                    message: format!("Failed to save API keys: {}", e),
                }),
            )
        }
    }
}
