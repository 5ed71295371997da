//! # Strategy API
//!
//! Run the crew on a form submission, report progress, stream events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use pitchcraft_core::crew::{CrewEvent, CrewEventKind, CrewOutput, CrewSpec};
use pitchcraft_core::error::CrewError;
use pitchcraft_core::llm::{LlmClient, RadkitClient};
use pitchcraft_core::marketing::{generate_strategy, preflight_with, StrategyRequest};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use utoipa::ToSchema;

use super::SharedState;

pub fn strategy_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/strategy", post(create_strategy))
        .route("/api/v1/events", get(events))
        .route("/api/v1/crew", get(get_crew))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CrewStatus {
    /// idle, running, complete or failed
    pub stage: String,
    pub completed: usize,
    pub total: usize,
    pub fraction: f32,
    /// Index of the task being worked on
    pub current_task: Option<usize>,
    pub active_agent: Option<String>,
    pub active_task: Option<String>,
    pub run_id: Option<String>,
}

/// The two form fields
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct StrategyBody {
    /// e.g. "crewai.com"
    pub customer_domain: String,
    pub project_description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResult {
    pub task_id: String,
    pub agent_role: String,
    pub output: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StrategyResponse {
    pub success: bool,
    pub run_id: Option<String>,
    /// The final task's output
    pub output: Option<String>,
    pub tasks: Vec<TaskResult>,
    pub error: Option<String>,
}

impl StrategyResponse {
    fn completed(run_id: Option<String>, output: &CrewOutput) -> Self {
        Self {
            success: true,
            run_id,
            output: Some(output.final_output().to_string()),
            tasks: output
                .tasks
                .iter()
                .map(|t| TaskResult {
                    task_id: t.task_id.clone(),
                    agent_role: t.agent_role.clone(),
                    output: t.raw.clone(),
                })
                .collect(),
            error: None,
        }
    }

    fn failed(run_id: Option<String>, message: String) -> Self {
        Self {
            success: false,
            run_id,
            output: None,
            tasks: Vec::new(),
            error: Some(message),
        }
    }
}

fn error_status(e: &CrewError) -> StatusCode {
    if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn reject(e: CrewError) -> (StatusCode, Json<StrategyResponse>) {
    tracing::warn!("Rejected strategy request: {}", e);
    (
        error_status(&e),
        Json(StrategyResponse::failed(None, e.user_message())),
    )
}

// === Handlers ===

/// Get run status
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "strategy",
    responses(
        (status = 200, description = "Current run status", body = CrewStatus)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<CrewStatus> {
    let run = state.run.read().await;
    Json(CrewStatus {
        stage: run.progress.stage.as_str().to_string(),
        completed: run.progress.completed,
        total: run.progress.total,
        fraction: run.progress.fraction(),
        current_task: run.progress.current_task(),
        active_agent: run.active_agent.clone(),
        active_task: run.active_task.clone(),
        run_id: run.run_id.clone(),
    })
}

/// Generate a marketing strategy
///
/// Runs the whole crew before answering.
#[utoipa::path(
    post,
    path = "/api/v1/strategy",
    tag = "strategy",
    request_body = StrategyBody,
    responses(
        (status = 200, description = "Strategy generated", body = StrategyResponse),
        (status = 400, description = "Missing API key or form field", body = StrategyResponse),
        (status = 409, description = "A run is already in progress", body = StrategyResponse),
        (status = 500, description = "The crew failed", body = StrategyResponse)
    )
)]
pub async fn create_strategy(
    State(state): State<SharedState>,
    Json(body): Json<StrategyBody>,
) -> (StatusCode, Json<StrategyResponse>) {
    let config = state.config();
    let request = StrategyRequest::new(body.customer_domain, body.project_description);

    if let Err(e) = preflight_with(config.provider(), config.search_enabled(), &request, |name| {
        (state.env)(name)
    }) {
        return reject(e);
    }

    let spec = match config.crew_spec() {
        Ok(spec) if config.search_enabled() => spec,
        Ok(spec) => spec.without_tools(),
        Err(e) => return reject(e),
    };
    let client: Arc<dyn LlmClient> = match &state.llm {
        Some(client) => Arc::clone(client),
        None => Arc::new(RadkitClient::new(config.model_config())),
    };
    config.apply_to_env();

    {
        let mut run = state.run.write().await;
        if run.progress.is_running() {
            return (
                StatusCode::CONFLICT,
                Json(StrategyResponse::failed(
                    run.run_id.clone(),
                    "A marketing strategy is already being generated.".to_string(),
                )),
            );
        }
        run.progress.start(spec.tasks.len());
        run.active_agent = None;
        run.active_task = None;
        run.run_id = None;
    }

    // Detached so a dropped connection cannot leave the run marked as running
    let handle = tokio::spawn(execute_run(Arc::clone(&state), client, spec, request));
    match handle.await {
        Ok((status, response)) => (status, Json(response)),
        Err(e) => {
            tracing::error!("Strategy run panicked: {}", e);
            let mut run = state.run.write().await;
            run.progress.fail();
            run.active_agent = None;
            run.active_task = None;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StrategyResponse::failed(
                    run.run_id.clone(),
                    format!(
                        "An error occurred while generating the marketing strategy: {}",
                        e
                    ),
                )),
            )
        }
    }
}

/// Record, run and finalize one claimed run
async fn execute_run(
    state: SharedState,
    client: Arc<dyn LlmClient>,
    spec: CrewSpec,
    request: StrategyRequest,
) -> (StatusCode, StrategyResponse) {
    let run_id = match state.runs.create(&request) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("Failed to record run: {}", e);
            None
        }
    };
    state.run.write().await.run_id = run_id.clone();

    let result = run_crew(&state, client.as_ref(), spec, &request).await;

    {
        let mut run = state.run.write().await;
        if result.is_err() {
            run.progress.fail();
        }
        run.active_agent = None;
        run.active_task = None;
    }

    match result {
        Ok(output) => {
            if let Some(id) = &run_id {
                if let Err(e) = state.runs.complete(id, output.final_output()) {
                    tracing::warn!("Failed to record run result: {}", e);
                }
            }
            tracing::info!(run_id = ?run_id, "Strategy generated");
            (
                StatusCode::OK,
                StrategyResponse::completed(run_id, &output),
            )
        }
        Err(e) => {
            tracing::error!(run_id = ?run_id, "Strategy generation failed: {}", e);
            let message = e.user_message();
            if let Some(id) = &run_id {
                if let Err(e) = state.runs.fail(id, &message) {
                    tracing::warn!("Failed to record run failure: {}", e);
                }
            }
            (error_status(&e), StrategyResponse::failed(run_id, message))
        }
    }
}

/// Run the crew, mirroring its events into the run state and the broadcast channel
async fn run_crew(
    state: &SharedState,
    client: &dyn LlmClient,
    spec: CrewSpec,
    request: &StrategyRequest,
) -> Result<CrewOutput, CrewError> {
    let (event_tx, mut event_rx) = mpsc::channel::<CrewEvent>(100);

    let bridge_state = Arc::clone(state);
    let bridge = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            {
                let mut run = bridge_state.run.write().await;
                match event.kind {
                    CrewEventKind::TaskStarted => {
                        run.active_agent = Some(event.agent.clone());
                        run.active_task = event.task_id.clone();
                    }
                    CrewEventKind::TaskCompleted => run.progress.advance(),
                    CrewEventKind::TaskFailed | CrewEventKind::CrewFailed => run.progress.fail(),
                    CrewEventKind::CrewStarted | CrewEventKind::CrewCompleted => {}
                }
                if event.is_terminal() {
                    run.active_agent = None;
                    run.active_task = None;
                }
            }
            // No subscribers is fine
            let _ = bridge_state.event_tx.send(event);
        }
    });

    let result = generate_strategy(client, spec, request, Some(event_tx)).await;

    // The sender is gone once the crew is dropped, so the bridge drains and exits
    if let Err(e) = bridge.await {
        tracing::warn!("Event bridge stopped: {}", e);
    }
    result
}

/// SSE endpoint for crew events with heartbeat
pub async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.event_tx.subscribe()).map(|item| {
        let event = match item {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Event::default().event(event_name(event.kind)).data(json),
                Err(e) => Event::default().comment(format!("unserializable event: {}", e)),
            },
            Err(lagged) => Event::default().comment(lagged.to_string()),
        };
        Ok(event)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

fn event_name(kind: CrewEventKind) -> &'static str {
    match kind {
        CrewEventKind::CrewStarted => "crew_started",
        CrewEventKind::TaskStarted => "task_started",
        CrewEventKind::TaskCompleted => "task_completed",
        CrewEventKind::TaskFailed => "task_failed",
        CrewEventKind::CrewCompleted => "crew_completed",
        CrewEventKind::CrewFailed => "crew_failed",
    }
}

/// Get the active crew definition
#[utoipa::path(
    get,
    path = "/api/v1/crew",
    tag = "strategy",
    responses(
        (status = 200, description = "Agents and tasks that will run"),
        (status = 500, description = "The configured crew file is unreadable", body = String)
    )
)]
pub async fn get_crew(
    State(state): State<SharedState>,
) -> Result<Json<CrewSpec>, (StatusCode, String)> {
    state
        .config()
        .crew_spec()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
