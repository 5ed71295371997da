//! # Runs API
//!
//! Read-only access to the run history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use pitchcraft_core::history::RunRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::SharedState;

const DEFAULT_LIMIT: usize = 20;

pub fn run_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_runs))
        .route("/:id", get(get_run))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunSummary {
    pub id: String,
    pub customer_domain: String,
    pub project_description: String,
    /// running, completed or failed
    pub status: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl From<RunRecord> for RunSummary {
    fn from(record: RunRecord) -> Self {
        Self {
            id: record.id,
            customer_domain: record.customer_domain,
            project_description: record.project_description,
            status: record.status.as_str().to_string(),
            output: record.output,
            error: record.error,
            created_at: record.created_at.to_rfc3339(),
            finished_at: record.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// List recent runs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/runs",
    tag = "runs",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum number of runs (default 20)")
    ),
    responses(
        (status = 200, description = "Recent runs", body = Vec<RunSummary>)
    )
)]
pub async fn list_runs(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RunSummary>>, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    match state.runs.list(limit) {
        Ok(runs) => Ok(Json(runs.into_iter().map(RunSummary::from).collect())),
        Err(e) => {
            tracing::error!("Failed to list runs: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Get one run
#[utoipa::path(
    get,
    path = "/api/v1/runs/{id}",
    tag = "runs",
    params(
        ("id" = String, Path, description = "Run id")
    ),
    responses(
        (status = 200, description = "The run", body = RunSummary),
        (status = 404, description = "Unknown run")
    )
)]
pub async fn get_run(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RunSummary>, (StatusCode, String)> {
    match state.runs.get(&id) {
        Ok(Some(record)) => Ok(Json(record.into())),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("Run not found: {}", id))),
        Err(e) => {
            tracing::error!("Failed to load run {}: {}", id, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use pitchcraft_core::marketing::StrategyRequest;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_and_get_runs() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeLlm::new()));
        let first = state
            .runs
            .create(&StrategyRequest::new("a.com", "First"))
            .unwrap();
        let second = state
            .runs
            .create(&StrategyRequest::new("b.com", "Second"))
            .unwrap();
        state.runs.complete(&second, "Copy").unwrap();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/api/v1/runs?limit=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let runs = body.as_array().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["id"], second.as_str());
        assert_eq!(runs[0]["status"], "completed");

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/v1/runs/{}", first))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["customer_domain"], "a.com");
        assert_eq!(body["status"], "running");

        let response = app
            .oneshot(Request::get("/api/v1/runs/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
