// SPDX-License-Identifier: MIT

//! HTTP surface for triggering workflow runs
//!
//! A small API in front of the engine: list the catalog, run a stored
//! workflow to completion, or stream per-node progress over SSE.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::strand::engine::{RunContext, RunEvent, WorkflowRunner};
use crate::strand::selector::{WorkflowCatalog, WorkflowResolver};

/// Shared handles for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<WorkflowRunner>,
    pub catalog: Arc<WorkflowCatalog>,
}

pub async fn serve(
    port: u16,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/workflows", get(list_workflows))
        .route("/api/executions", post(create_execution))
        .route("/api/executions/stream", post(stream_execution))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    match state.catalog.list().await {
        Ok(records) => Json(json!(records)),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionRequest {
    pipeline_context: String,
    project_id: String,
    #[serde(default)]
    inputs: Map<String, Value>,
}

async fn create_execution(
    State(state): State<AppState>,
    Json(payload): Json<ExecutionRequest>,
) -> Json<Value> {
    let def = match state.catalog.select(&payload.pipeline_context).await {
        Ok(Some(def)) => def,
        Ok(None) => return Json(json!({ "error": "Workflow not found" })),
        Err(e) => return Json(json!({ "error": e.to_string() })),
    };

    let mut ctx = RunContext::new(payload.project_id).with_inputs(payload.inputs);
    match state.runner.run(&def, &mut ctx, None).await {
        Ok(value) => Json(json!({ "status": "completed", "output": value })),
        Err(e) => Json(json!({
            "status": "failed",
            "error": e.to_string(),
            "nodeId": e.node_id(),
        })),
    }
}

async fn stream_execution(
    State(state): State<AppState>,
    Json(payload): Json<ExecutionRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        log::info!(
            "Starting streaming execution for pipeline context: {}",
            payload.pipeline_context
        );

        match state.catalog.select(&payload.pipeline_context).await {
            Ok(Some(def)) => {
                let mut ctx = RunContext::new(payload.project_id).with_inputs(payload.inputs);
                // the runner emits completion and failure events itself
                let _ = state.runner.run(&def, &mut ctx, Some(tx)).await;
            }
            Ok(None) => {
                let _ = tx
                    .send(RunEvent::RunFailed {
                        node_id: None,
                        message: "Workflow not found".to_string(),
                    })
                    .await;
            }
            Err(e) => {
                let _ = tx
                    .send(RunEvent::RunFailed {
                        node_id: None,
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    });

    let stream =
        ReceiverStream::new(rx).map(|event| Ok(Event::default().json_data(event).unwrap()));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new().interval(std::time::Duration::from_secs(1)),
    )
}
