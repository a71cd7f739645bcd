//! # DeepClaw Gateway
//!
//! Thin HTTP surface over the agent runtime. Agent output is streamed as
//! `text/plain` chunks with the agent id in an `X-Agent-ID` header, so a
//! caller can start reading immediately and reattach later with follow-up
//! requests against the same id.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use deepclaw_agent::{AgentMode, AgentRuntime};
use deepclaw_core::{AgentError, StreamingChannel};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the gateway router around a runtime.
pub fn build_router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agents", post(create_agent).get(list_agents))
        .route("/agents/{id}/state", get(agent_state))
        .route("/agents/{id}/clarification", post(submit_clarification))
        .route("/agents/{id}/message", post(continue_conversation))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(runtime)
}

/// Bind and serve until the process is stopped.
pub async fn serve(runtime: Arc<AgentRuntime>, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Gateway listening");
    axum::serve(listener, build_router(runtime)).await
}

// --- Request/response schemas ---

#[derive(Deserialize)]
struct CreateAgentRequest {
    task: String,
    /// "research" (bounded, default) or "chat" (infinite).
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    agents: usize,
}

// --- Handlers ---

async fn health(State(runtime): State<Arc<AgentRuntime>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        agents: runtime.registry().len(),
    })
}

async fn create_agent(
    State(runtime): State<Arc<AgentRuntime>>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<Response, GatewayError> {
    let mode = match request.mode.as_deref() {
        None | Some("research") => AgentMode::Bounded,
        Some("chat") => AgentMode::Infinite,
        Some(other) => {
            return Err(GatewayError::BadRequest(format!(
                "unknown mode {other:?}, expected \"research\" or \"chat\""
            )));
        }
    };

    let (id, stream) = runtime
        .create_agent(request.task, mode)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(stream_response(&id, stream))
}

async fn list_agents(State(runtime): State<Arc<AgentRuntime>>) -> impl IntoResponse {
    Json(runtime.list_agents())
}

async fn agent_state(
    State(runtime): State<Arc<AgentRuntime>>,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    let snapshot = runtime.get_status(&id)?;
    Ok(Json(snapshot).into_response())
}

async fn submit_clarification(
    State(runtime): State<Arc<AgentRuntime>>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Response, GatewayError> {
    let stream = runtime.submit_clarification(&id, request.message)?;
    Ok(stream_response(&id, stream))
}

async fn continue_conversation(
    State(runtime): State<Arc<AgentRuntime>>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Response, GatewayError> {
    let stream = runtime.continue_conversation(&id, request.message)?;
    Ok(stream_response(&id, stream))
}

/// Wrap a stream handle as a chunked `text/plain` response.
fn stream_response(agent_id: &str, stream: StreamingChannel) -> Response {
    let body = Body::from_stream(
        stream
            .stream()
            .map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk))),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("x-agent-id", agent_id)
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

// --- Error mapping ---

enum GatewayError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Internal(String),
}

impl From<AgentError> for GatewayError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::NotFound(_) => Self::NotFound(e.to_string()),
            AgentError::InvalidState { .. } | AgentError::NotInfinite(_) => {
                Self::Conflict(e.to_string())
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
