//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AcceptedResponse, ActionRequest, ChatRequest, ConversationResponse, CreatedResponse,
    ErrorResponse, SuccessResponse, ToolListResponse,
};
use super::AppState;
use crate::agent::{AgentReply, AgentRequest};
use crate::runtime::{ActionError, ConversationHandle, SseEvent, SubmitError};
use crate::tools::ContentEnvelope;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Tool invocation boundary
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(invoke_tool))
        // Agent boundary
        .route("/api/agent", post(call_agent))
        // Conversations
        .route("/api/conversations", post(create_conversation))
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/chat", post(send_chat))
        .route("/api/conversations/:id/actions", post(send_action))
        .route("/api/conversations/:id/stream", get(stream_conversation))
        .route("/api/conversations/:id/close", post(close_conversation))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Tools
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.dispatcher.registry().definitions(),
    })
}

/// Always answers 200; failures are error-flavored envelopes
async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Json<ContentEnvelope> {
    let input = body.map_or_else(|| json!({}), |Json(value)| value);
    Json(state.dispatcher.dispatch(&name, input).await)
}

// ============================================================
// Agent
// ============================================================

async fn call_agent(State(state): State<AppState>, Json(req): Json<AgentRequest>) -> Response {
    match state.agent.call(&req).await {
        Ok(reply @ AgentReply::Candidates { .. }) => Json(reply).into_response(),
        Ok(reply @ AgentReply::Error { .. }) => (StatusCode::BAD_GATEWAY, Json(reply)).into_response(),
        Err(e) => {
            tracing::warn!(kind = ?e.kind, error = %e, "Agent request failed");
            (StatusCode::BAD_GATEWAY, Json(AgentReply::error(e.message))).into_response()
        }
    }
}

// ============================================================
// Conversations
// ============================================================

async fn create_conversation(State(state): State<AppState>) -> Json<CreatedResponse> {
    let handle = state.runtime.create().await;
    Json(CreatedResponse {
        id: handle.id().to_string(),
    })
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let handle = lookup(&state, &id).await?;
    Ok(Json(ConversationResponse {
        id,
        state: handle.state(),
        turns: handle.turns(),
    }))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }
    let handle = lookup(&state, &id).await?;
    handle.submit(req.text).await?;
    Ok(accepted())
}

async fn send_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    let handle = lookup(&state, &id).await?;
    handle.invoke_action(&req.tool_name, req.args).await?;
    Ok(accepted())
}

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    // Subscribe before snapshotting; a turn landing in between shows up
    // twice with the same index rather than not at all
    let broadcast_rx = handle.subscribe();
    let init = SseEvent::Init {
        turns: handle.turns(),
        state: handle.state(),
    };
    Ok(sse_stream(init, broadcast_rx))
}

async fn close_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.runtime.close(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(not_found(&id))
    }
}

async fn get_version() -> &'static str {
    concat!("storefront-agent ", env!("CARGO_PKG_VERSION"))
}

async fn lookup(state: &AppState, id: &str) -> Result<ConversationHandle, AppError> {
    state.runtime.get(id).await.ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Conversation not found: {id}"))
}

fn accepted() -> (StatusCode, Json<AcceptedResponse>) {
    (StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Rejected(e) => AppError::Conflict(e.to_string()),
            SubmitError::Closed => AppError::NotFound(e.to_string()),
        }
    }
}

impl From<ActionError> for AppError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::NotBound => AppError::Conflict(e.to_string()),
            ActionError::Submit(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
