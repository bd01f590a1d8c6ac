//! API request and response types.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::agent::{AgentStatusReport, AgentThought};

/// Body of `POST /agent/{name}/run`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRequest {
    /// The task handed to the agent
    pub task: String,

    /// Optional context payload embedded in the think prompt
    #[serde(default)]
    pub context: Map<String, Value>,

    /// Accepted for compatibility; responses are never streamed
    #[serde(default)]
    pub stream: bool,
}

/// Response of `POST /agent/{name}/run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub agent: String,
    pub result: AgentThought,
}

/// One entry in `GET /agents`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub role: String,
    pub description: String,
    /// Registered tool names, derived from the live tool table
    pub capabilities: Vec<String>,
}

/// Response of `GET /agents`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentSummary>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub agents_active: Vec<String>,
}

/// Response of `GET /system/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatusResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub agents: HashMap<String, AgentStatusReport>,
    pub system_info: Value,
}

/// Query parameters of `GET /agent/{name}/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// Response of `GET /agent/{name}/history`.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub agent: String,
    pub history_count: usize,
    pub history: Vec<AgentThought>,
}

/// Error rendered as `{error, available?}` with the matching status.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Unknown agent name; carries the available keys for the caller
    UnknownAgent { name: String, available: Vec<String> },
    /// Catch-all for unexpected conditions
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::UnknownAgent { name, available } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": format!("agent '{}' not found", name),
                    "available": available,
                }),
            ),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };
        (status, Json(body)).into_response()
    }
}
