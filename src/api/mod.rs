//! HTTP facade over the agent pool.
//!
//! A thin axum layer: every route either reads agent state or hands a task
//! to `Agent::run` and returns the transcript. Because `run` never fails,
//! the only error paths left to the facade are the 404 for an unknown
//! agent name and the catch-all 500.

pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Agent;
use crate::agents::initialize_agents;
use crate::config::Config;
use crate::engine::TaskEngine;
use crate::llm;

use types::{
    AgentRequest, AgentSummary, AgentsResponse, ApiError, HealthResponse, HistoryParams,
    HistoryResponse, RunResponse, SystemStatusResponse,
};

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Application state constructed once at startup and shared by reference
/// with every handler.
pub struct AppState {
    pub config: Config,
    pub agents: HashMap<String, Arc<Agent>>,
    /// Ancillary task queue; constructed alongside the pool, not driven by
    /// any route.
    pub engine: Arc<TaskEngine>,
}

impl AppState {
    /// Build the state from configuration: provider factory, persona
    /// initialization, task engine.
    pub fn from_config(config: Config) -> Self {
        let client = llm::from_config(&config);
        let agents = initialize_agents(&config, client);
        let engine = Arc::new(TaskEngine::new(config.max_concurrent_tasks));
        Self {
            config,
            agents,
            engine,
        }
    }

    /// State over an explicit agent pool, for tests with fake agents.
    pub fn with_agents(config: Config, agents: HashMap<String, Arc<Agent>>) -> Self {
        let engine = Arc::new(TaskEngine::new(config.max_concurrent_tasks));
        Self {
            config,
            agents,
            engine,
        }
    }

    fn agent(&self, name: &str) -> Result<&Arc<Agent>, ApiError> {
        self.agents.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.agents.keys().cloned().collect();
            available.sort();
            ApiError::UnknownAgent {
                name: name.to_string(),
                available,
            }
        })
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/system/status", get(system_status))
        .route("/agent/:name/run", post(run_agent))
        .route("/agent/:name/history", get(agent_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Trinity AI Agent System",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "agents": "/agents",
            "status": "/system/status",
            "run": "/agent/{name}/run",
            "history": "/agent/{name}/history",
        },
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut agents_active: Vec<String> = state.agents.keys().cloned().collect();
    agents_active.sort();
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        agents_active,
    })
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<AgentsResponse> {
    let mut agents: Vec<AgentSummary> = Vec::with_capacity(state.agents.len());
    let mut keys: Vec<&String> = state.agents.keys().collect();
    keys.sort();

    for key in keys {
        let agent = &state.agents[key];
        agents.push(AgentSummary {
            name: key.clone(),
            role: agent.role().to_string(),
            description: agent.description().to_string(),
            capabilities: agent.tool_names(),
        });
    }

    Json(AgentsResponse { agents })
}

async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatusResponse> {
    let mut agents = HashMap::with_capacity(state.agents.len());
    for (key, agent) in &state.agents {
        agents.insert(key.clone(), agent.get_status().await);
    }

    Json(SystemStatusResponse {
        status: "operational".to_string(),
        timestamp: Utc::now(),
        agents,
        system_info: json!({
            "version": env!("CARGO_PKG_VERSION"),
            "agents_count": state.agents.len(),
        }),
    })
}

async fn run_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<AgentRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let agent = state.agent(&name)?;

    let context = (!request.context.is_empty()).then_some(request.context);
    let result = agent.run(&request.task, context, None).await;

    Ok(Json(RunResponse {
        agent: name,
        result,
    }))
}

async fn agent_history(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let agent = state.agent(&name)?;

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = agent.history(limit).await;

    Ok(Json(HistoryResponse {
        agent: name,
        history_count: history.len(),
        history,
    }))
}
