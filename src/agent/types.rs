//! Transcript and task data model shared by the run loop, the HTTP facade
//! and the task engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle states an agent (or a closed transcript) can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Thinking,
    Acting,
    Learning,
    Error,
}

/// Priority attached to a task context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// Kind of a single transcript step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thinking,
    Action,
    Error,
}

/// One appended entry in a run transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub timestamp: DateTime<Utc>,
    pub step_type: StepKind,
    pub content: String,
    /// Fixed by step kind: 0.8 thinking, 1.0 action, 0.0 error.
    pub confidence: f64,
    pub tools_used: Vec<String>,
}

impl ThoughtStep {
    pub fn thinking(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            step_type: StepKind::Thinking,
            content: content.into(),
            confidence: 0.8,
            tools_used: Vec::new(),
        }
    }

    pub fn action(content: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            step_type: StepKind::Action,
            content: content.into(),
            confidence: 1.0,
            tools_used,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            step_type: StepKind::Error,
            content: content.into(),
            confidence: 0.0,
            tools_used: Vec::new(),
        }
    }
}

/// Outcome of one `act` dispatch. Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub artifacts: Vec<String>,
}

impl ActionResult {
    pub fn success(data: Value, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time_ms,
            artifacts: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time_ms,
            artifacts: Vec::new(),
        }
    }
}

/// Per-run task context held in the agent's `current_task` slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    pub task_id: String,
    pub original_request: String,
    pub priority: TaskPriority,
    pub metadata: Map<String, Value>,
    pub max_iterations: usize,
    /// Stored for callers to inspect; the loop never consults it.
    pub timeout_seconds: u64,
}

impl TaskContext {
    pub fn new(
        task_id: impl Into<String>,
        original_request: impl Into<String>,
        max_iterations: usize,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            original_request: original_request.into(),
            priority: TaskPriority::default(),
            metadata,
            max_iterations,
            timeout_seconds: 300,
        }
    }
}

/// Append-only transcript of one `run` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentThought {
    pub agent_name: String,
    pub task_id: String,
    pub status: AgentStatus,
    pub thought_steps: Vec<ThoughtStep>,
    pub final_result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentThought {
    pub fn new(agent_name: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            task_id: task_id.into(),
            status: AgentStatus::Idle,
            thought_steps: Vec::new(),
            final_result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Snapshot returned by `Agent::get_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusReport {
    pub name: String,
    pub role: String,
    pub status: AgentStatus,
    pub tools_count: usize,
    pub history_count: usize,
    pub using_llm: bool,
    pub model: Option<String>,
}
