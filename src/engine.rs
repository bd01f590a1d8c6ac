//! Queued task execution over the agent pool.
//!
//! Tasks are submitted into an in-memory map plus a FIFO queue of ids and
//! executed strictly in submission order; the semaphore bounds concurrent
//! executions for callers that drive `execute` directly. A task whose agent
//! is not registered stays pending in the queue.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentStatus, StepKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// One submitted unit of work. `name` is the task text handed to the agent;
/// `params` becomes the run context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: u8,
    pub agent_name: String,
    pub params: Map<String, Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        agent_name: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            id: format!("task_{}", Uuid::new_v4().simple()),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            priority: 1,
            agent_name: agent_name.into(),
            params,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// In-memory task registry and sequential queue runner.
pub struct TaskEngine {
    tasks: RwLock<HashMap<String, Task>>,
    queue: RwLock<Vec<String>>,
    semaphore: Semaphore,
}

impl TaskEngine {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            queue: RwLock::new(Vec::new()),
            semaphore: Semaphore::new(max_concurrent),
        }
    }

    /// Register a task and enqueue it; returns its id.
    pub async fn submit(&self, task: Task) -> String {
        let task_id = task.id.clone();
        self.tasks.write().await.insert(task_id.clone(), task);
        self.queue.write().await.push(task_id.clone());
        debug!(task_id = %task_id, "task submitted");
        task_id
    }

    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn list(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        match status {
            Some(wanted) => tasks
                .values()
                .filter(|task| task.status == wanted)
                .cloned()
                .collect(),
            None => tasks.values().cloned().collect(),
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.read().await.len()
    }

    /// Run one task on the given agent and return its result payload.
    ///
    /// The task is marked `failed` when the run transcript closes with an
    /// error status; the serialized transcript is stored either way.
    /// Returns `None` for an unknown task id.
    pub async fn execute(&self, task_id: &str, agent: &Agent) -> Option<Value> {
        // The semaphore is never closed, so acquisition only ever waits.
        let _permit = self.semaphore.acquire().await.ok()?;

        let (name, params) = {
            let mut tasks = self.tasks.write().await;
            let task = tasks.get_mut(task_id)?;
            task.status = TaskStatus::Running;
            task.started_at = Some(Utc::now());
            (task.name.clone(), task.params.clone())
        };

        let thought = agent.run(&name, Some(params), None).await;
        let result = serde_json::to_value(&thought).unwrap_or_default();

        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(task_id)?;
        if thought.status == AgentStatus::Error {
            task.status = TaskStatus::Failed;
            task.error = thought
                .thought_steps
                .iter()
                .rev()
                .find(|step| step.step_type == StepKind::Error)
                .map(|step| step.content.clone());
        } else {
            task.status = TaskStatus::Completed;
        }
        task.result = Some(result.clone());
        task.completed_at = Some(Utc::now());

        Some(result)
    }

    /// Drain the queue in submission order. Tasks whose agent is not in the
    /// pool are re-queued and left pending.
    pub async fn run_queued(&self, agents: &HashMap<String, Arc<Agent>>) {
        let queued: Vec<String> = std::mem::take(&mut *self.queue.write().await);
        for task_id in queued {
            let agent_name = match self.tasks.read().await.get(&task_id) {
                Some(task) => task.agent_name.clone(),
                None => continue,
            };
            match agents.get(&agent_name) {
                Some(agent) => {
                    let _ = self.execute(&task_id, agent).await;
                }
                None => {
                    warn!(task_id = %task_id, agent = %agent_name, "no such agent; task stays queued");
                    self.queue.write().await.push(task_id);
                }
            }
        }
    }
}
