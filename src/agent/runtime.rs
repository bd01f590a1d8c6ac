//! The agent runtime: a persona-bound tool table driving a bounded
//! think/act loop.
//!
//! Each `run` produces an append-only [`AgentThought`] transcript. A round
//! asks the reasoner for free text, scans it for a tool trigger, and either
//! invokes the named tool or closes the run with a synthesized success.
//! Failed actions are recorded and retried until the round budget is spent.
//! Run invocations on one agent are serialized by an internal gate; status
//! and history stay readable while a run is in flight.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::llm::LlmClient;
use crate::memory::MemoryStore;
use crate::tools::{Tool, ToolSchema};

use super::prompt::default_system_prompt;
use super::reasoner::Reasoner;
use super::selector::{ActionSelector, TriggerPhraseSelector};
use super::types::{
    ActionResult, AgentStatus, AgentStatusReport, AgentThought, TaskContext, ThoughtStep,
};

/// Recorded as the final result when a thinking round names no tool.
pub const NO_TOOL_MESSAGE: &str = "reasoning completed, no tool needed";

/// Identity and sampling settings for one agent.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub role: String,
    pub description: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the prompt assembled from name, role and description.
    pub system_prompt: Option<String>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: description.into(),
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
        }
    }
}

/// A single agent: reasoner, registered tools and run state.
///
/// Tools are registered before the agent is shared; registration takes
/// `&mut self`, so a published `Arc<Agent>` is immutable by construction.
pub struct Agent {
    profile: AgentProfile,
    reasoner: Reasoner,
    tools: HashMap<String, Arc<dyn Tool>>,
    selector: Box<dyn ActionSelector>,
    max_iterations: usize,
    continue_on_error: bool,
    memory: Option<Arc<MemoryStore>>,
    status: RwLock<AgentStatus>,
    current_task: RwLock<Option<TaskContext>>,
    history: RwLock<Vec<AgentThought>>,
    run_gate: Mutex<()>,
}

impl Agent {
    pub fn new(profile: AgentProfile, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let system_prompt = profile.system_prompt.clone().unwrap_or_else(|| {
            default_system_prompt(&profile.name, &profile.role, &profile.description)
        });
        let reasoner = Reasoner::new(
            profile.name.clone(),
            llm,
            system_prompt,
            profile.temperature,
            profile.max_tokens,
        );

        Self {
            profile,
            reasoner,
            tools: HashMap::new(),
            selector: Box::new(TriggerPhraseSelector),
            max_iterations: 10,
            continue_on_error: true,
            memory: None,
            status: RwLock::new(AgentStatus::Idle),
            current_task: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            run_gate: Mutex::new(()),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// When disabled, the first failed action closes the run with an
    /// `error` transcript instead of retrying.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_memory(mut self, memory: Arc<MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_selector(mut self, selector: Box<dyn ActionSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Register a tool under its declared name. Re-registering a name
    /// replaces the handler but appends a second schema entry, so the
    /// advertised tool list keeps both descriptors.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let schema = ToolSchema::describe(tool.as_ref());
        debug!(agent = %self.profile.name, tool = %schema.name, "registered tool");
        self.reasoner.add_schema(schema);
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn role(&self) -> &str {
        &self.profile.role
    }

    pub fn description(&self) -> &str {
        &self.profile.description
    }

    /// Tool names in registration order, duplicates included.
    pub fn tool_names(&self) -> Vec<String> {
        self.reasoner
            .schemas()
            .iter()
            .map(|schema| schema.name.clone())
            .collect()
    }

    /// Run one task to completion and return its transcript.
    ///
    /// Never fails: provider errors, unknown tools, handler errors and
    /// handler panics all surface as transcript steps. `max_iterations`
    /// overrides the agent-level round budget for this run only.
    pub async fn run(
        &self,
        task: &str,
        context: Option<Map<String, Value>>,
        max_iterations: Option<usize>,
    ) -> AgentThought {
        let _exclusive = self.run_gate.lock().await;

        let task_id = format!("{}_{}", self.profile.name, Uuid::new_v4().simple());
        let rounds = max_iterations.unwrap_or(self.max_iterations);

        *self.current_task.write().await = Some(TaskContext::new(
            task_id.clone(),
            task,
            rounds,
            context.clone().unwrap_or_default(),
        ));

        let mut thought = AgentThought::new(&self.profile.name, &task_id);
        info!(agent = %self.profile.name, task_id = %task_id, "starting run: {}", task);

        for iteration in 0..rounds {
            debug!(agent = %self.profile.name, "iteration {}/{}", iteration + 1, rounds);

            let thinking = self.think(task, context.as_ref()).await;
            thought.thought_steps.push(ThoughtStep::thinking(&thinking));

            let (result, tool_used) = match self.selector.select(&thinking) {
                Some(action) => {
                    let outcome = self.act(&action.tool, json!({ "query": thinking })).await;
                    (outcome, Some(action.tool))
                }
                None => (
                    ActionResult::success(json!({ "message": NO_TOOL_MESSAGE }), 0),
                    None,
                ),
            };

            if result.success {
                thought.thought_steps.push(ThoughtStep::action(
                    "action completed successfully",
                    tool_used.map(|tool| vec![tool]).unwrap_or_default(),
                ));
                thought.final_result = result.data;
                thought.status = AgentStatus::Idle;
                break;
            }

            let message = result.error.unwrap_or_default();
            warn!(agent = %self.profile.name, "iteration {} failed: {}", iteration + 1, message);
            thought.thought_steps.push(ThoughtStep::error(message));

            if !self.continue_on_error {
                thought.status = AgentStatus::Error;
                break;
            }
        }

        // Stamped on every exit path, exhausted round budgets included.
        thought.completed_at = Some(Utc::now());

        if let Some(memory) = &self.memory {
            memory.record_run(&thought).await;
        }

        self.history.write().await.push(thought.clone());
        *self.status.write().await = AgentStatus::Idle;
        *self.current_task.write().await = None;

        info!(
            agent = %self.profile.name,
            task_id = %task_id,
            status = ?thought.status,
            steps = thought.thought_steps.len(),
            "run finished"
        );

        thought
    }

    /// One reasoning call against the persona prompt and tool table.
    pub async fn think(&self, task: &str, context: Option<&Map<String, Value>>) -> String {
        *self.status.write().await = AgentStatus::Thinking;
        self.reasoner.think(task, context).await
    }

    /// Invoke a registered tool by name.
    ///
    /// Unknown names, handler errors and handler panics all come back as
    /// failed results; the wall-clock duration is recorded either way. A
    /// scalar success value is wrapped as `{"result": <text>}` so the
    /// transcript's final result is always an object.
    pub async fn act(&self, action: &str, params: Value) -> ActionResult {
        *self.status.write().await = AgentStatus::Acting;
        let started = Instant::now();

        let Some(tool) = self.tools.get(action) else {
            let elapsed = started.elapsed().as_millis() as u64;
            return ActionResult::failure(format!("tool '{}' not found", action), elapsed);
        };

        let outcome = AssertUnwindSafe(tool.execute(params, &self.reasoner))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(value)) => ActionResult::success(normalize_tool_output(value), elapsed),
            Ok(Err(e)) => {
                warn!(agent = %self.profile.name, tool = %action, "tool failed: {}", e);
                ActionResult::failure(e.to_string(), elapsed)
            }
            Err(panic) => {
                error!(agent = %self.profile.name, tool = %action, "tool panicked: {:?}", panic);
                ActionResult::failure(
                    format!("tool '{}' panicked during execution", action),
                    elapsed,
                )
            }
        }
    }

    pub async fn get_status(&self) -> AgentStatusReport {
        AgentStatusReport {
            name: self.profile.name.clone(),
            role: self.profile.role.clone(),
            status: *self.status.read().await,
            tools_count: self.tools.len(),
            history_count: self.history.read().await.len(),
            using_llm: self.reasoner.using_llm(),
            model: self.reasoner.model().map(str::to_string),
        }
    }

    /// The most recent `limit` transcripts, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<AgentThought> {
        let history = self.history.read().await;
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    pub async fn current_task(&self) -> Option<TaskContext> {
        self.current_task.read().await.clone()
    }
}

/// Tool handlers may return any JSON value; the transcript stores objects.
fn normalize_tool_output(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::String(text) => json!({ "result": text }),
        other => json!({ "result": other.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::selector::SelectedAction;
    use crate::agent::types::StepKind;
    use crate::llm::testing::{FailingLlm, StubLlm};
    use crate::tools::Tool;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes the query argument back"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }
        async fn execute(&self, args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
            Ok(json!({ "echoed": args["query"] }))
        }
    }

    struct FixedTool {
        name: &'static str,
        value: Value,
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "returns a canned value"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
            Ok(self.value.clone())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "always_fails"
        }
        fn description(&self) -> &str {
            "always returns an error"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
            Err(anyhow!("deliberate failure"))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "kaboom"
        }
        fn description(&self) -> &str {
            "panics on every call"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
            panic!("handler blew up");
        }
    }

    struct AlwaysEcho;

    impl ActionSelector for AlwaysEcho {
        fn select(&self, _thought: &str) -> Option<SelectedAction> {
            Some(SelectedAction {
                tool: "echo".to_string(),
            })
        }
    }

    fn offline_agent(name: &str) -> Agent {
        Agent::new(AgentProfile::new(name, "test role", "test description"), None)
    }

    #[tokio::test]
    async fn act_reports_unknown_tools_as_failures() {
        let agent = offline_agent("probe");
        let result = agent.act("nope", json!({})).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tool 'nope' not found"));
        assert!(result.data.is_none());
        assert!(result.artifacts.is_empty());
    }

    #[tokio::test]
    async fn act_wraps_scalar_results_in_an_object() {
        let mut agent = offline_agent("probe");
        agent.register_tool(Arc::new(FixedTool {
            name: "text",
            value: json!("plain text"),
        }));
        agent.register_tool(Arc::new(FixedTool {
            name: "number",
            value: json!(42),
        }));
        agent.register_tool(Arc::new(FixedTool {
            name: "object",
            value: json!({"already": "structured"}),
        }));

        let text = agent.act("text", json!({})).await;
        assert_eq!(text.data, Some(json!({"result": "plain text"})));

        let number = agent.act("number", json!({})).await;
        assert_eq!(number.data, Some(json!({"result": "42"})));

        let object = agent.act("object", json!({})).await;
        assert_eq!(object.data, Some(json!({"already": "structured"})));
    }

    #[tokio::test]
    async fn act_converts_handler_errors_to_failed_results() {
        let mut agent = offline_agent("probe");
        agent.register_tool(Arc::new(FailingTool));

        let result = agent.act("always_fails", json!({})).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("deliberate failure"));
    }

    #[tokio::test]
    async fn act_survives_a_panicking_handler() {
        let mut agent = offline_agent("probe");
        agent.register_tool(Arc::new(PanickingTool));
        agent.register_tool(Arc::new(EchoTool));

        let result = agent.act("kaboom", json!({})).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("tool 'kaboom' panicked during execution")
        );

        // The agent keeps working after the panic was contained.
        let follow_up = agent.act("echo", json!({"query": "still alive"})).await;
        assert!(follow_up.success);
    }

    #[tokio::test]
    async fn run_without_a_trigger_closes_with_synthesized_success() {
        let agent = offline_agent("idle");

        let thought = agent.run("لخص الوضع الحالي", None, None).await;

        assert_eq!(thought.status, AgentStatus::Idle);
        assert_eq!(thought.thought_steps.len(), 2);
        assert_eq!(thought.thought_steps[0].step_type, StepKind::Thinking);
        assert_eq!(thought.thought_steps[0].confidence, 0.8);
        assert_eq!(thought.thought_steps[1].step_type, StepKind::Action);
        assert_eq!(thought.thought_steps[1].confidence, 1.0);
        assert!(thought.thought_steps[1].tools_used.is_empty());
        assert_eq!(thought.final_result, Some(json!({"message": NO_TOOL_MESSAGE})));
        assert!(thought.completed_at.is_some());
        assert!(thought.task_id.starts_with("idle_"));
    }

    #[tokio::test]
    async fn run_invokes_the_tool_named_by_a_trigger_phrase() {
        let reply = "سأقوم بمعالجة المهمة الآن. استخدم echo للحصول على النتيجة.";
        let mut agent = Agent::new(
            AgentProfile::new("worker", "test role", "test description"),
            Some(StubLlm::new(reply)),
        );
        agent.register_tool(Arc::new(EchoTool));

        let thought = agent.run("كرر النص", None, None).await;

        assert_eq!(thought.status, AgentStatus::Idle);
        assert_eq!(thought.thought_steps.len(), 2);
        assert_eq!(thought.thought_steps[1].tools_used, vec!["echo".to_string()]);
        // The tool receives the raw thinking text as its query argument.
        assert_eq!(thought.final_result, Some(json!({"echoed": reply})));

        let report = agent.get_status().await;
        assert_eq!(report.status, AgentStatus::Idle);
        assert_eq!(report.history_count, 1);
    }

    #[tokio::test]
    async fn run_retries_until_the_round_budget_is_spent() {
        let mut agent = Agent::new(
            AgentProfile::new("worker", "test role", "test description"),
            Some(StubLlm::new("استخدم always_fails مرة أخرى")),
        );
        agent.register_tool(Arc::new(FailingTool));

        let thought = agent.run("مهمة مستحيلة", None, Some(3)).await;

        // Three rounds of thinking followed by a recorded failure each.
        assert_eq!(thought.thought_steps.len(), 6);
        for pair in thought.thought_steps.chunks(2) {
            assert_eq!(pair[0].step_type, StepKind::Thinking);
            assert_eq!(pair[1].step_type, StepKind::Error);
            assert_eq!(pair[1].confidence, 0.0);
            assert_eq!(pair[1].content, "deliberate failure");
        }
        assert_eq!(thought.status, AgentStatus::Idle);
        assert!(thought.final_result.is_none());
        assert!(thought.completed_at.is_some());
    }

    #[tokio::test]
    async fn run_stops_at_the_first_error_when_configured() {
        let mut agent = Agent::new(
            AgentProfile::new("strict", "test role", "test description"),
            Some(StubLlm::new("استخدم always_fails")),
        )
        .with_continue_on_error(false);
        agent.register_tool(Arc::new(FailingTool));

        let thought = agent.run("مهمة حساسة", None, None).await;

        assert_eq!(thought.status, AgentStatus::Error);
        assert_eq!(thought.thought_steps.len(), 2);
        assert_eq!(thought.thought_steps[1].step_type, StepKind::Error);
        assert!(thought.final_result.is_none());
        assert!(thought.completed_at.is_some());

        // The agent itself returns to idle even though the run errored.
        assert_eq!(agent.get_status().await.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn run_closes_an_empty_transcript_when_given_zero_rounds() {
        let agent = offline_agent("empty");

        let thought = agent.run("أي مهمة", None, Some(0)).await;

        assert!(thought.thought_steps.is_empty());
        assert_eq!(thought.status, AgentStatus::Idle);
        assert!(thought.final_result.is_none());
        assert!(thought.completed_at.is_some());
        assert_eq!(agent.history(10).await.len(), 1);
    }

    #[tokio::test]
    async fn run_completes_when_the_provider_keeps_failing() {
        let agent = Agent::new(
            AgentProfile::new("degraded", "test role", "test description"),
            Some(FailingLlm::new()),
        );

        let thought = agent.run("مهمة عادية", None, None).await;

        // Provider failures become thinking text without a trigger, so the
        // run closes as a synthesized success on the first round.
        assert_eq!(thought.status, AgentStatus::Idle);
        assert_eq!(thought.thought_steps.len(), 2);
        assert!(thought.thought_steps[0]
            .content
            .starts_with("language model request failed"));
        assert_eq!(thought.final_result, Some(json!({"message": NO_TOOL_MESSAGE})));
    }

    #[tokio::test]
    async fn every_run_appends_exactly_one_transcript() {
        let agent = offline_agent("logger");

        let first = agent.run("مهمة أولى", None, None).await;
        let second = agent.run("مهمة ثانية", None, None).await;

        let all = agent.history(10).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].task_id, first.task_id);
        assert_eq!(all[1].task_id, second.task_id);
        assert_ne!(first.task_id, second.task_id);

        let last = agent.history(1).await;
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].task_id, second.task_id);
    }

    #[tokio::test]
    async fn current_task_is_cleared_once_a_run_finishes() {
        let agent = offline_agent("tasker");
        assert!(agent.current_task().await.is_none());

        agent.run("مهمة قصيرة", None, None).await;

        assert!(agent.current_task().await.is_none());
        assert_eq!(agent.get_status().await.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn reregistering_a_name_replaces_the_handler_and_appends_its_schema() {
        let mut agent = offline_agent("dup");
        agent.register_tool(Arc::new(FixedTool {
            name: "canned",
            value: json!({"version": 1}),
        }));
        agent.register_tool(Arc::new(FixedTool {
            name: "canned",
            value: json!({"version": 2}),
        }));

        assert_eq!(agent.get_status().await.tools_count, 1);
        assert_eq!(agent.tool_names(), vec!["canned", "canned"]);

        let result = agent.act("canned", json!({})).await;
        assert_eq!(result.data, Some(json!({"version": 2})));
    }

    #[tokio::test]
    async fn a_custom_selector_replaces_trigger_extraction() {
        let mut agent = offline_agent("custom").with_selector(Box::new(AlwaysEcho));
        agent.register_tool(Arc::new(EchoTool));

        let thought = agent.run("بدون صيغة تحفيز", None, None).await;

        assert_eq!(thought.status, AgentStatus::Idle);
        // The selector fires even though the thinking text has no trigger,
        // and the query argument carries that raw text.
        assert_eq!(
            thought.final_result,
            Some(json!({"echoed": crate::agent::reasoner::NO_MODEL_MESSAGE}))
        );
    }

    #[tokio::test]
    async fn runs_record_outcomes_in_attached_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryStore::new(dir.path()));
        let agent = offline_agent("remembers").with_memory(Arc::clone(&store));

        agent.run("مهمة تذكر", None, None).await;

        assert_eq!(store.short_term_len().await, 1);
    }

    #[tokio::test]
    async fn get_status_is_idempotent_between_runs() {
        let mut agent = offline_agent("steady");
        agent.register_tool(Arc::new(EchoTool));

        let first = agent.get_status().await;
        let second = agent.get_status().await;
        assert_eq!(first, second);

        agent.run("مهمة", None, None).await;
        let after = agent.get_status().await;
        assert_eq!(after, agent.get_status().await);
        assert_eq!(after.history_count, 1);
    }

    #[tokio::test]
    async fn status_report_covers_identity_and_configuration() {
        let mut agent = Agent::new(
            AgentProfile::new("reporter", "وكيل التقارير", "يكتب التقارير"),
            Some(StubLlm::new("حسناً")),
        );
        agent.register_tool(Arc::new(EchoTool));

        let report = agent.get_status().await;

        assert_eq!(report.name, "reporter");
        assert_eq!(report.role, "وكيل التقارير");
        assert_eq!(report.status, AgentStatus::Idle);
        assert_eq!(report.tools_count, 1);
        assert_eq!(report.history_count, 0);
        assert!(report.using_llm);
        assert_eq!(report.model.as_deref(), Some("stub"));

        let offline = offline_agent("offline").get_status().await;
        assert!(!offline.using_llm);
        assert!(offline.model.is_none());
    }
}
