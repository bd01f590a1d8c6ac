//! The think stage: prompt assembly over the registered tool schemas plus
//! one completion call, with every failure converted to user-visible text.

use super::prompt::build_think_prompt;
use crate::llm::{truncate_message, LlmClient};
use crate::tools::ToolSchema;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

/// Text returned by think when no provider is configured.
pub const NO_MODEL_MESSAGE: &str = "no language model available; provide an API key to enable one";

/// The LLM-facing half of an agent: fixed persona prompt, sampling
/// parameters and the schema list grown during tool registration. Shared
/// by reference with tool handlers that delegate work back to the model.
pub struct Reasoner {
    agent_name: String,
    llm: Option<Arc<dyn LlmClient>>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    schemas: Vec<ToolSchema>,
}

impl Reasoner {
    pub fn new(
        agent_name: impl Into<String>,
        llm: Option<Arc<dyn LlmClient>>,
        system_prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            llm,
            system_prompt,
            temperature,
            max_tokens,
            schemas: Vec::new(),
        }
    }

    /// Append a schema descriptor. Duplicate names append duplicate
    /// descriptors, mirroring registration semantics.
    pub(crate) fn add_schema(&mut self, schema: ToolSchema) {
        self.schemas.push(schema);
    }

    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn using_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Model identifier, when a provider is configured.
    pub fn model(&self) -> Option<&str> {
        self.llm.as_deref().map(|client| client.model())
    }

    /// Run one think call. Provider failures come back as text, never as
    /// an error: the run loop records whatever this returns.
    pub async fn think(&self, task: &str, context: Option<&Map<String, Value>>) -> String {
        let prompt = build_think_prompt(task, context, &self.schemas);

        let Some(client) = &self.llm else {
            return NO_MODEL_MESSAGE.to_string();
        };

        match client
            .complete(&self.system_prompt, &prompt, self.temperature, self.max_tokens)
            .await
        {
            Ok(text) => {
                debug!(
                    agent = %self.agent_name,
                    reply = %truncate_message(&text, 200),
                    "model replied"
                );
                text
            }
            Err(e) => {
                error!(agent = %self.agent_name, error = %e, "think stage failed");
                format!("language model request failed: {e}")
            }
        }
    }
}
