//! Tool abstractions shared by every persona.
//!
//! A tool is a named capability with a JSON-schema parameter description.
//! The run loop invokes tools with a single JSON object of arguments;
//! handlers pull what they need out of it. Two failure shapes exist by
//! contract: a missing required argument returns `Err` (surfacing as a
//! failed `ActionResult`), while a domain validation failure returns an
//! error payload — `Ok(json!({"error": ...}))` — which the loop treats as a
//! satisfied action.

pub mod web;

use crate::agent::Reasoner;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A named capability an agent can dispatch to from its run loop.
///
/// `execute` receives the caller-supplied arguments and a handle to the
/// owning agent's reasoner so LLM-delegating handlers can run their own
/// prompts through the same model and persona.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within the owning agent.
    fn name(&self) -> &str;

    /// Human-readable description embedded in think prompts.
    fn description(&self) -> &str;

    /// JSON schema describing the accepted arguments.
    fn parameters_schema(&self) -> Value;

    /// Run the tool.
    async fn execute(&self, args: Value, reasoner: &Reasoner) -> Result<Value>;
}

/// Descriptor consumed verbatim by think-prompt construction.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn describe(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        }
    }
}

/// Extract a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' argument", key))
}

/// Extract an optional string argument with a default.
pub(crate) fn str_or<'a>(args: &'a Value, key: &str, default: &'a str) -> &'a str {
    args[key].as_str().unwrap_or(default)
}

/// Extract an optional number argument.
pub(crate) fn optional_f64(args: &Value, key: &str) -> Option<f64> {
    args[key].as_f64()
}

/// Extract an optional array-of-strings argument.
pub(crate) fn string_array(args: &Value, key: &str) -> Option<Vec<String>> {
    args[key].as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

/// Wrap a domain validation failure as an error payload.
pub(crate) fn error_payload(message: impl Into<String>) -> Value {
    serde_json::json!({ "error": message.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_reports_missing_argument() {
        let args = json!({ "other": "value" });
        let err = required_str(&args, "query").unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn str_or_falls_back_to_default() {
        let args = json!({ "language": "rust" });
        assert_eq!(str_or(&args, "language", "python"), "rust");
        assert_eq!(str_or(&args, "scope", "global"), "global");
    }

    #[test]
    fn string_array_keeps_only_strings() {
        let args = json!({ "sources": ["web", 42, "news"] });
        let sources = string_array(&args, "sources").expect("array present");
        assert_eq!(sources, vec!["web".to_string(), "news".to_string()]);
    }

    #[test]
    fn error_payload_has_error_key() {
        let payload = error_payload("insufficient budget");
        assert_eq!(payload["error"], "insufficient budget");
    }
}
