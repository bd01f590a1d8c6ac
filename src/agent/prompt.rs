//! Prompt templates for the think stage.
//!
//! The templates are the original Arabic persona prompts, kept verbatim:
//! the trigger-phrase extraction in [`super::selector`] matches Arabic verb
//! phrases, so the prompts and the extraction lexicon have to agree on the
//! language the model is steered into.

use crate::tools::ToolSchema;
use serde_json::{Map, Value};

/// Placeholder used when a run carries no context payload.
const NO_CONTEXT: &str = "لا يوجد سياق إضافي";

/// Build the default system prompt from an agent's identity.
pub fn default_system_prompt(name: &str, role: &str, description: &str) -> String {
    format!(
        r#"أنت {name}، {role}.

{description}

مهمتك هي تحليل المهام واتخاذ الإجراءات المناسبة باستخدام الأدوات المتاحة.
يجب أن تكون منهجياً ودقيقاً في تفكيرك، مع شرح خطواتك بوضوح.
تذكر دائماً أن تختار الأداة المناسبة للمهمة، ولا تتردد في طلب توضيح إذا كان الطلب غامضاً."#
    )
}

/// Build the user prompt for one think call: the task, the serialized
/// context (an empty mapping counts as no context) and the registered tool
/// schemas, verbatim.
pub fn build_think_prompt(
    task: &str,
    context: Option<&Map<String, Value>>,
    schemas: &[ToolSchema],
) -> String {
    let context_block = match context {
        Some(map) if !map.is_empty() => {
            serde_json::to_string_pretty(map).unwrap_or_else(|_| "{}".to_string())
        }
        _ => NO_CONTEXT.to_string(),
    };

    let tools_block = serde_json::to_string_pretty(schemas).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"المهمة: {task}

السياق: {context_block}

الأدوات المتاحة:
{tools_block}

بناءً على المهمة والسياق، ما الإجراء المناسب؟
فكر خطوة بخطوة، ثم حدد أي أداة يجب استخدامها."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_schema() -> ToolSchema {
        ToolSchema {
            name: "echo".to_string(),
            description: "returns its input".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        }
    }

    #[test]
    fn think_prompt_embeds_task_context_and_schemas() {
        let mut context = Map::new();
        context.insert("project".to_string(), json!("trinity"));
        let prompt = build_think_prompt("حلل السوق", Some(&context), &[echo_schema()]);
        assert!(prompt.contains("حلل السوق"));
        assert!(prompt.contains("\"project\": \"trinity\""));
        assert!(prompt.contains("\"name\": \"echo\""));
    }

    #[test]
    fn empty_context_reads_as_no_context() {
        let prompt = build_think_prompt("task", Some(&Map::new()), &[]);
        assert!(prompt.contains(NO_CONTEXT));
        let prompt = build_think_prompt("task", None, &[]);
        assert!(prompt.contains(NO_CONTEXT));
    }

    #[test]
    fn system_prompt_names_the_persona() {
        let prompt = default_system_prompt("Ouroboros", "مهندس برمجيات", "وصف");
        assert!(prompt.starts_with("أنت Ouroboros، مهندس برمجيات."));
        assert!(prompt.contains("وصف"));
    }
}
