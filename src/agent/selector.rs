//! Action selection: deciding what to do with raw model output.
//!
//! The default strategy is the fragile-but-preserved one: a regex scanning
//! for a small fixed set of Arabic verb phrases ("use", "invoke", "call
//! upon", "using") followed by a bare word token taken as a tool name. The
//! strategy sits behind a trait so a structured tool-call protocol can
//! replace it without touching the run loop.

use regex::Regex;
use std::sync::OnceLock;

/// A tool-invocation intent found in model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAction {
    pub tool: String,
}

/// Strategy for turning free-text model output into an action.
///
/// Returning `None` means the output carries no tool intent; the run loop
/// treats that as a satisfied run, not an error.
pub trait ActionSelector: Send + Sync {
    fn select(&self, thought: &str) -> Option<SelectedAction>;
}

/// Default selector: trigger-phrase regex over the Arabic verb lexicon.
/// The token may be bare or wrapped in single or double quotes.
#[derive(Debug, Default)]
pub struct TriggerPhraseSelector;

fn trigger_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(?:استخدم|استدعِ|استعن بـ|استخدام)\s+["']?(\w+)["']?"#)
            .expect("trigger pattern is valid")
    })
}

impl ActionSelector for TriggerPhraseSelector {
    fn select(&self, thought: &str) -> Option<SelectedAction> {
        trigger_pattern()
            .captures(thought)
            .and_then(|captures| captures.get(1))
            .map(|token| SelectedAction {
                tool: token.as_str().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(text: &str) -> Option<String> {
        TriggerPhraseSelector.select(text).map(|a| a.tool)
    }

    #[test]
    fn matches_each_trigger_verb() {
        assert_eq!(select("استخدم echo"), Some("echo".to_string()));
        assert_eq!(select("استدعِ analyze_code"), Some("analyze_code".to_string()));
        assert_eq!(select("استعن بـ web_search"), Some("web_search".to_string()));
        assert_eq!(select("يمكن استخدام comprehensive_search هنا"), Some("comprehensive_search".to_string()));
    }

    #[test]
    fn matches_quoted_tool_names() {
        assert_eq!(select("استخدم \"market_analysis\" الآن"), Some("market_analysis".to_string()));
        assert_eq!(select("استخدم 'budget_management'"), Some("budget_management".to_string()));
    }

    #[test]
    fn matches_mid_sentence() {
        let text = "بعد التحليل، أرى أنه يجب أن استخدم security_audit على الملف.";
        assert_eq!(select(text), Some("security_audit".to_string()));
    }

    #[test]
    fn plain_text_selects_nothing() {
        assert_eq!(select("اكتمل التحليل ولا حاجة لأي أداة."), None);
        assert_eq!(select("I will just use the echo tool."), None);
        assert_eq!(select(""), None);
    }

    #[test]
    fn first_trigger_wins() {
        let text = "استخدم echo ثم استخدم web_search";
        assert_eq!(select(text), Some("echo".to_string()));
    }
}
