//! Polymath, the research/synthesis persona.
//!
//! Owns a knowledge graph mapping each concept to its connected concepts.
//! The search tool is simulated over a canned relevance-ranked pool; the
//! two real HTTP collaborators (`web_search`, `fetch_url`) come from
//! [`crate::tools::web`]. The deep-research tool composes search, concept
//! extraction, graph insertion and insight generation into one report.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::info;

use crate::agent::{Agent, AgentProfile, Reasoner};
use crate::config::Config;
use crate::llm::LlmClient;
use crate::memory::MemoryStore;
use crate::tools::web::{FetchUrl, WebSearch};
use crate::tools::{error_payload, required_str, str_or, string_array, Tool};

const ROLE: &str = "باحث ومركّب معرفي متعدد التخصصات";

const DESCRIPTION: &str = r#"باحث ذكي قادر على:
- البحث العميق في مصادر متعددة
- تحليل واستخراج المعلومات المهمة
- ربط المفاهيم من مجالات علمية مختلفة
- اكتشاف أنماط وأفكار جديدة
- تقديم رؤى قابلة للتنفيذ"#;

const DEFAULT_SOURCES: [&str; 3] = ["web", "news", "academic"];
const DEFAULT_DOMAINS: [&str; 3] = ["technology", "science", "business"];

/// Build the polymath agent.
pub fn build(config: &Config, llm: Option<Arc<dyn LlmClient>>) -> anyhow::Result<Agent> {
    let graph: SharedGraph = Arc::new(RwLock::new(HashMap::new()));

    let mut profile = AgentProfile::new("Polymath", ROLE, DESCRIPTION);
    profile.temperature = 0.3;

    let memory = Arc::new(MemoryStore::new(
        config.workspace_path.join("memory").join("polymath"),
    ));

    let mut agent = Agent::new(profile, llm)
        .with_max_iterations(config.max_iterations)
        .with_memory(memory);
    agent.register_tool(Arc::new(ComprehensiveSearch));
    agent.register_tool(Arc::new(ExtractData));
    agent.register_tool(Arc::new(ConnectConcepts {
        graph: Arc::clone(&graph),
    }));
    agent.register_tool(Arc::new(GenerateInsights));
    agent.register_tool(Arc::new(ConductDeepResearch { graph }));
    agent.register_tool(Arc::new(WebSearch));
    agent.register_tool(Arc::new(FetchUrl));

    info!("polymath persona ready");
    Ok(agent)
}

/// One edge in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConnection {
    pub concept_a: String,
    pub concept_b: String,
    pub connection_type: String,
    pub confidence: f64,
    pub explanation: String,
}

/// concept -> { connected concept -> connection }
type SharedGraph = Arc<RwLock<HashMap<String, HashMap<String, KnowledgeConnection>>>>;

/// Simulated multi-source search over a canned relevance-ranked pool.
struct ComprehensiveSearch;

fn depth_to_results(depth: &str) -> usize {
    match depth {
        "shallow" => 3,
        "deep" => 10,
        _ => 5,
    }
}

fn simulated_results(query: &str, requested: usize) -> Vec<Value> {
    let pool = [
        (format!("نتيجة بحث 1 عن {query}"), format!("محتوى متعلق بـ {query}"), 0.9),
        (format!("نتيجة بحث 2 عن {query}"), format!("معلومات مهمة حول {query}"), 0.85),
        (format!("نتيجة بحث 3 عن {query}"), format!("تحليل شامل لـ {query}"), 0.8),
    ];

    pool.into_iter()
        .take(requested)
        .enumerate()
        .map(|(index, (title, snippet, relevance))| {
            json!({
                "title": title,
                "url": format!("https://example{}.com/{}", index + 1, query),
                "snippet": snippet,
                "relevance": relevance,
            })
        })
        .collect()
}

fn run_comprehensive_search(query: &str, sources: Vec<String>, depth: &str) -> Value {
    let results = simulated_results(query, depth_to_results(depth));
    json!({
        "query": query,
        "sources_searched": sources,
        "total_results": results.len(),
        "top_results": results,
        "timestamp": Utc::now(),
    })
}

#[async_trait]
impl Tool for ComprehensiveSearch {
    fn name(&self) -> &str {
        "comprehensive_search"
    }

    fn description(&self) -> &str {
        "بحث شامل في مصادر متعددة"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "سؤال البحث"},
                "sources": {"type": "array", "description": "المصادر المطلوبة"},
                "depth": {"type": "string", "description": "عمق البحث"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
        let query = required_str(&args, "query")?;
        let sources = string_array(&args, "sources")
            .unwrap_or_else(|| DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect());
        let depth = str_or(&args, "depth", "medium");
        Ok(run_comprehensive_search(query, sources, depth))
    }
}

/// LLM-delegated extraction of typed data from free text.
struct ExtractData;

#[async_trait]
impl Tool for ExtractData {
    fn name(&self) -> &str {
        "extract_data"
    }

    fn description(&self) -> &str {
        "استخراج بيانات محددة من نص أو صفحة"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {"type": "string", "description": "المحتوى"},
                "data_type": {"type": "string", "description": "نوع البيانات"}
            },
            "required": ["content", "data_type"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let content = required_str(&args, "content")?;
        let data_type = required_str(&args, "data_type")?;

        let prompt = format!(
            r#"استخرج بيانات النوع '{data_type}' من النص التالي:

النص:
{content}

قدم البيانات المستخرجة كـ JSON:"#
        );

        let mut context = Map::new();
        context.insert("action".to_string(), json!("extract"));
        context.insert("data_type".to_string(), json!(data_type));
        let extraction = reasoner.think(&prompt, Some(&context)).await;

        Ok(json!({
            "data_type": data_type,
            "extracted_data": { "raw": extraction },
            "content_length": content.chars().count(),
        }))
    }
}

/// Pairwise knowledge-graph insertion plus an LLM reading of the links.
struct ConnectConcepts {
    graph: SharedGraph,
}

async fn run_connect_concepts(
    reasoner: &Reasoner,
    graph: &SharedGraph,
    concepts: Vec<String>,
    domains: Vec<String>,
) -> Value {
    if concepts.is_empty() {
        return error_payload("at least one concept is required");
    }

    let prompt = format!(
        r#"ابحث عن روابط بين المفاهيم التالية من مجالات مختلفة:

المفاهيم: {}
المجالات: {}

لكل زوج مفاهيم، حدد:
1. هل هناك تشابه؟
2. هل هناك تكامل؟
3. ما الفائدة من هذا الربط؟"#,
        json!(concepts),
        json!(domains)
    );

    let mut context = Map::new();
    context.insert("action".to_string(), json!("connect"));
    context.insert("concepts".to_string(), json!(concepts));
    let analysis = reasoner.think(&prompt, Some(&context)).await;

    {
        let mut graph = graph.write().await;
        for (i, concept_a) in concepts.iter().enumerate() {
            for concept_b in &concepts[i + 1..] {
                let connection = KnowledgeConnection {
                    concept_a: concept_a.clone(),
                    concept_b: concept_b.clone(),
                    connection_type: "complementary".to_string(),
                    confidence: 0.7,
                    explanation: analysis.clone(),
                };
                graph
                    .entry(concept_a.clone())
                    .or_default()
                    .insert(concept_b.clone(), connection);
            }
        }
    }

    let count = concepts.len() * (concepts.len() - 1) / 2;
    json!({
        "concepts": concepts,
        "domains": domains,
        "analysis": analysis,
        "connections_count": count,
    })
}

#[async_trait]
impl Tool for ConnectConcepts {
    fn name(&self) -> &str {
        "connect_concepts"
    }

    fn description(&self) -> &str {
        "ربط مفهومين أو أكثر من مجالات مختلفة"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "concepts": {"type": "array", "description": "المفاهيم"},
                "domains": {"type": "array", "description": "المجالات"}
            },
            "required": ["concepts"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let concepts = string_array(&args, "concepts")
            .ok_or_else(|| anyhow::anyhow!("Missing 'concepts' argument"))?;
        let domains = string_array(&args, "domains")
            .unwrap_or_else(|| DEFAULT_DOMAINS.iter().map(|s| s.to_string()).collect());
        Ok(run_connect_concepts(reasoner, &self.graph, concepts, domains).await)
    }
}

/// LLM-delegated insight generation with canned pattern lists.
struct GenerateInsights;

async fn run_generate_insights(reasoner: &Reasoner, data: &Value, context_text: &str) -> Value {
    let prompt = format!(
        r#"بناءً على البيانات التالية، قدم رؤى قابلة للتنفيذ:

السياق: {context_text}

البيانات:
{}

قدم:
1. الأنماط المكتشفة
2. الفرص المخفية
3. التوصيات العملية"#,
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    );

    let mut context = Map::new();
    context.insert("action".to_string(), json!("insights"));
    let insights = reasoner.think(&prompt, Some(&context)).await;

    json!({
        "context": context_text,
        "insights": insights,
        "patterns": ["recurring theme", "emerging trend"],
        "opportunities": ["untapped segment", "cross-domain transfer"],
        "recommendations": ["validate with primary sources", "prototype the strongest link"],
    })
}

#[async_trait]
impl Tool for GenerateInsights {
    fn name(&self) -> &str {
        "generate_insights"
    }

    fn description(&self) -> &str {
        "توليد رؤى من مجموعة بيانات"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {"type": "object", "description": "البيانات"},
                "context": {"type": "string", "description": "السياق"}
            },
            "required": ["data"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let data = args
            .get("data")
            .filter(|v| !v.is_null())
            .ok_or_else(|| anyhow::anyhow!("Missing 'data' argument"))?
            .clone();
        let context_text = str_or(&args, "context", "");
        Ok(run_generate_insights(reasoner, &data, context_text).await)
    }
}

/// Composite research: search, extract concepts, connect them, distill
/// insights into a synthesis report.
struct ConductDeepResearch {
    graph: SharedGraph,
}

/// Stop-word-filtered concept extraction, first occurrence order, max 10.
fn extract_concepts(topic: &str) -> Vec<String> {
    const STOP_WORDS: [&str; 18] = [
        "the", "a", "an", "is", "are", "in", "on", "at", "to", "for", "of", "and", "or", "في",
        "من", "على", "و", "أو",
    ];

    let word_pattern = Regex::new(r"[A-Za-z\u{0621}-\u{064A}]+").expect("word pattern is valid");
    let mut seen = HashSet::new();
    let mut concepts = Vec::new();

    for token in word_pattern.find_iter(topic) {
        let word = token.as_str();
        let lowered = word.to_lowercase();
        if word.chars().count() <= 2 || STOP_WORDS.contains(&lowered.as_str()) {
            continue;
        }
        if seen.insert(lowered) {
            concepts.push(word.to_string());
        }
        if concepts.len() == 10 {
            break;
        }
    }

    concepts
}

#[async_trait]
impl Tool for ConductDeepResearch {
    fn name(&self) -> &str {
        "conduct_deep_research"
    }

    fn description(&self) -> &str {
        "إجراء بحث عميق وشامل في موضوع معين"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {"type": "string", "description": "موضوع البحث"},
                "domains": {"type": "array", "description": "المجالات"},
                "depth": {"type": "string", "description": "عمق البحث"}
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let topic = required_str(&args, "topic")?;
        let domains = string_array(&args, "domains")
            .unwrap_or_else(|| DEFAULT_DOMAINS.iter().map(|s| s.to_string()).collect());
        let depth = str_or(&args, "depth", "deep");

        let search_results = run_comprehensive_search(
            topic,
            DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            depth,
        );

        let concepts = extract_concepts(topic);
        let connections =
            run_connect_concepts(reasoner, &self.graph, concepts, domains).await;

        let insights = run_generate_insights(
            reasoner,
            &json!({
                "research_results": search_results,
                "connections": connections,
            }),
            &format!("Deep research on {}", topic),
        )
        .await;

        let sources_analyzed = search_results["top_results"]
            .as_array()
            .map_or(0, Vec::len);

        Ok(json!({
            "report_id": format!("sr_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            "topic": topic,
            "executive_summary": format!("بحث شامل في مجال {}", topic),
            "key_insights": insights["insights"],
            "connections_found": connections["connections_count"],
            "sources_analyzed": sources_analyzed,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::StubLlm;
    use std::path::PathBuf;

    fn reasoner() -> Reasoner {
        Reasoner::new("Polymath", None, "system".to_string(), 0.3, 4096)
    }

    fn stub_reasoner(reply: &str) -> Reasoner {
        Reasoner::new("Polymath", Some(StubLlm::new(reply)), "system".to_string(), 0.3, 4096)
    }

    fn empty_graph() -> SharedGraph {
        Arc::new(RwLock::new(HashMap::new()))
    }

    #[tokio::test]
    async fn search_depth_bounds_the_result_count() {
        let shallow = ComprehensiveSearch
            .execute(json!({"query": "رؤية", "depth": "shallow"}), &reasoner())
            .await
            .expect("search");
        assert_eq!(shallow["total_results"], 3);

        // The canned pool holds three entries, so deeper requests cap there.
        let deep = ComprehensiveSearch
            .execute(json!({"query": "رؤية", "depth": "deep"}), &reasoner())
            .await
            .expect("search");
        assert_eq!(deep["total_results"], 3);

        let results = deep["top_results"].as_array().expect("results");
        assert_eq!(results[0]["relevance"], 0.9);
        assert!(results[0]["title"]
            .as_str()
            .expect("title")
            .contains("رؤية"));
    }

    #[tokio::test]
    async fn search_defaults_its_sources() {
        let result = ComprehensiveSearch
            .execute(json!({"query": "طاقة"}), &reasoner())
            .await
            .expect("search");
        assert_eq!(result["sources_searched"], json!(["web", "news", "academic"]));
        assert_eq!(result["total_results"], 3);
    }

    #[tokio::test]
    async fn extract_data_wraps_the_model_reply() {
        let result = ExtractData
            .execute(
                json!({"content": "النص الكامل هنا", "data_type": "dates"}),
                &stub_reasoner("{\"dates\": []}"),
            )
            .await
            .expect("extract");

        assert_eq!(result["data_type"], "dates");
        assert_eq!(result["extracted_data"]["raw"], "{\"dates\": []}");
        assert_eq!(result["content_length"], 15);
    }

    #[tokio::test]
    async fn connect_concepts_populates_the_graph_pairwise() {
        let graph = empty_graph();
        let tool = ConnectConcepts {
            graph: Arc::clone(&graph),
        };

        let result = tool
            .execute(
                json!({"concepts": ["ذكاء", "تعليم", "صحة"]}),
                &stub_reasoner("روابط قوية"),
            )
            .await
            .expect("connect");

        assert_eq!(result["connections_count"], 3);
        assert_eq!(result["analysis"], "روابط قوية");
        assert_eq!(result["domains"], json!(["technology", "science", "business"]));

        let graph = graph.read().await;
        let edges = &graph["ذكاء"];
        assert_eq!(edges.len(), 2);
        let connection = &edges["تعليم"];
        assert_eq!(connection.connection_type, "complementary");
        assert_eq!(connection.confidence, 0.7);
        assert_eq!(connection.explanation, "روابط قوية");
    }

    #[tokio::test]
    async fn connecting_no_concepts_is_an_error_payload() {
        let tool = ConnectConcepts { graph: empty_graph() };
        let result = tool
            .execute(json!({"concepts": []}), &reasoner())
            .await
            .expect("handler runs");
        assert_eq!(result["error"], "at least one concept is required");
    }

    #[tokio::test]
    async fn generate_insights_requires_its_data() {
        let err = GenerateInsights
            .execute(json!({"context": "بدون بيانات"}), &reasoner())
            .await
            .expect_err("missing data is a schema mismatch");
        assert!(err.to_string().contains("data"));

        let result = GenerateInsights
            .execute(
                json!({"data": {"metric": 7}}),
                &stub_reasoner("رؤية مفيدة"),
            )
            .await
            .expect("insights");
        assert_eq!(result["context"], "");
        assert_eq!(result["insights"], "رؤية مفيدة");
        assert_eq!(result["patterns"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn concept_extraction_filters_stop_words_and_short_tokens() {
        let concepts = extract_concepts("the impact of الذكاء الاصطناعي on renewable energy");
        assert_eq!(
            concepts,
            vec!["impact", "الذكاء", "الاصطناعي", "renewable", "energy"]
        );

        // Duplicates collapse to their first occurrence.
        let repeated = extract_concepts("energy and Energy and ENERGY");
        assert_eq!(repeated, vec!["energy"]);
    }

    #[test]
    fn concept_extraction_caps_at_ten() {
        let topic = "alpha beta gamma delta epsilon zeta theta iota kappa lambda omicron sigma";
        assert_eq!(extract_concepts(topic).len(), 10);
    }

    #[tokio::test]
    async fn deep_research_composes_a_synthesis_report() {
        let graph = empty_graph();
        let tool = ConductDeepResearch {
            graph: Arc::clone(&graph),
        };

        let result = tool
            .execute(
                json!({"topic": "الطاقة المتجددة والتخزين"}),
                &stub_reasoner("تحليل عميق"),
            )
            .await
            .expect("research");

        assert!(result["report_id"].as_str().expect("id").starts_with("sr_"));
        assert_eq!(result["topic"], "الطاقة المتجددة والتخزين");
        assert_eq!(result["key_insights"], "تحليل عميق");
        assert_eq!(result["sources_analyzed"], 3);
        // Three concepts survive the stop-word filter, giving three pairs.
        assert_eq!(result["connections_found"], 3);
        assert!(!graph.read().await.is_empty());
    }

    #[tokio::test]
    async fn build_registers_research_and_web_tools() {
        let config = Config::new(PathBuf::from("/tmp/trinity-test-ws"));
        let agent = build(&config, None).expect("build succeeds");

        assert_eq!(agent.name(), "Polymath");
        assert_eq!(
            agent.tool_names(),
            vec![
                "comprehensive_search",
                "extract_data",
                "connect_concepts",
                "generate_insights",
                "conduct_deep_research",
                "web_search",
                "fetch_url"
            ]
        );
    }
}
