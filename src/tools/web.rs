//! Web access tools: DuckDuckGo HTML search and URL fetching.
//!
//! Both tools return structured JSON payloads. The search scrapes the
//! no-JavaScript DuckDuckGo endpoint, so no API key is needed; the fetch
//! strips HTML down to readable text before returning it.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::Reasoner;
use crate::llm::truncate_message;

use super::{required_str, Tool};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; TrinityAgents/1.0)";

/// Maximum characters of page text returned by `fetch_url`.
const FETCH_TEXT_CAP: usize = 20_000;

/// Search the web via the DuckDuckGo HTML endpoint.
pub struct WebSearch;

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "البحث في الويب عن معلومات حديثة"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "عبارة البحث"},
                "max_results": {"type": "integer", "description": "الحد الأقصى لعدد النتائج"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
        let query = required_str(&args, "query")?;
        let max_results = args["max_results"].as_u64().unwrap_or(5) as usize;

        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let html = client.get(&url).send().await?.text().await?;

        let results = extract_search_results(&html, max_results);

        Ok(json!({
            "query": query,
            "total_results": results.len(),
            "results": results,
        }))
    }
}

/// Pull `{title, snippet, url}` entries out of DuckDuckGo result HTML.
/// Split-based extraction; tolerant of missing fragments.
fn extract_search_results(html: &str, max: usize) -> Vec<Value> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        if results.len() >= max {
            break;
        }

        let title = chunk
            .split("class=\"result__a\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("");

        if title.is_empty() {
            continue;
        }

        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("");

        let url = chunk
            .split("class=\"result__url\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .map(str::trim)
            .unwrap_or("");

        results.push(json!({
            "title": html_decode(title),
            "snippet": html_decode(snippet),
            "url": url,
        }));
    }

    results
}

/// Fetch a URL and return its readable text.
pub struct FetchUrl;

#[async_trait]
impl Tool for FetchUrl {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "جلب محتوى صفحة ويب وقراءته"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "الرابط المطلوب"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
        let url = required_str(&args, "url")?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("HTTP error: {}", status));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        let (title, text) = if content_type.contains("text/html") {
            (extract_title(&body), extract_text_from_html(&body))
        } else {
            (String::new(), body)
        };

        Ok(json!({
            "url": url,
            "title": title,
            "text": truncate_message(&text, FETCH_TEXT_CAP),
        }))
    }
}

fn extract_title(html: &str) -> String {
    html.split("<title")
        .nth(1)
        .and_then(|s| s.split('>').nth(1))
        .and_then(|s| s.split('<').next())
        .map(|s| html_decode(s.trim()))
        .unwrap_or_default()
}

/// Strip scripts, styles and tags; collapse whitespace.
fn extract_text_from_html(html: &str) -> String {
    let mut text = html.to_string();

    while let Some(start) = text.find("<script") {
        match text[start..].find("</script>") {
            Some(end) => text.replace_range(start..start + end + "</script>".len(), ""),
            None => break,
        }
    }
    while let Some(start) = text.find("<style") {
        match text[start..].find("</style>") {
            Some(end) => text.replace_range(start..start + end + "</style>".len(), ""),
            None => break,
        }
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                stripped.push(' ');
            }
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    html_decode(&stripped.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Decode the handful of HTML entities DuckDuckGo emits.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
