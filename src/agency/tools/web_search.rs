//! Web 搜索工具：抓取体育站点页面并提取可读文本
//!
//! 仅允许配置白名单内的域名（ESPN、NBA 官网、basketball-reference 等）；
//! GET 请求带超时与 User-Agent；响应超过 max_result_chars 时截断并追加 ...[truncated]。
//! 对 HTML 响应使用 html2text 提取可读文本。

use std::collections::HashSet;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::agency::tools::{Tool, ToolResult};
use crate::config::WebSearchSection;

/// Web 搜索工具：抓取 URL 内容，仅允许白名单域名
pub struct WebSearchTool {
    client: Client,
    allowed_domains: HashSet<String>,
    max_result_chars: usize,
}

/// 简易去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut prev_whitespace = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => {
                let is_whitespace = c.is_whitespace();
                if is_whitespace && prev_whitespace {
                    continue;
                }
                prev_whitespace = is_whitespace;
                out.push(if is_whitespace { ' ' } else { c });
            }
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// 判断内容是否像 HTML（需提取可读文本）
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.starts_with("<html")
        || s.starts_with("<HTML")
        || (s.len() > 20
            && s.contains('<')
            && (s.contains("</") || s.contains("<meta") || s.contains("<head") || s.contains("<title")))
}

/// 从 URL 中提取 host（不含端口与路径）
fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    let url = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let host = url.split('/').next()?;
    let host = host.split(':').next()?;
    Some(host.to_lowercase())
}

impl WebSearchTool {
    pub fn new(cfg: &WebSearchSection) -> Self {
        let allowed_domains = cfg
            .allowed_domains
            .iter()
            .map(|s| s.to_lowercase())
            .collect();
        const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            allowed_domains,
            max_result_chars: cfg.max_result_chars,
        }
    }

    fn is_allowed(&self, url: &str) -> Result<(), String> {
        let domain = extract_domain(url).ok_or_else(|| "Invalid or missing URL".to_string())?;
        if self.allowed_domains.contains(&domain) {
            return Ok(());
        }
        Err(format!("Domain not in allowlist: {}", domain))
    }

    fn html_to_text(&self, html: &str) -> String {
        match from_read(html.as_bytes(), 120) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => strip_html_tags(html),
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        self.is_allowed(url)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let mut body = resp.text().await.map_err(|e| format!("Read body: {}", e))?;

        if body.starts_with('\u{FEFF}') {
            body = body[1..].to_string();
        }

        let body = if looks_like_html(&body) {
            self.html_to_text(&body)
        } else {
            body
        };

        let len = body.chars().count();
        if len > self.max_result_chars {
            Ok(body.chars().take(self.max_result_chars).collect::<String>() + "\n...[truncated]")
        } else {
            Ok(body)
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Fetch a page from an allowlisted sports site (ESPN, NBA.com, basketball-reference, etc). Args: {\"url\": \"https://...\"}."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Full URL on an allowlisted domain"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>) -> ToolResult {
        let url = args.get("url").and_then(|v| v.as_str()).unwrap_or("").trim();
        if url.is_empty() {
            return ToolResult::fail("Missing url");
        }
        tracing::info!(url = %url, "web search fetch");
        match self.fetch(url).await {
            Ok(text) => {
                let mut metadata = Map::new();
                metadata.insert("url".into(), json!(url));
                metadata.insert("chars".into(), json!(text.chars().count()));
                ToolResult::ok_with_metadata(json!(text), metadata)
            }
            Err(e) => ToolResult::fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_allowlist() {
        let tool = WebSearchTool::new(&WebSearchSection::default());
        assert!(tool.is_allowed("https://www.espn.com/nba/").is_ok());
        assert!(tool.is_allowed("https://evil.example.com/x").is_err());
        assert!(tool.is_allowed("not a url").is_err());
    }

    #[tokio::test]
    async fn test_missing_url_fails() {
        let tool = WebSearchTool::new(&WebSearchSection::default());
        let result = tool.execute(&Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Missing url"));
    }
}
