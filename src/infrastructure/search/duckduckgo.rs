// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_result::{SearchPage, SearchResult};
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::domain::services::challenge_detector::{ChallengeDetector, MarkerChallengeDetector};
use crate::engines::traits::BrowserSession;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".result").unwrap());
static RESULT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__a").unwrap());
static RESULT_SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__snippet, .result__snippet").unwrap());

/// DuckDuckGo HTML 端点的搜索引擎实现
///
/// 直接发 HTTP 请求，不占用浏览器会话
pub struct DuckDuckGoSearchEngine {
    client: Client,
    base_url: String,
    results_limit: usize,
    detector: Box<dyn ChallengeDetector>,
}

impl DuckDuckGoSearchEngine {
    /// 创建 DuckDuckGo 搜索引擎
    ///
    /// # Arguments
    ///
    /// * `base_url` - HTML 端点地址（测试时可指向模拟服务器）
    /// * `user_agent` - 请求使用的 UA
    /// * `timeout` - 请求超时
    /// * `results_limit` - 最多保留的结果数
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
        results_limit: usize,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| SearchError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            results_limit,
            detector: Box::new(MarkerChallengeDetector::duckduckgo()),
        })
    }

    /// 解析结果页
    pub fn parse_results(&self, html: &str) -> Vec<SearchResult> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for element in document.select(&RESULT) {
            let classes = element.value().attr("class").unwrap_or_default();
            if classes.contains("result--ad") {
                continue;
            }
            let Some(link) = element.select(&RESULT_LINK).next() else {
                continue;
            };
            let Some(url) = link.value().attr("href").and_then(decode_redirect) else {
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }
            let title = link.text().collect::<String>();
            let snippet = element
                .select(&RESULT_SNIPPET)
                .next()
                .map(|s| s.text().collect::<String>())
                .unwrap_or_default();

            let rank = results.len();
            results.push(SearchResult::new(title.trim(), url, snippet.trim(), "duckduckgo", rank));
            if results.len() >= self.results_limit {
                break;
            }
        }
        results
    }
}

/// 展开 `//duckduckgo.com/l/?uddg=...` 跳转链接，丢弃广告链接
pub fn decode_redirect(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let parsed = base.join(href.trim()).ok()?;

    let target = match parsed.host_str() {
        Some(host) if host.ends_with("duckduckgo.com") => {
            if parsed.path().starts_with("/y.js") {
                return None;
            }
            let uddg = parsed
                .query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())?;
            Url::parse(&uddg).ok()?
        }
        _ => parsed,
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearchEngine {
    async fn search(
        &self,
        query: &str,
        _session: &dyn BrowserSession,
    ) -> Result<SearchPage, SearchError> {
        info!("DuckDuckGo search: {}", query);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        let html = response
            .text()
            .await
            .map_err(|e| SearchError::NetworkError(format!("Failed to read response body: {}", e)))?;

        if self.detector.is_challenge(&html) {
            warn!("DuckDuckGo returned an anomaly page for query: {}", query);
            return Err(SearchError::challenge(self.name()));
        }
        if !status.is_success() {
            return Err(SearchError::NetworkError(format!(
                "DuckDuckGo returned status: {}",
                status
            )));
        }
        if html.contains("Error getting results") {
            return Err(SearchError::EngineError(
                "DuckDuckGo error page".to_string(),
            ));
        }

        let results = self.parse_results(&html);
        info!("DuckDuckGo returned {} results", results.len());
        Ok(SearchPage::new(results))
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}
