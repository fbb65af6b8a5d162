// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_result::{KnowledgePanel, SearchPage, SearchResult};
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::domain::services::challenge_detector::{ChallengeDetector, MarkerChallengeDetector};
use crate::engines::traits::{BrowserSession, NavigateOptions, PageContent};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

static RESULT_STRATEGIES: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    [
        ("v1 (jscontroller*SC7lYd)", "div[jscontroller*='SC7lYd']"),
        ("v2 (div.g)", "div.g"),
        ("v3 (data-hveid)", "div[data-hveid]"),
    ]
    .into_iter()
    .filter_map(|(name, css)| Selector::parse(css).ok().map(|s| (name, s)))
    .collect()
});
static H3: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static SNIPPET: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-sncf], div[data-snc], div.VwiC3b, span.st, div.st, div[class*='snippet']")
        .unwrap()
});
static PANEL_CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".kp-wholepage, .knowledge-panel, [role='complementary'], #rhs").unwrap()
});
static PANEL_WEBSITE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-attrid='og:website'] a[href], a[data-attrid='visit_official_site']").unwrap());
static PANEL_ADDRESS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-attrid='kc:/location/location:address']").unwrap());
static PANEL_PHONE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-attrid*='phone'], [data-attrid='kc:/local:alt phone']").unwrap()
});
static CONSENT_FORM: Lazy<Selector> =
    Lazy::new(|| Selector::parse("form[action*='consent.google']").unwrap());
static OVERVIEW_DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://)?(?:www\.)?((?:[a-z0-9][-a-z0-9]*\.)+(?:com|org|net|io|co|in|de|uk|fr|ae))\b",
    )
    .unwrap()
});

/// Cookie 同意页上依次尝试的按钮：(选择器, 可见文本)
const CONSENT_BUTTONS: &[(&str, Option<&str>)] = &[
    ("button#L2AGLb", None),
    ("button[aria-label='Accept all']", None),
    ("button", Some("Accept all")),
    ("button", Some("I agree")),
    ("button", Some("Allow all")),
    ("button", Some("Accept")),
    ("button", Some("Agree")),
    ("form[action*='consent'] button", None),
];

const OVERVIEW_MARKERS: &[&str] = &["AI Overview", "Key Contact Information"];
const OVERVIEW_MAX_DEPTH: usize = 8;
const OVERVIEW_MIN_CHARS: usize = 150;
const OVERVIEW_MAX_CHARS: usize = 8000;

/// Google 搜索引擎实现
///
/// 通过浏览器会话访问结果页，支持有头模式下人工处理验证码
pub struct GoogleSearchEngine {
    base_url: String,
    results_limit: usize,
    request_timeout: Duration,
    detector: Box<dyn ChallengeDetector>,
}

impl Default for GoogleSearchEngine {
    fn default() -> Self {
        Self::new("https://www.google.com/search", 20, Duration::from_secs(30))
    }
}

impl GoogleSearchEngine {
    pub fn new(base_url: impl Into<String>, results_limit: usize, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            results_limit,
            request_timeout,
            detector: Box::new(MarkerChallengeDetector::google()),
        }
    }

    /// 替换验证页判定规则
    pub fn with_detector(mut self, detector: Box<dyn ChallengeDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// 构造结果页地址，固定英文界面并关闭个性化
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&hl=en&num={}&pws=0",
            self.base_url,
            urlencoding::encode(query),
            self.results_limit
        )
    }

    /// 解析 Google HTML 结果
    /// 使用多种选择器策略来适应 Google 不断变化的 HTML 结构
    pub fn parse_results(&self, html: &str) -> Vec<SearchResult> {
        let document = Html::parse_document(html);

        let mut containers: Vec<ElementRef<'_>> = Vec::new();
        let mut used_strategy = "v4 (h3 inside a)";
        for (name, selector) in RESULT_STRATEGIES.iter() {
            containers = document.select(selector).collect();
            if !containers.is_empty() {
                used_strategy = name;
                break;
            }
        }

        let mut raw: Vec<(String, String, String)> = Vec::new();
        if containers.is_empty() {
            // 最后的尝试：直接找被链接包裹的 h3
            for h3 in document.select(&H3) {
                let anchor = h3
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|e| e.value().name() == "a");
                if let Some(href) = anchor.and_then(|a| a.value().attr("href")) {
                    raw.push((collect_text(h3), href.to_string(), String::new()));
                }
            }
        } else {
            for element in containers {
                if let Some(entry) = parse_container(element) {
                    raw.push(entry);
                }
            }
        }

        debug!("使用策略 {} 找到 {} 个候选结果", used_strategy, raw.len());

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for (title, href, snippet) in raw {
            let Some(url) = clean_google_url(&href) else {
                continue;
            };
            if title.trim().is_empty() || !seen.insert(url.clone()) {
                continue;
            }
            let rank = results.len();
            results.push(SearchResult::new(title.trim(), url, snippet.trim(), "google", rank));
            if results.len() >= self.results_limit {
                break;
            }
        }
        results
    }

    /// 解析知识面板
    pub fn parse_knowledge_panel(&self, html: &str) -> Option<KnowledgePanel> {
        let document = Html::parse_document(html);
        let address = document
            .select(&PANEL_ADDRESS)
            .next()
            .map(|e| strip_label(&collect_text(e), "Address"));
        let phone = document
            .select(&PANEL_PHONE)
            .next()
            .map(|e| strip_label(&collect_text(e), "Phone"));

        let container = document.select(&PANEL_CONTAINER).next();
        let website = container
            .and_then(|c| c.select(&PANEL_WEBSITE).next())
            .or_else(|| document.select(&PANEL_WEBSITE).next())
            .and_then(|a| a.value().attr("href"))
            .and_then(clean_google_url)
            .or_else(|| {
                container.and_then(|c| {
                    c.select(&LINK)
                        .find(|a| collect_text(*a).trim().eq_ignore_ascii_case("website"))
                        .and_then(|a| a.value().attr("href"))
                        .and_then(clean_google_url)
                })
            });
        let overview = parse_ai_overview(&document);
        let mentioned_websites = overview
            .as_deref()
            .map(extract_overview_domains)
            .unwrap_or_default();
        let text = [container.map(collect_text), overview]
            .into_iter()
            .flatten()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let panel = KnowledgePanel {
            text,
            website,
            phone: phone.filter(|p| !p.is_empty()),
            address: address.filter(|a| !a.is_empty()),
            mentioned_websites,
        };
        (!panel.is_empty()).then_some(panel)
    }

    /// 判断是否落在 Cookie 同意页（consent.google.com 或 "Before you continue" 表单）
    pub fn is_consent_page(&self, page: &PageContent) -> bool {
        let on_consent_host = Url::parse(&page.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.starts_with("consent.")))
            .unwrap_or(false);
        if on_consent_host {
            return true;
        }
        let document = Html::parse_document(&page.html);
        let has_form = document.select(&CONSENT_FORM).next().is_some()
            || page.html.to_lowercase().contains("before you continue to google");
        has_form && self.parse_results(&page.html).is_empty()
    }

    async fn dismiss_consent(&self, session: &dyn BrowserSession) -> Result<(), SearchError> {
        for (selector, text) in CONSENT_BUTTONS {
            if session.click(selector, *text).await? {
                debug!("Accepted Google consent via {} {:?}", selector, text);
                return Ok(());
            }
        }
        Err(SearchError::EngineError(
            "Google consent page could not be dismissed".to_string(),
        ))
    }
}

/// 定位 AI 概览块：从标记文本向上最多回溯若干层，取第一个长度合适的祖先
fn parse_ai_overview(document: &Html) -> Option<String> {
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !OVERVIEW_MARKERS.iter().any(|m| text.contains(m)) {
            continue;
        }
        let found = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(OVERVIEW_MAX_DEPTH)
            .map(collect_text)
            .find(|t| (OVERVIEW_MIN_CHARS + 1..OVERVIEW_MAX_CHARS).contains(&t.len()));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// 提取 AI 概览中提到的域名，归一化为 `https://domain`
fn extract_overview_domains(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    OVERVIEW_DOMAIN_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|d| !d.starts_with("google.") && !d.contains(".google."))
        .filter(|d| seen.insert(d.clone()))
        .map(|d| format!("https://{}", d))
        .collect()
}

fn parse_container(element: ElementRef<'_>) -> Option<(String, String, String)> {
    // 优先取包含 h3 的链接
    let (title, href) = element
        .select(&LINK)
        .find_map(|a| {
            a.select(&H3)
                .next()
                .map(|h3| (collect_text(h3), a.value().attr("href").unwrap_or_default().to_string()))
        })
        .or_else(|| {
            let h3 = element.select(&H3).next()?;
            let a = element.select(&LINK).next()?;
            Some((collect_text(h3), a.value().attr("href")?.to_string()))
        })?;

    let snippet = element
        .select(&SNIPPET)
        .map(collect_text)
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default();
    Some((title, href, snippet))
}

fn collect_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_label(text: &str, label: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix(label)
        .map(|rest| rest.trim_start_matches([':', ' ']).trim().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// 清理 Google 链接：展开 `/url?q=`，丢弃站内链接
pub fn clean_google_url(href: &str) -> Option<String> {
    let base = Url::parse("https://www.google.com/").ok()?;
    let parsed = base.join(href).ok()?;

    let target = if parsed.path() == "/url" {
        let q = parsed
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        Url::parse(&q).ok()?
    } else {
        parsed
    };

    if !matches!(target.scheme(), "http" | "https") {
        return None;
    }
    let host = target.host_str()?.to_ascii_lowercase();
    if host == "google.com" || host.ends_with(".google.com") || host.starts_with("google.") {
        return None;
    }
    Some(target.to_string())
}

#[async_trait]
impl SearchEngine for GoogleSearchEngine {
    async fn search(
        &self,
        query: &str,
        session: &dyn BrowserSession,
    ) -> Result<SearchPage, SearchError> {
        let url = self.search_url(query);
        info!("Google search: {}", query);

        let options = NavigateOptions {
            timeout: self.request_timeout,
            wait_for_selector: Some("#search".to_string()),
        };
        let mut page = session.navigate(&url, &options).await?;

        if self.detector.is_challenge(&page.html) {
            warn!("Google returned a challenge page for query: {}", query);
            return Err(SearchError::challenge(self.name()));
        }

        if self.is_consent_page(&page) {
            info!("Google consent page shown, accepting");
            self.dismiss_consent(session).await?;
            page = session.navigate(&url, &options).await?;
            if self.detector.is_challenge(&page.html) {
                warn!("Google returned a challenge page for query: {}", query);
                return Err(SearchError::challenge(self.name()));
            }
            if self.is_consent_page(&page) {
                warn!("Google consent page persisted after accepting");
                return Err(SearchError::EngineError(
                    "Google consent page could not be dismissed".to_string(),
                ));
            }
        }

        let results = self.parse_results(&page.html);
        let panel = self.parse_knowledge_panel(&page.html);
        info!(
            "Google returned {} results{}",
            results.len(),
            if panel.is_some() { " with knowledge panel" } else { "" }
        );

        let mut search_page = SearchPage::new(results);
        if let Some(panel) = panel {
            search_page = search_page.with_knowledge_panel(panel);
        }
        Ok(search_page)
    }

    fn name(&self) -> &'static str {
        "google"
    }

    fn supports_manual_solve(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::traits::{ElementSnapshot, EngineError};
    use parking_lot::Mutex;

    const RESULTS_HTML: &str = r#"<html><body><div id="search">
        <div class="g"><a href="/url?q=https://acmecorp.ae/&amp;sa=U"><h3>Acme Corp - Official Site</h3></a>
            <div class="VwiC3b">Acme Corp is a Dubai based trading company.</div></div>
        <div class="g"><a href="https://www.linkedin.com/company/acme"><h3>Acme | LinkedIn</h3></a></div>
        <div class="g"><a href="https://acmecorp.ae/"><h3>Duplicate</h3></a></div>
        <div class="g"><a href="/search?q=acme+images"><h3>Images for acme</h3></a></div>
        </div>
        <div class="kp-wholepage">
            <span>Acme Corp</span>
            <div data-attrid="og:website"><a href="https://acmecorp.ae/">Website</a></div>
            <div data-attrid="kc:/location/location:address">Address: Acme Tower, Sheikh Zayed Road, Dubai</div>
            <div data-attrid="kc:/collection/knowledge_panels/has_phone:phone">Phone: +971 4 123 4567</div>
        </div></body></html>"#;

    struct StaticSession {
        html: String,
        visited: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BrowserSession for StaticSession {
        async fn navigate(
            &self,
            url: &str,
            _options: &NavigateOptions,
        ) -> Result<PageContent, EngineError> {
            self.visited.lock().push(url.to_string());
            Ok(PageContent {
                url: url.to_string(),
                html: self.html.clone(),
                text: String::new(),
            })
        }

        async fn find_elements(&self, _selector: &str) -> Result<Vec<ElementSnapshot>, EngineError> {
            Ok(Vec::new())
        }

        async fn click(&self, _selector: &str, _text: Option<&str>) -> Result<bool, EngineError> {
            Ok(false)
        }

        async fn close(&self) -> Result<(), EngineError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    const CONSENT_HTML: &str = r#"<html><body>
        <h1>Before you continue to Google</h1>
        <form action="https://consent.google.com/save"><button>Reject all</button><button>Accept all</button></form>
        </body></html>"#;

    /// 首次访问返回同意页，点击 "Accept all" 后返回正常结果
    struct ConsentSession {
        accepts: bool,
        accepted: Mutex<bool>,
        visited: Mutex<Vec<String>>,
        clicks: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ConsentSession {
        fn new(accepts: bool) -> Self {
            Self {
                accepts,
                accepted: Mutex::new(false),
                visited: Mutex::new(Vec::new()),
                clicks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BrowserSession for ConsentSession {
        async fn navigate(
            &self,
            url: &str,
            _options: &NavigateOptions,
        ) -> Result<PageContent, EngineError> {
            self.visited.lock().push(url.to_string());
            if *self.accepted.lock() {
                Ok(PageContent {
                    url: url.to_string(),
                    html: RESULTS_HTML.to_string(),
                    text: String::new(),
                })
            } else {
                Ok(PageContent {
                    url: "https://consent.google.com/ml?continue=https://www.google.com/search".to_string(),
                    html: CONSENT_HTML.to_string(),
                    text: String::new(),
                })
            }
        }

        async fn find_elements(&self, _selector: &str) -> Result<Vec<ElementSnapshot>, EngineError> {
            Ok(Vec::new())
        }

        async fn click(&self, selector: &str, text: Option<&str>) -> Result<bool, EngineError> {
            self.clicks
                .lock()
                .push((selector.to_string(), text.map(str::to_string)));
            let hit = self.accepts && selector == "button" && text == Some("Accept all");
            if hit {
                *self.accepted.lock() = true;
            }
            Ok(hit)
        }

        async fn close(&self) -> Result<(), EngineError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "consent"
        }
    }

    const OVERVIEW_HTML: &str = r#"<html><body><div id="search">
        <div class="g"><a href="https://www.g2.com/products/42gears"><h3>42Gears Reviews | G2</h3></a></div>
        </div>
        <div class="overview"><div><span>AI Overview</span></div>
            <div>42Gears Mobility Systems is an enterprise mobility management company headquartered in Bengaluru, India.
            Its official website is www.42gears.com and it is also listed on linkedin.com and Google.com search results.
            Key contact: sales@42gears.com, +91 80 6191 4600.</div>
        </div></body></html>"#;

    #[test]
    fn test_parse_results_cleans_and_deduplicates() {
        let engine = GoogleSearchEngine::default();
        let results = engine.parse_results(RESULTS_HTML);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://acmecorp.ae/");
        assert_eq!(results[0].title, "Acme Corp - Official Site");
        assert_eq!(results[0].snippet, "Acme Corp is a Dubai based trading company.");
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[1].url, "https://www.linkedin.com/company/acme");
        assert_eq!(results[1].rank, 1);
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let engine = GoogleSearchEngine::new("https://www.google.com/search", 1, Duration::from_secs(5));
        assert_eq!(engine.parse_results(RESULTS_HTML).len(), 1);
    }

    #[test]
    fn test_parse_results_h3_fallback() {
        let html = r#"<html><body><span><a href="https://acme.io/"><h3>Acme</h3></a></span></body></html>"#;
        let results = GoogleSearchEngine::default().parse_results(html);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://acme.io/");
    }

    #[test]
    fn test_parse_knowledge_panel() {
        let panel = GoogleSearchEngine::default()
            .parse_knowledge_panel(RESULTS_HTML)
            .unwrap();
        assert_eq!(panel.website.as_deref(), Some("https://acmecorp.ae/"));
        assert_eq!(panel.address.as_deref(), Some("Acme Tower, Sheikh Zayed Road, Dubai"));
        assert_eq!(panel.phone.as_deref(), Some("+971 4 123 4567"));
    }

    #[test]
    fn test_clean_google_url() {
        assert_eq!(
            clean_google_url("/url?q=https://acme.com/about&sa=U&ved=x").as_deref(),
            Some("https://acme.com/about")
        );
        assert_eq!(clean_google_url("/search?q=acme"), None);
        assert_eq!(clean_google_url("https://maps.google.com/?q=acme"), None);
        assert_eq!(clean_google_url("javascript:void(0)"), None);
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = GoogleSearchEngine::default().search_url("\"Acme\" official website UAE");
        assert!(url.starts_with("https://www.google.com/search?q=%22Acme%22%20official%20website%20UAE"));
        assert!(url.contains("hl=en"));
    }

    #[tokio::test]
    async fn test_search_reports_challenge() {
        let session = StaticSession {
            html: r#"<html><body><form id="captcha-form"></form>unusual traffic</body></html>"#.to_string(),
            visited: Mutex::new(Vec::new()),
        };
        let err = GoogleSearchEngine::default()
            .search("acme", &session)
            .await
            .unwrap_err();
        assert_eq!(err, SearchError::challenge("google"));
        assert_eq!(session.visited.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_search_returns_page_with_panel() {
        let session = StaticSession {
            html: RESULTS_HTML.to_string(),
            visited: Mutex::new(Vec::new()),
        };
        let page = GoogleSearchEngine::default()
            .search("acme", &session)
            .await
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert!(page.knowledge_panel.is_some());
    }

    #[test]
    fn test_consent_page_detection() {
        let engine = GoogleSearchEngine::default();
        let on_host = PageContent {
            url: "https://consent.google.com/ml?continue=x".to_string(),
            html: "<html></html>".to_string(),
            text: String::new(),
        };
        let form_only = PageContent {
            url: "https://www.google.com/search?q=acme".to_string(),
            html: CONSENT_HTML.to_string(),
            text: String::new(),
        };
        let results = PageContent {
            url: "https://www.google.com/search?q=acme".to_string(),
            html: RESULTS_HTML.to_string(),
            text: String::new(),
        };
        assert!(engine.is_consent_page(&on_host));
        assert!(engine.is_consent_page(&form_only));
        assert!(!engine.is_consent_page(&results));
    }

    #[tokio::test]
    async fn test_search_accepts_consent_and_renavigates() {
        let session = ConsentSession::new(true);
        let page = GoogleSearchEngine::default()
            .search("acme", &session)
            .await
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(session.visited.lock().len(), 2);
        assert_eq!(
            session.clicks.lock().last().cloned(),
            Some(("button".to_string(), Some("Accept all".to_string())))
        );
    }

    #[tokio::test]
    async fn test_search_fails_over_when_consent_cannot_be_dismissed() {
        let session = ConsentSession::new(false);
        let err = GoogleSearchEngine::default()
            .search("acme", &session)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::EngineError(_)));
        assert!(!err.is_challenge());
        assert_eq!(session.visited.lock().len(), 1);
        assert_eq!(session.clicks.lock().len(), CONSENT_BUTTONS.len());
    }

    #[test]
    fn test_parse_ai_overview_text_and_domains() {
        let panel = GoogleSearchEngine::default()
            .parse_knowledge_panel(OVERVIEW_HTML)
            .unwrap();
        assert!(panel.text.contains("headquartered in Bengaluru"));
        assert_eq!(
            panel.mentioned_websites,
            vec!["https://42gears.com".to_string(), "https://linkedin.com".to_string()]
        );
        assert!(panel.website.is_none());
    }

    #[test]
    fn test_page_without_overview_has_no_mentions() {
        let panel = GoogleSearchEngine::default()
            .parse_knowledge_panel(RESULTS_HTML)
            .unwrap();
        assert!(panel.mentioned_websites.is_empty());
    }
}
