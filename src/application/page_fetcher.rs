// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::FetchSettings;
use crate::domain::services::contact_extractor::ContactExtractor;
use crate::engines::traits::{BrowserSession, EngineError, NavigateOptions, PageContent};
use crate::utils::url_utils::{host_matches, host_of, parse_website, resolve_url};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// 主页没有联系信息时依次尝试的固定路径
pub const CONTACT_PATHS: &[&str] = &[
    "/contact",
    "/contact-us",
    "/about",
    "/about-us",
    "/get-in-touch",
    "/reach-us",
    "/support",
];

/// 链接文本或 href 中表示联系页的关键词
const CONTACT_HINTS: &[&str] = &[
    "contact",
    "about",
    "reach us",
    "reach-us",
    "get in touch",
    "get-in-touch",
    "support",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("Timed out loading {url}")]
    Timeout { url: String },
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
}

impl FetchError {
    fn from_engine(url: &str, error: EngineError) -> Self {
        match error {
            EngineError::Timeout => FetchError::Timeout {
                url: url.to_string(),
            },
            other => FetchError::Navigation {
                url: url.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// 网站页面加载器
///
/// 主页加载失败时用更长的超时重试一次；主页没有邮箱或电话时
/// 再加载至多 `max_subpages` 个联系页
#[derive(Debug, Clone)]
pub struct PageFetcher {
    timeout: Duration,
    retry_timeout: Duration,
    max_subpages: usize,
    extractor: ContactExtractor,
}

impl PageFetcher {
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            retry_timeout: settings.retry_timeout(),
            max_subpages: settings.max_subpages,
            extractor: ContactExtractor::new(),
        }
    }

    /// 加载网站主页及必要的联系页
    ///
    /// # 参数
    ///
    /// * `website` - 选中的网站根地址
    /// * `session` - 浏览器会话
    ///
    /// # 返回值
    ///
    /// 成功加载的页面，主页总在第一个
    pub async fn fetch(
        &self,
        website: &str,
        session: &dyn BrowserSession,
    ) -> Result<Vec<PageContent>, FetchError> {
        let homepage = self.fetch_homepage(website, session).await?;
        let mut pages = vec![homepage];

        if self.has_contact_signals(&pages[0]) || self.max_subpages == 0 {
            return Ok(pages);
        }

        let candidates = self.subpage_candidates(&pages[0], session).await;
        debug!("Contact page candidates for {}: {:?}", website, candidates);

        for url in candidates.into_iter().take(self.max_subpages) {
            match session
                .navigate(url.as_str(), &NavigateOptions::with_timeout(self.timeout))
                .await
            {
                Ok(page) => {
                    let found = self.has_contact_signals(&page);
                    pages.push(page);
                    if found {
                        break;
                    }
                }
                Err(e) => warn!("Skipping sub-page {}: {}", url, e),
            }
        }

        info!("Fetched {} page(s) for {}", pages.len(), website);
        Ok(pages)
    }

    async fn fetch_homepage(
        &self,
        website: &str,
        session: &dyn BrowserSession,
    ) -> Result<PageContent, FetchError> {
        match session
            .navigate(website, &NavigateOptions::with_timeout(self.timeout))
            .await
        {
            Ok(page) => Ok(page),
            Err(first) => {
                warn!(
                    "Loading {} failed ({}), retrying with {:?} timeout",
                    website, first, self.retry_timeout
                );
                session
                    .navigate(website, &NavigateOptions::with_timeout(self.retry_timeout))
                    .await
                    .map_err(|e| FetchError::from_engine(website, e))
            }
        }
    }

    fn has_contact_signals(&self, page: &PageContent) -> bool {
        self.extractor
            .extract_page(page)
            .map(|bundle| !bundle.emails.is_empty() || !bundle.phones.is_empty())
            .unwrap_or(false)
    }

    /// 联系页候选：主页上的联系链接（页脚优先），然后是固定路径
    async fn subpage_candidates(&self, homepage: &PageContent, session: &dyn BrowserSession) -> Vec<Url> {
        let Some(base) = parse_website(&homepage.url) else {
            return Vec::new();
        };
        let home_host = host_of(&base).unwrap_or_default();

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(normalized(&base));
        let mut candidates = Vec::new();

        for selector in ["footer a[href]", "a[href]"] {
            let links = match session.find_elements(selector).await {
                Ok(links) => links,
                Err(e) => {
                    debug!("Link lookup {} failed: {}", selector, e);
                    continue;
                }
            };
            for link in links {
                let Some(href) = link.attr("href") else {
                    continue;
                };
                if !is_contact_link(&link.text, href) {
                    continue;
                }
                let Ok(url) = resolve_url(&base, href) else {
                    continue;
                };
                if !matches!(url.scheme(), "http" | "https") {
                    continue;
                }
                let same_site = host_of(&url)
                    .map(|h| host_matches(&h, &home_host) || host_matches(&home_host, &h))
                    .unwrap_or(false);
                if same_site && seen.insert(normalized(&url)) {
                    candidates.push(url);
                }
            }
        }

        for path in CONTACT_PATHS {
            if let Ok(url) = base.join(path) {
                if seen.insert(normalized(&url)) {
                    candidates.push(url);
                }
            }
        }
        candidates
    }
}

fn is_contact_link(text: &str, href: &str) -> bool {
    let href = href.trim().to_lowercase();
    if href.starts_with("mailto:") || href.starts_with("tel:") || href.starts_with('#') {
        return false;
    }
    let text = text.to_lowercase();
    CONTACT_HINTS
        .iter()
        .any(|hint| text.contains(hint) || href.contains(hint))
}

fn normalized(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.set_query(None);
    url.as_str().trim_end_matches('/').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::traits::ElementSnapshot;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// 按 URL 返回预置页面的会话
    #[derive(Default)]
    struct SiteSession {
        pages: HashMap<String, PageContent>,
        links: HashMap<String, Vec<ElementSnapshot>>,
        failures: Mutex<HashMap<String, u32>>,
        visited: Mutex<Vec<(String, Duration)>>,
    }

    impl SiteSession {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                PageContent {
                    url: url.to_string(),
                    html: html.to_string(),
                    text: String::new(),
                },
            );
            self
        }

        fn link(mut self, selector: &str, text: &str, href: &str) -> Self {
            let mut attributes = HashMap::new();
            attributes.insert("href".to_string(), href.to_string());
            self.links
                .entry(selector.to_string())
                .or_default()
                .push(ElementSnapshot {
                    text: text.to_string(),
                    attributes,
                });
            self
        }

        fn fail(self, url: &str, times: u32) -> Self {
            self.failures.lock().insert(url.to_string(), times);
            self
        }

        fn visited(&self) -> Vec<String> {
            self.visited.lock().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    #[async_trait]
    impl BrowserSession for SiteSession {
        async fn navigate(&self, url: &str, options: &NavigateOptions) -> Result<PageContent, EngineError> {
            self.visited.lock().push((url.to_string(), options.timeout));
            {
                let mut failures = self.failures.lock();
                if let Some(remaining) = failures.get_mut(url) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(EngineError::Timeout);
                    }
                }
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| EngineError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()))
        }

        async fn find_elements(&self, selector: &str) -> Result<Vec<ElementSnapshot>, EngineError> {
            Ok(self.links.get(selector).cloned().unwrap_or_default())
        }
        async fn click(&self, _selector: &str, _text: Option<&str>) -> Result<bool, EngineError> {
            Ok(false)
        }

        async fn close(&self) -> Result<(), EngineError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "site"
        }
    }

    fn fetcher() -> PageFetcher {
        PageFetcher::new(&FetchSettings::default())
    }

    #[tokio::test]
    async fn test_homepage_with_contacts_needs_no_subpages() {
        let session = SiteSession::default().page(
            "https://acme.com/",
            r#"<html><body><a href="mailto:info@acme.com">Mail us</a></body></html>"#,
        );
        let pages = fetcher().fetch("https://acme.com/", &session).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(session.visited(), vec!["https://acme.com/"]);
    }

    #[tokio::test]
    async fn test_footer_contact_link_is_tried_first() {
        let session = SiteSession::default()
            .page("https://acme.com/", "<html><body><h1>Acme</h1></body></html>")
            .page(
                "https://acme.com/company/reach-out",
                "<html><body>Email: sales@acme.com</body></html>",
            )
            .link("footer a[href]", "Contact", "/company/reach-out")
            .link("a[href]", "Careers", "/careers");

        let pages = fetcher().fetch("https://acme.com/", &session).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(
            session.visited(),
            vec!["https://acme.com/", "https://acme.com/company/reach-out"]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_fixed_paths_and_ignores_failures() {
        let session = SiteSession::default()
            .page("https://acme.com/", "<html><body><h1>Acme</h1></body></html>")
            .page(
                "https://acme.com/contact-us",
                "<html><body>Call +971 4 123 4567</body></html>",
            )
            .link("a[href]", "About", "https://other.com/about");

        let pages = fetcher().fetch("https://acme.com/", &session).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(
            session.visited(),
            vec![
                "https://acme.com/",
                "https://acme.com/contact",
                "https://acme.com/contact-us"
            ]
        );
    }

    #[tokio::test]
    async fn test_homepage_retried_once_with_longer_timeout() {
        let session = SiteSession::default()
            .page("https://acme.com/", r#"<a href="mailto:info@acme.com">x</a>"#)
            .fail("https://acme.com/", 1);

        let settings = FetchSettings::default();
        let pages = PageFetcher::new(&settings)
            .fetch("https://acme.com/", &session)
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);

        let timeouts: Vec<Duration> = session.visited.lock().iter().map(|(_, t)| *t).collect();
        assert_eq!(timeouts, vec![settings.timeout(), settings.retry_timeout()]);
    }

    #[tokio::test]
    async fn test_homepage_timeout_twice_is_fetch_timeout() {
        let session = SiteSession::default()
            .page("https://acme.com/", "<html></html>")
            .fail("https://acme.com/", 2);

        let err = fetcher().fetch("https://acme.com/", &session).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Timeout {
                url: "https://acme.com/".to_string()
            }
        );
        assert_eq!(session.visited().len(), 2);
    }

    #[test]
    fn test_contact_link_hints() {
        assert!(is_contact_link("Get in touch", "/x"));
        assert!(is_contact_link("", "/about-us"));
        assert!(!is_contact_link("Contact", "mailto:info@acme.com"));
        assert!(!is_contact_link("Products", "/products"));
    }
}
