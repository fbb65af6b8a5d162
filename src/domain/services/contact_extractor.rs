// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::contact::ContactBundle;
use crate::domain::models::search_result::KnowledgePanel;
use crate::engines::traits::PageContent;
use crate::utils::url_utils::{host_matches, host_of};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// 页面正文的可信度
pub const PAGE_TRUST: f64 = 0.7;
/// 搜索引擎知识面板的可信度
pub const PANEL_TRUST: f64 = 0.9;

const MAX_PHONES: usize = 10;
const MAX_ADDRESS_CHARS: usize = 250;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());
static EMAIL_FULL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$").unwrap());
static PHONE_INTERNATIONAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+\d{1,4}[-.\s]?\(?\d{1,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,4}(?:[-.\s]?\d{2,4})?")
        .unwrap()
});
static PHONE_LOCAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\d+])(\(?0\d{1,4}\)?[-.\s]\d{3,4}[-.\s]\d{3,5})(?:[^\d]|$)").unwrap()
});
static POSTCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4,6}\b").unwrap());
static STREET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(street|st|road|rd|avenue|ave|floor|fl|building|bldg|tower|suite|block|sector|lane|boulevard|blvd|p\.?\s?o\.?\s?box)\b")
        .unwrap()
});
static HQ_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:headquartered|based|located|offices?|hq)\s+in\s+([A-Z][\w.'-]*(?:[ ,]+[A-Z][\w.'-]*){0,5})")
        .unwrap()
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static ADDRESS_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["[itemprop='address']", "address", "[class*='address']"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});
static FOOTER_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("footer").unwrap());

const PLACEHOLDER_EMAIL_DOMAINS: &[&str] = &[
    "example.com", "example.org", "test.com", "domain.com", "email.com", "yourdomain.com",
    "wixpress.com", "sentry.io", "sentry-next.wixpress.com",
];
const PLACEHOLDER_EMAIL_USERS: &[&str] = &["you", "your", "name", "user", "username", "email", "john.doe"];
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".css", ".js"];
const JUNK_PHONES: &[&str] = &["2147483647", "1234567890", "12345678901", "9999999999", "0123456789"];

/// (平台名, 域名, 需排除的路径前缀)
const SOCIAL_PLATFORMS: &[(&str, &[&str], &[&str])] = &[
    ("linkedin", &["linkedin.com"], &["/share", "/sharing", "/shareArticle", "/feed"]),
    ("twitter", &["twitter.com", "x.com"], &["/intent", "/share", "/home", "/search", "/hashtag"]),
    ("facebook", &["facebook.com", "fb.com"], &["/sharer", "/share", "/dialog", "/plugins", "/tr"]),
    ("instagram", &["instagram.com"], &["/p/", "/explore"]),
    ("youtube", &["youtube.com"], &["/watch", "/embed", "/results"]),
    ("tiktok", &["tiktok.com"], &["/embed"]),
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Document is empty")]
    EmptyDocument,
}

/// 规范化邮箱：去掉 `mailto:` 和查询串，小写，过滤占位地址和资源文件名
///
/// 对已规范化的值再次调用结果不变
pub fn normalize_email(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("mailto:")
        .or_else(|| raw.strip_prefix("MAILTO:"))
        .unwrap_or(raw);
    let raw = raw.split('?').next().unwrap_or_default();
    let decoded = urlencoding::decode(raw)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let email = decoded.trim().trim_end_matches('.').to_lowercase();

    if !EMAIL_FULL_RE.is_match(&email) {
        return None;
    }
    if ASSET_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return None;
    }
    let (user, domain) = email.split_once('@')?;
    if PLACEHOLDER_EMAIL_USERS.contains(&user)
        || PLACEHOLDER_EMAIL_DOMAINS
            .iter()
            .any(|d| host_matches(domain, d))
    {
        return None;
    }
    Some(email)
}

/// 规范化电话：保留开头的 `+` 和数字，长度 10-15 位，过滤已知无效号码
///
/// 返回规范形式；对规范形式再次调用结果不变
pub fn normalize_phone(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("tel:").unwrap_or(raw);
    let decoded = urlencoding::decode(raw)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let trimmed = decoded.trim();

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if !(10..=15).contains(&digits.len()) {
        return None;
    }
    if JUNK_PHONES.contains(&digits.as_str()) || digits.chars().all(|c| Some(c) == digits.chars().next()) {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// 取前 `MAX_PHONES` 个号码，国际格式优先
fn cap_phones(phones: BTreeMap<String, String>) -> BTreeMap<String, String> {
    if phones.len() <= MAX_PHONES {
        return phones;
    }
    let (international, local): (Vec<_>, Vec<_>) =
        phones.into_iter().partition(|(canonical, _)| canonical.starts_with('+'));
    international
        .into_iter()
        .chain(local)
        .take(MAX_PHONES)
        .collect()
}

/// 文本近似按行读取：HTML 的文本节点各占一行
fn document_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect::<String>().trim_end().to_string()
    }
}

/// "headquartered in …" 一类的位置提示
fn hq_hint(text: &str) -> Option<String> {
    HQ_HINT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches([',', '.', ' ']).to_string())
        .filter(|hint| hint.len() >= 3)
        .map(|hint| truncate_chars(&hint, MAX_ADDRESS_CHARS))
}

/// 看起来像邮寄地址的一行
fn looks_like_address(line: &str) -> bool {
    let len = line.chars().count();
    if !(15..=400).contains(&len) {
        return false;
    }
    let has_postcode = POSTCODE_RE.is_match(line);
    let has_street = STREET_RE.is_match(line);
    (has_postcode && (has_street || line.contains(','))) || (has_street && line.matches(',').count() >= 2)
}

/// 联系信息提取器
///
/// 各字段独立提取；同一公司多个页面的结果由 [`ContactExtractor::combine`] 合并
#[derive(Debug, Clone, Default)]
pub struct ContactExtractor;

impl ContactExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从一个已加载页面中提取联系信息
    ///
    /// # 参数
    ///
    /// * `page` - 页面内容（HTML 与可见文本）
    ///
    /// # 返回值
    ///
    /// * `Ok(ContactBundle)` - 提取结果，可能为空
    /// * `Err(ExtractionError::EmptyDocument)` - 页面没有任何内容
    pub fn extract_page(&self, page: &PageContent) -> Result<ContactBundle, ExtractionError> {
        if page.html.trim().is_empty() && page.text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        let document = Html::parse_document(&page.html);
        let text = if page.text.trim().is_empty() {
            document_text(&document)
        } else {
            page.text.clone()
        };
        let base = Url::parse(&page.url).ok();

        let mut bundle = ContactBundle::default();
        self.collect_emails(&document, &page.html, &text, &mut bundle);
        self.collect_phones(&document, &text, &mut bundle);
        bundle.address = self.find_address(&document, &text);
        bundle.social_links = self.find_social_links(&document, base.as_ref());
        bundle.confidence = if bundle.has_contact_fields() { PAGE_TRUST } else { 0.0 };
        Ok(bundle)
    }

    /// 从知识面板中提取联系信息
    pub fn extract_panel(&self, panel: &KnowledgePanel) -> ContactBundle {
        let mut bundle = ContactBundle::default();
        for m in EMAIL_RE.find_iter(&panel.text) {
            if let Some(email) = normalize_email(m.as_str()) {
                bundle.emails.insert(email);
            }
        }
        if let Some(phone) = panel.phone.as_deref() {
            if let Some(canonical) = normalize_phone(phone) {
                bundle.insert_phone(canonical, collapse(phone));
            }
        }
        // AI 概览正文里的国际格式号码
        for m in PHONE_INTERNATIONAL_RE.find_iter(&panel.text) {
            if let Some(canonical) = normalize_phone(m.as_str()) {
                bundle.insert_phone(canonical, collapse(m.as_str()));
            }
        }
        bundle.phones = cap_phones(std::mem::take(&mut bundle.phones));
        bundle.address = panel
            .address
            .as_deref()
            .map(collapse)
            .filter(|a| !a.is_empty())
            .map(|a| truncate_chars(&a, MAX_ADDRESS_CHARS))
            .or_else(|| hq_hint(&panel.text));
        bundle.confidence = if bundle.has_contact_fields() { PANEL_TRUST } else { 0.0 };
        bundle
    }

    /// 合并多页结果与知识面板结果
    ///
    /// 知识面板的电话与地址优先；置信度为有贡献来源的可信度均值
    pub fn combine(
        &self,
        website: &str,
        source: &str,
        pages: Vec<ContactBundle>,
        panel: Option<ContactBundle>,
    ) -> ContactBundle {
        let mut combined = ContactBundle::for_website(website, source);
        let mut trusts: Vec<f64> = Vec::new();

        if let Some(panel) = panel.filter(ContactBundle::has_contact_fields) {
            trusts.push(PANEL_TRUST);
            combined.absorb(panel);
        }

        let mut page_contributed = false;
        for page in pages {
            page_contributed |= page.has_contact_fields();
            combined.absorb(page);
        }
        if page_contributed {
            trusts.push(PAGE_TRUST);
        }

        combined.phones = cap_phones(std::mem::take(&mut combined.phones));
        combined.confidence = if trusts.is_empty() {
            0.0
        } else {
            trusts.iter().sum::<f64>() / trusts.len() as f64
        };
        combined
    }

    fn collect_emails(&self, document: &Html, html: &str, text: &str, bundle: &mut ContactBundle) {
        for anchor in document.select(&ANCHOR_SELECTOR) {
            if let Some(href) = anchor.value().attr("href") {
                if href.to_lowercase().starts_with("mailto:") {
                    if let Some(email) = normalize_email(href) {
                        bundle.emails.insert(email);
                    }
                }
            }
        }
        let decoded_html = html_escape::decode_html_entities(html);
        for source in [text, decoded_html.as_ref()] {
            for m in EMAIL_RE.find_iter(source) {
                if let Some(email) = normalize_email(m.as_str()) {
                    bundle.emails.insert(email);
                }
            }
        }
    }

    fn collect_phones(&self, document: &Html, text: &str, bundle: &mut ContactBundle) {
        for anchor in document.select(&ANCHOR_SELECTOR) {
            if let Some(href) = anchor.value().attr("href") {
                if let Some(number) = href.strip_prefix("tel:") {
                    if let Some(canonical) = normalize_phone(number) {
                        let visible = collapse(&anchor.text().collect::<String>());
                        let display = if normalize_phone(&visible).as_deref() == Some(canonical.as_str()) {
                            visible
                        } else {
                            collapse(&urlencoding::decode(number).map(|d| d.into_owned()).unwrap_or_default())
                        };
                        bundle.insert_phone(canonical, display);
                    }
                }
            }
        }
        for m in PHONE_INTERNATIONAL_RE.find_iter(text) {
            if let Some(canonical) = normalize_phone(m.as_str()) {
                bundle.insert_phone(canonical, collapse(m.as_str()));
            }
        }
        for caps in PHONE_LOCAL_RE.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                if let Some(canonical) = normalize_phone(m.as_str()) {
                    bundle.insert_phone(canonical, collapse(m.as_str()));
                }
            }
        }
        bundle.phones = cap_phones(std::mem::take(&mut bundle.phones));
    }

    fn find_address(&self, document: &Html, text: &str) -> Option<String> {
        for selector in ADDRESS_SELECTORS.iter() {
            for element in document.select(selector) {
                let candidate = collapse(&element_text(element));
                let len = candidate.chars().count();
                if (15..=400).contains(&len) {
                    return Some(truncate_chars(&candidate, MAX_ADDRESS_CHARS));
                }
            }
        }

        for footer in document.select(&FOOTER_SELECTOR) {
            let lines: Vec<String> = footer
                .text()
                .map(collapse)
                .filter(|l| !l.is_empty())
                .collect();
            if let Some(line) = lines.iter().find(|l| looks_like_address(l)) {
                return Some(truncate_chars(line, MAX_ADDRESS_CHARS));
            }
        }

        let lines: Vec<String> = text.lines().map(collapse).filter(|l| !l.is_empty()).collect();
        if let Some(line) = lines.iter().find(|l| looks_like_address(l)) {
            return Some(truncate_chars(line, MAX_ADDRESS_CHARS));
        }
        if let Some(line) = lines.iter().find(|l| {
            let lower = l.to_lowercase();
            (lower.starts_with("address") || lower.contains("address:"))
                && (15..=400).contains(&l.chars().count())
        }) {
            return Some(truncate_chars(line, MAX_ADDRESS_CHARS));
        }

        hq_hint(text)
    }

    fn find_social_links(&self, document: &Html, base: Option<&Url>) -> BTreeMap<String, String> {
        let mut links = BTreeMap::new();
        for anchor in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let parsed = match base {
                Some(base) => base.join(href).ok(),
                None => Url::parse(href).ok(),
            };
            let Some(mut url) = parsed else { continue };
            let Some(host) = host_of(&url) else { continue };

            for (platform, domains, excluded) in SOCIAL_PLATFORMS {
                if !domains.iter().any(|d| host_matches(&host, d)) {
                    continue;
                }
                let path = url.path().to_string();
                if path.trim_matches('/').is_empty() || excluded.iter().any(|p| path.starts_with(p)) {
                    break;
                }
                url.set_query(None);
                url.set_fragment(None);
                links
                    .entry(platform.to_string())
                    .or_insert_with(|| url.as_str().trim_end_matches('/').to_string());
                break;
            }
        }
        links
    }
}
