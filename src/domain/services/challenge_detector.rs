// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{Html, Selector};

/// 反爬验证页判定
///
/// 只看页面内容的结构信号，不依赖 HTTP 状态码
pub trait ChallengeDetector: Send + Sync {
    fn is_challenge(&self, html: &str) -> bool;
}

/// 基于标记文本和元素的判定器
///
/// 命中任一文本标记后，若 `confirm_structurally` 为真，
/// 还需要命中元素标记、页面过短或缺少结果容器之一
pub struct MarkerChallengeDetector {
    text_markers: Vec<String>,
    element_markers: Vec<Selector>,
    result_selector: Option<Selector>,
    small_page_bytes: usize,
    confirm_structurally: bool,
}

impl MarkerChallengeDetector {
    pub fn new(text_markers: &[&str]) -> Self {
        Self {
            text_markers: text_markers.iter().map(|m| m.to_lowercase()).collect(),
            element_markers: Vec::new(),
            result_selector: None,
            small_page_bytes: 0,
            confirm_structurally: false,
        }
    }

    /// 追加元素标记，无法解析的选择器被忽略
    pub fn with_element_markers(mut self, selectors: &[&str]) -> Self {
        self.element_markers
            .extend(selectors.iter().filter_map(|s| Selector::parse(s).ok()));
        self.confirm_structurally = true;
        self
    }

    pub fn with_result_selector(mut self, selector: &str) -> Self {
        self.result_selector = Selector::parse(selector).ok();
        self.confirm_structurally = true;
        self
    }

    pub fn with_small_page_bytes(mut self, bytes: usize) -> Self {
        self.small_page_bytes = bytes;
        self.confirm_structurally = true;
        self
    }

    /// Google 的 "unusual traffic" / reCAPTCHA 页面
    pub fn google() -> Self {
        Self::new(&["recaptcha", "unusual traffic", "/sorry/index"])
            .with_element_markers(&["#captcha-form", ".g-recaptcha", "iframe[src*='recaptcha']"])
            .with_result_selector("div.g, div[data-hveid]")
            .with_small_page_bytes(20_000)
    }

    /// DuckDuckGo 的 anomaly 弹窗
    pub fn duckduckgo() -> Self {
        Self::new(&[
            "anomaly-modal",
            "bots use duckduckgo too",
            "please complete the following challenge",
        ])
    }
}

impl ChallengeDetector for MarkerChallengeDetector {
    fn is_challenge(&self, html: &str) -> bool {
        let lower = html.to_lowercase();
        if !self.text_markers.iter().any(|m| lower.contains(m.as_str())) {
            return false;
        }
        if !self.confirm_structurally {
            return true;
        }
        if html.len() < self.small_page_bytes {
            return true;
        }

        let document = Html::parse_document(html);
        if self
            .element_markers
            .iter()
            .any(|s| document.select(s).next().is_some())
        {
            return true;
        }
        match &self.result_selector {
            Some(selector) => document.select(selector).next().is_none(),
            None => false,
        }
    }
}
