// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub engine: String,
    /// 在结果页中的位置（从 0 开始）
    pub rank: usize,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        engine: impl Into<String>,
        rank: usize,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            engine: engine.into(),
            rank,
        }
    }
}

/// 搜索结果页右侧的知识面板，以及 AI 概览中的实体信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KnowledgePanel {
    /// 面板与 AI 概览的可见文本
    pub text: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// AI 概览正文中提到的网站
    #[serde(default)]
    pub mentioned_websites: Vec<String>,
}

impl KnowledgePanel {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
            && self.website.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.mentioned_websites.is_empty()
    }
}

/// 单次引擎调用的产出
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub knowledge_panel: Option<KnowledgePanel>,
}

impl SearchPage {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            knowledge_panel: None,
        }
    }

    pub fn with_knowledge_panel(mut self, panel: KnowledgePanel) -> Self {
        if !panel.is_empty() {
            self.knowledge_panel = Some(panel);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.knowledge_panel.is_none()
    }
}
