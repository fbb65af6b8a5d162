// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 候选网站的评分依据
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// 域名标签与公司名 slug 完全一致
    DomainEqualsName,
    /// 域名包含公司名 slug
    DomainContainsName,
    /// 域名与公司名部分词元重合
    DomainTokenOverlap,
    /// 国家顶级域匹配
    CountryTld,
    /// 标题或摘要提及国家
    CountryMentioned,
    /// 标题带有 official / home 等提示
    TitleCue,
    /// 排名靠前
    EarlyRank,
    /// 来自知识面板
    KnowledgePanel,
    /// 在 AI 概览中被提及
    AiOverview,
    /// 文章类路径被扣分
    DeepPathPenalty,
    /// 目录/社交站点，仅作兜底
    DenylistedFallback,
}

/// 网站候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteCandidate {
    /// 规范化后的站点 URL
    pub url: String,
    /// 主机名（去掉 www.）
    pub domain: String,
    /// 在搜索结果中的位置
    pub rank: usize,
    /// 置信度 [0, 1]
    pub confidence: f64,
    pub evidence: BTreeSet<Evidence>,
}

impl WebsiteCandidate {
    pub fn has(&self, evidence: Evidence) -> bool {
        self.evidence.contains(&evidence)
    }
}
