// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::company::CompanyRecord;
use super::contact::ContactBundle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 记录的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    /// 找到网站且至少提取到一个联系字段
    Resolved,
    /// 找到网站但未提取到联系字段
    WebsiteOnly,
    /// 网站选择器未给出结果
    NoWebsiteFound,
    /// 所有引擎都被验证码拦截
    Blocked,
    /// 网站加载在重试后仍失败
    FetchFailed,
    /// 所有引擎都因非验证码错误失败
    SearchFailed,
    /// 运行被取消，记录未处理
    Skipped,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Resolved => "resolved",
            RecordStatus::WebsiteOnly => "website-only",
            RecordStatus::NoWebsiteFound => "no-website-found",
            RecordStatus::Blocked => "blocked",
            RecordStatus::FetchFailed => "fetch-failed",
            RecordStatus::SearchFailed => "search-failed",
            RecordStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每条输入记录对应且仅对应一条的输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub company: CompanyRecord,
    pub contacts: ContactBundle,
    pub status: RecordStatus,
    /// 网站选择的置信度
    pub website_confidence: Option<f64>,
    /// 失败说明
    pub error: Option<String>,
}

impl EnrichedRecord {
    pub fn new(company: CompanyRecord, contacts: ContactBundle, status: RecordStatus) -> Self {
        Self {
            company,
            contacts,
            status,
            website_confidence: None,
            error: None,
        }
    }

    /// 无联系信息的终态记录
    pub fn failed(company: CompanyRecord, status: RecordStatus, error: impl Into<String>) -> Self {
        Self {
            company,
            contacts: ContactBundle::default(),
            status,
            website_confidence: None,
            error: Some(error.into()),
        }
    }

    pub fn with_website_confidence(mut self, confidence: f64) -> Self {
        self.website_confidence = Some(confidence);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn identity(&self) -> String {
        self.company.identity()
    }
}
