// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 遇到验证码后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptchaResolution {
    /// 自动切换到下一个搜索引擎
    AutoFallback,
    /// 暂停等待人工处理
    ManualSolve,
}

impl CaptchaResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptchaResolution::AutoFallback => "auto-fallback",
            CaptchaResolution::ManualSolve => "manual-solve",
        }
    }
}

/// 验证码遭遇记录（只追加）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptchaEvent {
    pub id: Uuid,
    pub company: String,
    pub engine: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub resolution: CaptchaResolution,
}

impl CaptchaEvent {
    pub fn new(
        company: impl Into<String>,
        engine: impl Into<String>,
        query: impl Into<String>,
        resolution: CaptchaResolution,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company: company.into(),
            engine: engine.into(),
            query: query.into(),
            timestamp: Utc::now(),
            resolution,
        }
    }
}
