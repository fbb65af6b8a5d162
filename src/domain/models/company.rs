// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 公司输入记录
///
/// 流水线的不可变输入。身份由名称（以及存在时的国家）决定。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// 公司名称（原样）
    pub name: String,
    /// 国家（可选）
    #[serde(default)]
    pub country: Option<String>,
    /// 行业（可选）
    #[serde(default)]
    pub sector: Option<String>,
}

impl CompanyRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: None,
            sector: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// 记录身份：`name` 或 `name|country`
    pub fn identity(&self) -> String {
        match self.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(country) => format!("{}|{}", self.name.trim(), country),
            None => self.name.trim().to_string(),
        }
    }

    /// 去除空白后的国家名
    pub fn country(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn sector(&self) -> Option<&str> {
        self.sector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
