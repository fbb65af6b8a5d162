// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::infrastructure::search::duckduckgo::DuckDuckGoSearchEngine;
use crate::infrastructure::search::google::GoogleSearchEngine;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// 搜索引擎类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngineType {
    /// Google 搜索引擎（浏览器驱动）
    Google,
    /// DuckDuckGo HTML 端点
    DuckDuckGo,
}

impl SearchEngineType {
    /// 获取引擎名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::DuckDuckGo => "duckduckgo",
        }
    }
}

impl FromStr for SearchEngineType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            other => Err(SearchError::EngineError(format!(
                "Unknown search engine: {}",
                other
            ))),
        }
    }
}

/// 按配置顺序创建搜索引擎
///
/// # 参数
///
/// * `settings` - 应用配置，使用其中的 `search.engines` 顺序
///
/// # 返回值
///
/// 去重后的引擎列表；名称无法识别或列表为空时返回错误
pub fn create_engines(settings: &Settings) -> Result<Vec<Arc<dyn SearchEngine>>, SearchError> {
    let mut types: Vec<SearchEngineType> = Vec::new();
    for name in &settings.search.engines {
        let engine_type = name.parse::<SearchEngineType>()?;
        if !types.contains(&engine_type) {
            types.push(engine_type);
        }
    }
    if types.is_empty() {
        return Err(SearchError::EngineError(
            "No search engines configured".to_string(),
        ));
    }

    let search = &settings.search;
    let mut engines: Vec<Arc<dyn SearchEngine>> = Vec::with_capacity(types.len());
    for engine_type in types {
        let engine: Arc<dyn SearchEngine> = match engine_type {
            SearchEngineType::Google => Arc::new(GoogleSearchEngine::new(
                search.google_url.clone(),
                search.results_limit,
                search.request_timeout(),
            )),
            SearchEngineType::DuckDuckGo => Arc::new(DuckDuckGoSearchEngine::new(
                search.duckduckgo_url.clone(),
                &settings.browser.user_agent,
                search.request_timeout(),
                search.results_limit,
            )?),
        };
        info!("搜索引擎已注册: {}", engine.name());
        engines.push(engine);
    }
    Ok(engines)
}
