// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::search::engine::SearchError;
use crate::engines::traits::EngineError;
use thiserror::Error;

/// 运行级错误类型
///
/// 单条记录的失败不会出现在这里，它们只会降级该记录的状态
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("浏览器初始化失败: {0}")]
    BrowserInit(String),

    #[error("搜索引擎配置错误: {0}")]
    EngineSetup(String),
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        PipelineError::BrowserInit(e.to_string())
    }
}

impl From<SearchError> for PipelineError {
    fn from(e: SearchError) -> Self {
        PipelineError::EngineSetup(e.to_string())
    }
}
