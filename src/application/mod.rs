// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 把领域服务和基础设施串成完整流程：
/// - 页面加载（page_fetcher）：主页与联系页
/// - 流水线（pipeline）：逐条处理公司记录并分类终态
pub mod page_fetcher;
pub mod pipeline;

pub use page_fetcher::{FetchError, PageFetcher};
pub use pipeline::{Pipeline, PipelineReport};
