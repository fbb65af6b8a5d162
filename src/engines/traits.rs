// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 浏览器能力错误类型
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// 浏览器启动或连接失败
    #[error("Browser launch failed: {0}")]
    Launch(String),
    /// 页面导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 会话已关闭
    #[error("Browser session closed")]
    SessionClosed,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Timeout | EngineError::Navigation(_))
    }
}

/// 导航选项
#[derive(Debug, Clone)]
pub struct NavigateOptions {
    /// 整个导航（含读取内容）的超时
    pub timeout: Duration,
    /// 导航完成后额外等待出现的元素
    pub wait_for_selector: Option<String>,
}

impl NavigateOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            wait_for_selector: None,
        }
    }
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }
}

/// 导航后的页面内容
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// 最终 URL（重定向之后）
    pub url: String,
    /// 渲染后的 HTML
    pub html: String,
    /// 可见文本
    pub text: String,
}

/// DOM 元素快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSnapshot {
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// 浏览器会话
///
/// 一个会话对应一个隔离的浏览器上下文，`find_elements` 作用于最近一次导航的页面
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 导航到指定 URL 并返回页面内容
    async fn navigate(
        &self,
        url: &str,
        options: &NavigateOptions,
    ) -> Result<PageContent, EngineError>;

    /// 在当前页面查询元素
    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementSnapshot>, EngineError>;

    /// 点击当前页面中第一个匹配 `selector` 的元素
    ///
    /// # 参数
    ///
    /// * `selector` - CSS 选择器
    /// * `text` - 若提供，只点击可见文本包含该内容的元素（不区分大小写）
    ///
    /// # 返回值
    ///
    /// 点击成功返回 `true`，没有匹配元素返回 `false`
    async fn click(&self, selector: &str, text: Option<&str>) -> Result<bool, EngineError>;

    /// 关闭会话并释放浏览器上下文
    async fn close(&self) -> Result<(), EngineError>;

    /// 会话实现名称
    fn name(&self) -> &'static str;
}

/// 浏览器启动器
///
/// 负责浏览器进程的生命周期和会话创建
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// 创建新的隔离会话
    async fn new_session(&self) -> Result<Arc<dyn BrowserSession>, EngineError>;

    /// 关闭浏览器
    async fn shutdown(&self) -> Result<(), EngineError>;
}
