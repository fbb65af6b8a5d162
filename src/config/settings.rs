// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 默认桌面 Chrome UA
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 应用程序配置设置
///
/// 包含搜索、浏览器、页面抓取、流水线、人工验证和网站选择等所有配置项
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// 搜索引擎配置
    pub search: SearchSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 页面抓取配置
    pub fetch: FetchSettings,
    /// 流水线配置
    pub pipeline: PipelineSettings,
    /// 人工处理验证码配置
    pub manual_solve: ManualSolveSettings,
    /// 网站选择器配置
    pub selector: SelectorSettings,
}

/// 搜索引擎配置设置
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchSettings {
    /// 引擎优先级顺序，第一个为主引擎
    pub engines: Vec<String>,
    /// 单次搜索超时（秒）
    pub request_timeout_secs: u64,
    /// 每页保留的最大结果数
    pub results_limit: usize,
    /// 每个引擎每分钟请求数上限
    pub requests_per_minute: u32,
    /// 每个引擎同时进行中的请求上限
    pub max_in_flight: usize,
    /// Google 搜索地址
    pub google_url: String,
    /// DuckDuckGo HTML 搜索地址
    pub duckduckgo_url: String,
}

/// 浏览器配置设置
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowserSettings {
    /// 是否无头模式
    pub headless: bool,
    /// 是否屏蔽图片、样式、字体、媒体和广告请求
    pub block_resources: bool,
    pub user_agent: String,
    pub locale: String,
    pub timezone: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// 远程调试地址，设置后连接已有 Chrome 而不是启动新进程
    pub remote_debugging_url: Option<String>,
    /// 启动超时（秒）
    pub launch_timeout_secs: u64,
}

/// 页面抓取配置设置
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchSettings {
    /// 首页加载超时（秒）
    pub timeout_secs: u64,
    /// 重试时的超时倍数
    pub retry_timeout_multiplier: f64,
    /// 首页无联系信息时最多再访问的子页面数
    pub max_subpages: usize,
}

/// 流水线配置设置
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineSettings {
    /// 并发处理的公司数，1 为顺序模式
    pub concurrency: usize,
    /// 公司之间的固定间隔（毫秒）
    pub delay_ms: u64,
    /// 额外随机间隔上限（毫秒）
    pub jitter_ms: u64,
    /// 最多处理的公司数
    pub max_companies: Option<usize>,
}

/// 人工处理验证码配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManualSolveSettings {
    /// 有头模式下遇到验证码时是否暂停等待人工处理
    pub enabled: bool,
}

/// 网站选择器配置设置
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectorSettings {
    /// 低于该分数视为未找到网站
    pub min_confidence: f64,
    /// 域名与公司名匹配权重
    pub name_weight: f64,
    /// 国家匹配权重
    pub country_weight: f64,
    /// 排名权重
    pub rank_weight: f64,
    /// 标题提示权重
    pub title_weight: f64,
    /// 文章类路径扣分
    pub path_penalty: f64,
    /// 黑名单域名兜底时的分数系数
    pub denylist_multiplier: f64,
    /// 追加的黑名单域名片段
    pub extra_denylist: Vec<String>,
}

impl SearchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 重试时使用的更长超时
    pub fn retry_timeout(&self) -> Duration {
        self.timeout().mul_f64(self.retry_timeout_multiplier.max(1.0))
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            engines: vec!["google".to_string(), "duckduckgo".to_string()],
            request_timeout_secs: 30,
            results_limit: 20,
            requests_per_minute: 20,
            max_in_flight: 1,
            google_url: "https://www.google.com/search".to_string(),
            duckduckgo_url: "https://html.duckduckgo.com/html/".to_string(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            block_resources: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: "en-US".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            remote_debugging_url: None,
            launch_timeout_secs: 30,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_timeout_multiplier: 2.0,
            max_subpages: 2,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            delay_ms: 2000,
            jitter_ms: 3000,
            max_companies: None,
        }
    }
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.35,
            name_weight: 0.6,
            country_weight: 0.2,
            rank_weight: 0.1,
            title_weight: 0.1,
            path_penalty: 0.3,
            denylist_multiplier: 0.25,
            extra_denylist: Vec::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            browser: BrowserSettings::default(),
            fetch: FetchSettings::default(),
            pipeline: PipelineSettings::default(),
            manual_solve: ManualSolveSettings { enabled: false },
            selector: SelectorSettings::default(),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `CONTACTRS__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CONTACTRS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search.engines")
                    .with_list_parse_key("selector.extra_denylist"),
            )
            .build()?
            .try_deserialize()
    }

    /// 仅由内置默认值构建
    pub fn from_defaults() -> Result<Self, ConfigError> {
        Self::with_defaults()?.build()?.try_deserialize()
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            // Search
            .set_default("search.engines", vec!["google", "duckduckgo"])?
            .set_default("search.request_timeout_secs", 30)?
            .set_default("search.results_limit", 20)?
            .set_default("search.requests_per_minute", 20)?
            .set_default("search.max_in_flight", 1)?
            .set_default("search.google_url", "https://www.google.com/search")?
            .set_default("search.duckduckgo_url", "https://html.duckduckgo.com/html/")?
            // Browser profile
            .set_default("browser.headless", true)?
            .set_default("browser.block_resources", true)?
            .set_default("browser.user_agent", DEFAULT_USER_AGENT)?
            .set_default("browser.locale", "en-US")?
            .set_default("browser.timezone", "Asia/Kolkata")?
            .set_default("browser.viewport_width", 1920)?
            .set_default("browser.viewport_height", 1080)?
            .set_default("browser.launch_timeout_secs", 30)?
            // Page fetch
            .set_default("fetch.timeout_secs", 30)?
            .set_default("fetch.retry_timeout_multiplier", 2.0)?
            .set_default("fetch.max_subpages", 2)?
            // Pipeline
            .set_default("pipeline.concurrency", 1)?
            .set_default("pipeline.delay_ms", 2000)?
            .set_default("pipeline.jitter_ms", 3000)?
            .set_default("manual_solve.enabled", false)?
            // Website selector
            .set_default("selector.min_confidence", 0.35)?
            .set_default("selector.name_weight", 0.6)?
            .set_default("selector.country_weight", 0.2)?
            .set_default("selector.rank_weight", 0.1)?
            .set_default("selector.title_weight", 0.1)?
            .set_default("selector.path_penalty", 0.3)?
            .set_default("selector.denylist_multiplier", 0.25)?
            .set_default("selector.extra_denylist", Vec::<String>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults_match_default_impl() {
        let loaded = Settings::from_defaults().unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_retry_timeout_is_longer() {
        let fetch = FetchSettings::default();
        assert_eq!(fetch.timeout(), Duration::from_secs(30));
        assert_eq!(fetch.retry_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_timeout_never_shrinks() {
        let fetch = FetchSettings {
            retry_timeout_multiplier: 0.5,
            ..Default::default()
        };
        assert_eq!(fetch.retry_timeout(), fetch.timeout());
    }
}
