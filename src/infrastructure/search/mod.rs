// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 搜索服务模块
///
/// 提供搜索引擎的具体实现以及围绕它们的调度：
/// - Google（浏览器驱动）与 DuckDuckGo（HTTP）
/// - 引擎回退协调器与人工处理验证码的恢复信号
/// - 每个引擎的搜索额度与验证码事件日志
pub mod captcha_log;
pub mod duckduckgo;
pub mod factory;
pub mod fallback;
pub mod google;
pub mod manual_solve;
pub mod rate_limit;

pub use captcha_log::CaptchaLog;
pub use factory::{create_engines, SearchEngineType};
pub use fallback::{FallbackCoordinator, FallbackError, FallbackState, SearchOutcome};
pub use manual_solve::{ChannelClearance, ClearanceSignal, StdinClearance};
pub use rate_limit::SearchBudget;
