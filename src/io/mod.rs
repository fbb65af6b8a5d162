// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 输入输出模块
///
/// 读取公司列表（JSON / CSV），写出结果与验证码报告
pub mod loader;
pub mod writer;

pub use loader::{load_companies, LoadError};
pub use writer::{write_captcha_report, write_results, WriteError};
