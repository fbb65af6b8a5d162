// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置，包括搜索引擎、浏览器、抓取和流水线等配置
pub mod settings;

pub use settings::Settings;
