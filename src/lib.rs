// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 页面加载与流水线编排
pub mod application;

/// 命令行模块
///
/// 命令行参数解析与配置覆盖
pub mod cli;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、搜索接口和纯逻辑服务
pub mod domain;

/// 引擎模块
///
/// 浏览器自动化能力的抽象与 chromiumoxide 实现
pub mod engines;

/// 基础设施模块
///
/// 搜索引擎客户端、回退调度和请求额度
pub mod infrastructure;

/// 输入输出模块
///
/// 公司列表读取与结果写出
pub mod io;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
