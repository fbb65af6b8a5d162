// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 包含与外部系统交互的实现：搜索引擎客户端、回退调度、
/// 请求额度和验证码日志。领域层只依赖这里实现的 trait。
pub mod search;
