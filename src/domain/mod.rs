// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：公司记录、搜索结果、联系信息等数据结构
/// - 搜索接口（search）：搜索引擎抽象与错误类型
/// - 服务（services）：查询构造、网站选择、联系信息提取等纯逻辑
///
/// 领域层不直接访问网络，外部能力通过 trait 注入。
pub mod models;
pub mod search;
pub mod services;
