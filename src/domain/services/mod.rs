// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含不依赖网络的纯业务逻辑：
/// - 查询构造（query_builder）：公司名清洗与查询生成
/// - 国家对照（country）：国家名与顶级域映射
/// - 验证页判定（challenge_detector）：可插拔的反爬页面识别
/// - 网站选择（website_selector）：候选网站打分与选择
/// - 联系信息提取（contact_extractor）：邮箱、电话、地址和社交链接
pub mod challenge_detector;
pub mod contact_extractor;
pub mod country;
pub mod query_builder;
pub mod website_selector;
