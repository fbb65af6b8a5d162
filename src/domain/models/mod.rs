// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 公司记录（company）：流水线的输入
/// - 搜索结果（search_result）：引擎返回的结果与知识面板
/// - 网站候选（website）：选择器的打分结果
/// - 联系信息（contact）：提取出的邮箱、电话、地址与社交链接
/// - 输出记录（enriched_record）：每条输入对应的终态记录
/// - 验证码事件（captcha_event）：只追加的拦截日志
pub mod captcha_event;
pub mod company;
pub mod contact;
pub mod enriched_record;
pub mod search_result;
pub mod website;

pub use captcha_event::{CaptchaEvent, CaptchaResolution};
pub use company::CompanyRecord;
pub use contact::ContactBundle;
pub use enriched_record::{EnrichedRecord, RecordStatus};
pub use search_result::{KnowledgePanel, SearchPage, SearchResult};
pub use website::{Evidence, WebsiteCandidate};
