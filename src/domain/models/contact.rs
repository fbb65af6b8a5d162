// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 一家公司的联系信息汇总
///
/// 邮箱已小写去重；电话以规范数字串为键，值为展示用的原始格式。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactBundle {
    pub website: Option<String>,
    pub emails: BTreeSet<String>,
    /// 规范形式 -> 展示形式
    pub phones: BTreeMap<String, String>,
    pub address: Option<String>,
    /// 平台名 -> 主页 URL
    pub social_links: BTreeMap<String, String>,
    /// 产生网站决策的引擎 / 路径，例如 `google` 或 `duckduckgo`
    pub source: Option<String>,
    /// 所提取字段的可信度
    pub confidence: f64,
}

impl ContactBundle {
    pub fn for_website(website: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            website: Some(website.into()),
            source: Some(source.into()),
            ..Default::default()
        }
    }

    /// 是否至少提取到一个联系字段（网站本身不算）
    pub fn has_contact_fields(&self) -> bool {
        !self.emails.is_empty()
            || !self.phones.is_empty()
            || self.address.is_some()
            || !self.social_links.is_empty()
    }

    /// 电话的展示形式，按规范形式排序
    pub fn phone_display(&self) -> Vec<&str> {
        self.phones.values().map(String::as_str).collect()
    }

    /// 按规范形式记录电话，同一号码保留格式更好的展示形式
    pub fn insert_phone(&mut self, canonical: String, display: String) {
        match self.phones.get(&canonical) {
            Some(existing) if display_rank(existing) >= display_rank(&display) => {}
            _ => {
                self.phones.insert(canonical, display);
            }
        }
    }

    /// 合并另一份结果：集合取并集，单值字段保留已有值
    pub fn absorb(&mut self, other: ContactBundle) {
        self.emails.extend(other.emails);
        for (canonical, display) in other.phones {
            self.insert_phone(canonical, display);
        }
        if self.address.is_none() {
            self.address = other.address;
        }
        for (platform, url) in other.social_links {
            self.social_links.entry(platform).or_insert(url);
        }
        if self.website.is_none() {
            self.website = other.website;
        }
        if self.source.is_none() {
            self.source = other.source;
        }
    }
}

/// 展示形式的优劣：带 `+` 优先，其次分隔更清晰（更长）
fn display_rank(display: &str) -> (bool, usize) {
    (display.starts_with('+'), display.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_keeps_first_single_values() {
        let mut first = ContactBundle::for_website("https://acme.ae", "google");
        first.address = Some("1 Main Street, Dubai".to_string());
        first.social_links
            .insert("linkedin".to_string(), "https://linkedin.com/company/acme".to_string());

        let mut second = ContactBundle::default();
        second.address = Some("PO Box 1".to_string());
        second.emails.insert("info@acme.ae".to_string());
        second.social_links
            .insert("linkedin".to_string(), "https://linkedin.com/company/other".to_string());

        first.absorb(second);

        assert_eq!(first.address.as_deref(), Some("1 Main Street, Dubai"));
        assert!(first.emails.contains("info@acme.ae"));
        assert_eq!(
            first.social_links.get("linkedin").map(String::as_str),
            Some("https://linkedin.com/company/acme")
        );
        assert!(first.has_contact_fields());
    }

    #[test]
    fn test_absorb_keeps_best_formatted_phone_across_pages() {
        let mut combined = ContactBundle::default();
        let mut home = ContactBundle::default();
        home.phones
            .insert("+97141234567".to_string(), "+97141234567".to_string());
        let mut contact_page = ContactBundle::default();
        contact_page
            .phones
            .insert("+97141234567".to_string(), "+971 4 123 4567".to_string());

        combined.absorb(home);
        combined.absorb(contact_page);
        assert_eq!(combined.phones.len(), 1);
        assert_eq!(combined.phones["+97141234567"], "+971 4 123 4567");

        // 格式较差的号码不会覆盖已有展示形式
        let mut bare = ContactBundle::default();
        bare.phones
            .insert("+97141234567".to_string(), "97141234567".to_string());
        combined.absorb(bare);
        assert_eq!(combined.phones["+97141234567"], "+971 4 123 4567");
    }

    #[test]
    fn test_website_alone_is_not_a_contact_field() {
        let bundle = ContactBundle::for_website("https://acme.ae", "google");
        assert!(!bundle.has_contact_fields());
    }
}
