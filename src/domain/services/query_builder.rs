// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::CompanyRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 公司名末尾的法律形式后缀（已去掉句点）
const LEGAL_SUFFIXES: &[&str] = &[
    "ltd", "llc", "llp", "lp", "inc", "incorporated", "corp", "corporation", "co", "company",
    "gmbh", "plc", "pvt", "private", "limited", "fze", "fzco", "fzllc", "fz", "sa", "ag", "bv",
    "nv", "srl", "spa", "sas", "sarl", "oy", "ab", "as", "kg", "pte", "pty", "wll", "est",
];

const STOPWORDS: &[&str] = &["the", "and", "of", "for", "&"];

/// 解析后的公司名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyName {
    /// 原始名称
    pub raw: String,
    /// 去掉括号注释和法律后缀后的名称
    pub clean: String,
    /// 清洗后名称的 ASCII 字母数字串，如 `acme`
    pub slug: String,
    /// 原始名称的 ASCII 字母数字串，如 `acmecorp`
    pub raw_slug: String,
    /// 用于匹配的词元
    pub tokens: Vec<String>,
}

impl CompanyName {
    pub fn parse(name: &str) -> Self {
        let clean = clean_name(name);
        let raw_without_notes = BRACKETED.replace_all(name, " ");
        Self {
            raw: name.trim().to_string(),
            slug: slugify(&clean),
            raw_slug: slugify(&raw_without_notes),
            tokens: tokenize(&clean),
            clean,
        }
    }
}

/// 去掉括号注释、多余标点和末尾的法律形式后缀
///
/// 名称全部由噪声构成时退回到原始名称
pub fn clean_name(name: &str) -> String {
    let without_notes = BRACKETED.replace_all(name, " ");
    let mut words: Vec<&str> = without_notes
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '|')
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&'))
        .filter(|w| !w.is_empty())
        .collect();

    while let Some(last) = words.last() {
        let key = last.replace('.', "").to_lowercase();
        if words.len() > 1 && (LEGAL_SUFFIXES.contains(&key.as_str()) || key == "&") {
            words.pop();
        } else {
            break;
        }
    }

    let cleaned = words.join(" ");
    if cleaned.is_empty() {
        collapse_whitespace(name)
    } else {
        cleaned
    }
}

/// ASCII 化、小写并只保留字母数字
pub fn slugify(text: &str) -> String {
    deunicode::deunicode(text)
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// 名称词元：ASCII 化、小写、去停用词
pub fn tokenize(text: &str) -> Vec<String> {
    deunicode::deunicode(text)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// 为公司记录生成查询语句，最具体的在前
///
/// # 参数
///
/// * `record` - 公司记录
///
/// # 返回值
///
/// 去重后的查询列表，至少包含一条
pub fn build_queries(record: &CompanyRecord) -> Vec<String> {
    let clean = clean_name(&record.name);
    let country = record.country();

    let mut queries = vec![match country {
        Some(c) => format!("\"{}\" official website {}", clean, c),
        None => format!("\"{}\" official website", clean),
    }];
    queries.push(match country {
        Some(c) => format!("{} {} contact", clean, c),
        None => format!("{} contact", clean),
    });
    if let Some(sector) = record.sector() {
        queries.push(format!("{} {}", clean, sector));
    }

    let mut unique: Vec<String> = Vec::with_capacity(queries.len());
    for query in queries.iter().map(|q| collapse_whitespace(q)) {
        if !unique.iter().any(|u| u.eq_ignore_ascii_case(&query)) {
            unique.push(query);
        }
    }
    unique
}
