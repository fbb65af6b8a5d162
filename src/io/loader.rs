// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::CompanyRecord;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// 名称字段的别名，按优先级排列
const NAME_ALIASES: &[&str] = &["company_name", "exhibitor_name", "name"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("输入文件不存在: {0}")]
    NotFound(String),
    #[error("不支持的输入格式: {0}（仅支持 .json / .csv）")]
    UnsupportedFormat(String),
    #[error("读取输入失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),
}

/// 从 JSON 或 CSV 文件读取公司记录
///
/// # 参数
///
/// * `path` - 输入文件路径，按扩展名判断格式
///
/// # 返回值
///
/// 按文件顺序排列的记录；没有名称的行被丢弃
pub fn load_companies(path: &Path) -> Result<Vec<CompanyRecord>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.display().to_string()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let content = fs::read_to_string(path)?;
    let companies = match extension.as_str() {
        "json" => parse_json(&content)?,
        "csv" | "txt" => parse_csv(&content)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    info!("Loaded {} companies from {}", companies.len(), path.display());
    Ok(companies)
}

/// 解析 JSON：数组、带 `companies` 数组的对象，或单个对象
pub fn parse_json(content: &str) -> Result<Vec<CompanyRecord>, LoadError> {
    let value: Value = serde_json::from_str(content)?;
    let items: Vec<&Value> = match &value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("companies") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![&value],
        },
        _ => Vec::new(),
    };

    let records: Vec<CompanyRecord> = items
        .into_iter()
        .filter_map(|item| {
            let field = |key: &str| item.get(key).and_then(json_text);
            let name = NAME_ALIASES.iter().find_map(|&alias| field(alias))?;
            Some(build_record(name, field("country"), field("sector")))
        })
        .collect();
    Ok(records)
}

/// 解析带表头的 CSV
pub fn parse_csv(content: &str) -> Result<Vec<CompanyRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    let column = |key: &str| headers.iter().position(|h| h == key);
    let name_columns: Vec<usize> = NAME_ALIASES.iter().filter_map(|&alias| column(alias)).collect();
    let country_column = column("country");
    let sector_column = column("sector");

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match name_columns.iter().find_map(|&i| cell(Some(i))) {
            Some(name) => records.push(build_record(name, cell(country_column), cell(sector_column))),
            None => debug!("Dropping CSV row {} without a company name", line + 2),
        }
    }
    Ok(records)
}

fn json_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn build_record(name: String, country: Option<String>, sector: Option<String>) -> CompanyRecord {
    CompanyRecord {
        name,
        country,
        sector,
    }
}
