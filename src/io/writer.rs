// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::captcha_event::CaptchaEvent;
use crate::domain::models::enriched_record::EnrichedRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// 验证码报告文件名，写在输出文件旁边
pub const CAPTCHA_REPORT_FILE: &str = "captcha_encounters.json";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("写入输出失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),
}

/// 输出文件中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub company_name: String,
    pub country: String,
    pub sector: String,
    pub website: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub address: String,
    pub social_links: BTreeMap<String, String>,
    pub source: String,
    pub status: String,
    pub website_confidence: Option<f64>,
    pub contact_confidence: f64,
    pub error: String,
}

impl From<&EnrichedRecord> for OutputRow {
    fn from(record: &EnrichedRecord) -> Self {
        let contacts = &record.contacts;
        Self {
            company_name: record.company.name.clone(),
            country: record.company.country.clone().unwrap_or_default(),
            sector: record.company.sector.clone().unwrap_or_default(),
            website: contacts.website.clone().unwrap_or_default(),
            emails: contacts.emails.iter().cloned().collect(),
            phones: contacts.phone_display().into_iter().map(str::to_string).collect(),
            address: contacts.address.clone().unwrap_or_default(),
            social_links: contacts.social_links.clone(),
            source: contacts.source.clone().unwrap_or_default(),
            status: record.status.as_str().to_string(),
            website_confidence: record.website_confidence.map(round2),
            contact_confidence: round2(contacts.confidence),
            error: record.error.clone().unwrap_or_default(),
        }
    }
}

impl OutputRow {
    const CSV_HEADERS: [&'static str; 13] = [
        "company_name",
        "country",
        "sector",
        "website",
        "emails",
        "phones",
        "address",
        "social_links",
        "source",
        "status",
        "website_confidence",
        "contact_confidence",
        "error",
    ];

    /// CSV 形式：列表字段用 `", "` 连接
    fn csv_fields(&self) -> Vec<String> {
        let social = self
            .social_links
            .iter()
            .map(|(platform, url)| format!("{}: {}", platform, url))
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            self.company_name.clone(),
            self.country.clone(),
            self.sector.clone(),
            self.website.clone(),
            self.emails.join(", "),
            self.phones.join(", "),
            self.address.clone(),
            social,
            self.source.clone(),
            self.status.clone(),
            self.website_confidence.map(|c| c.to_string()).unwrap_or_default(),
            self.contact_confidence.to_string(),
            self.error.clone(),
        ]
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 根据输出基础路径生成 JSON 与 CSV 文件路径
pub fn output_paths(base: &Path) -> (PathBuf, PathBuf) {
    (base.with_extension("json"), base.with_extension("csv"))
}

/// 写入 JSON（格式化）与 CSV 两份结果
///
/// # 参数
///
/// * `records` - 流水线输出，按输入顺序
/// * `base` - 不含扩展名的输出路径
///
/// # 返回值
///
/// 实际写入的两个文件路径
pub fn write_results(records: &[EnrichedRecord], base: &Path) -> Result<(PathBuf, PathBuf), WriteError> {
    let (json_path, csv_path) = output_paths(base);
    if let Some(parent) = json_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let rows: Vec<OutputRow> = records.iter().map(OutputRow::from).collect();

    fs::write(&json_path, serde_json::to_string_pretty(&rows)?)?;
    info!("Saved JSON: {}", json_path.display());

    let mut writer = csv::Writer::from_writer(File::create(&csv_path)?);
    writer.write_record(OutputRow::CSV_HEADERS)?;
    for row in &rows {
        writer.write_record(row.csv_fields())?;
    }
    writer.flush()?;
    info!("Saved CSV: {}", csv_path.display());

    Ok((json_path, csv_path))
}

/// 有验证码事件时在输出目录写入报告
///
/// # 返回值
///
/// 写入的文件路径；没有事件时返回 `None`
pub fn write_captcha_report(events: &[CaptchaEvent], base: &Path) -> Result<Option<PathBuf>, WriteError> {
    if events.is_empty() {
        return Ok(None);
    }
    let dir = base
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let path = dir.join(CAPTCHA_REPORT_FILE);
    fs::write(&path, serde_json::to_string_pretty(events)?)?;
    info!("Saved CAPTCHA report ({} events): {}", events.len(), path.display());
    Ok(Some(path))
}
