// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use clap::Parser;
use std::path::PathBuf;

/// 命令行参数
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "contactrs")]
#[command(about = "Find official websites and contact details for a list of companies")]
#[command(version)]
pub struct Cli {
    /// Input JSON or CSV file with company_name / exhibitor_name / name, country, sector
    pub input: PathBuf,

    /// Output base path (without extension); writes <base>.json and <base>.csv
    #[arg(short, long, default_value = "company_contacts")]
    pub output: PathBuf,

    /// Maximum companies to process (0 = all)
    #[arg(long = "max", value_name = "N", default_value_t = 0)]
    pub max_companies: usize,

    /// Do not block images, stylesheets, fonts and ad hosts (slower)
    #[arg(long)]
    pub no_block: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    pub headed: bool,

    /// Pause on CAPTCHA pages until the challenge is solved in the visible browser
    #[arg(long, env = "CONTACTRS_MANUAL_SOLVE")]
    pub manual_solve: bool,

    /// Search engine order, e.g. "google,duckduckgo"
    #[arg(long, value_delimiter = ',')]
    pub engines: Option<Vec<String>>,

    /// Number of companies processed concurrently
    #[arg(short = 'j', long = "concurrency", value_name = "N")]
    pub concurrency: Option<usize>,

    /// Verbose logging (-v debug for this crate, -vv everything)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// 用命令行参数覆盖配置
    pub fn apply(&self, settings: &mut Settings) {
        if self.max_companies > 0 {
            settings.pipeline.max_companies = Some(self.max_companies);
        }
        if self.no_block {
            settings.browser.block_resources = false;
        }
        if self.headed {
            settings.browser.headless = false;
        }
        if self.manual_solve {
            settings.manual_solve.enabled = true;
            // 人工处理需要可见的浏览器窗口
            settings.browser.headless = false;
        }
        if let Some(engines) = &self.engines {
            let engines: Vec<String> = engines
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            if !engines.is_empty() {
                settings.search.engines = engines;
            }
        }
        if let Some(concurrency) = self.concurrency {
            settings.pipeline.concurrency = concurrency.max(1);
        }
    }
}
