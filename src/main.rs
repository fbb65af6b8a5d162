// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::Parser;
use contactrs::application::pipeline::Pipeline;
use contactrs::cli::Cli;
use contactrs::config::settings::Settings;
use contactrs::domain::models::enriched_record::RecordStatus;
use contactrs::engines::chromium::ChromiumLauncher;
use contactrs::engines::traits::BrowserLauncher;
use contactrs::infrastructure::search::{
    create_engines, CaptchaLog, FallbackCoordinator, SearchBudget, StdinClearance,
};
use contactrs::io::{load_companies, write_captcha_report, write_results};
use contactrs::utils::telemetry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 主函数
///
/// 读取公司列表，运行流水线并写出结果
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    telemetry::init_telemetry(cli.verbose);
    info!("Starting contactrs...");

    // 2. Load configuration
    let mut settings = Settings::new().context("Failed to load configuration")?;
    cli.apply(&mut settings);
    info!("Configuration loaded");

    // 3. Load input
    let companies = load_companies(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    if companies.is_empty() {
        warn!("No companies found in {}", cli.input.display());
    }

    // 4. Search engines and fallback
    let engines = create_engines(&settings).context("Invalid search engine configuration")?;
    let mut coordinator = FallbackCoordinator::new(
        engines,
        SearchBudget::from_settings(&settings.search),
        CaptchaLog::new(),
        settings.search.request_timeout(),
    );
    if settings.manual_solve.enabled {
        if settings.browser.headless {
            warn!("Manual solve requires a visible browser; CAPTCHA pages will fall back instead");
        } else {
            coordinator = coordinator.with_manual_solve(Arc::new(StdinClearance::new()));
        }
    }

    // 5. Browser
    let launcher = Arc::new(
        ChromiumLauncher::launch(settings.browser.clone())
            .await
            .context("Failed to start the browser")?,
    );

    // 6. Ctrl-C stops pulling new companies
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight companies");
                cancel.cancel();
            }
        });
    }

    let pipeline = Pipeline::new(launcher.clone(), Arc::new(coordinator), &settings)
        .with_cancellation(cancel);
    let result = pipeline.run(companies).await;

    if let Err(e) = launcher.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }
    let report = result?;

    // 7. Write outputs
    let (json_path, csv_path) = write_results(&report.records, &cli.output)?;
    write_captcha_report(&report.captcha_events, &cli.output)?;

    info!(
        "Done: {} resolved, {} website-only, {} no website, {} blocked, {} fetch failed, {} search failed, {} skipped",
        report.count(RecordStatus::Resolved),
        report.count(RecordStatus::WebsiteOnly),
        report.count(RecordStatus::NoWebsiteFound),
        report.count(RecordStatus::Blocked),
        report.count(RecordStatus::FetchFailed),
        report.count(RecordStatus::SearchFailed),
        report.count(RecordStatus::Skipped),
    );
    info!("Results: {} / {}", json_path.display(), csv_path.display());
    Ok(())
}
