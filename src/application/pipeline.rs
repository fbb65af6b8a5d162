// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::page_fetcher::PageFetcher;
use crate::config::settings::{PipelineSettings, Settings};
use crate::domain::models::captcha_event::CaptchaEvent;
use crate::domain::models::company::CompanyRecord;
use crate::domain::models::contact::ContactBundle;
use crate::domain::models::enriched_record::{EnrichedRecord, RecordStatus};
use crate::domain::models::website::WebsiteCandidate;
use crate::domain::services::contact_extractor::ContactExtractor;
use crate::domain::services::query_builder::{build_queries, CompanyName};
use crate::domain::services::website_selector::{Selection, WebsiteSelector};
use crate::engines::traits::{BrowserLauncher, BrowserSession, PageContent};
use crate::infrastructure::search::fallback::{FallbackCoordinator, FallbackError, SearchOutcome};
use crate::utils::errors::PipelineError;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use rand::Rng;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 一次运行的全部产出
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// 与输入顺序一致，每条输入恰好一条
    pub records: Vec<EnrichedRecord>,
    /// 运行期间的验证码事件
    pub captcha_events: Vec<CaptchaEvent>,
}

impl PipelineReport {
    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// 流水线编排器
///
/// 对每家公司依次执行：构造查询 → 带回退的搜索 → 选择网站 → 加载页面 → 提取联系信息。
/// `concurrency` 为 1 时顺序处理并复用同一个浏览器会话；大于 1 时每个 worker
/// 持有一个独立会话，输出顺序始终与输入一致。
pub struct Pipeline {
    launcher: Arc<dyn BrowserLauncher>,
    coordinator: Arc<FallbackCoordinator>,
    selector: WebsiteSelector,
    fetcher: PageFetcher,
    extractor: ContactExtractor,
    settings: PipelineSettings,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        coordinator: Arc<FallbackCoordinator>,
        settings: &Settings,
    ) -> Self {
        Self {
            launcher,
            coordinator,
            selector: WebsiteSelector::new(settings.selector.clone()),
            fetcher: PageFetcher::new(&settings.fetch),
            extractor: ContactExtractor::new(),
            settings: settings.pipeline.clone(),
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部取消令牌（例如 Ctrl-C）
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 处理全部公司记录
    ///
    /// # 参数
    ///
    /// * `records` - 按输入顺序排列的公司记录
    ///
    /// # 返回值
    ///
    /// 每条输入对应一条输出的报告；只有浏览器无法初始化时返回错误
    pub async fn run(&self, records: Vec<CompanyRecord>) -> Result<PipelineReport, PipelineError> {
        let total = records.len();
        let limit = self.settings.max_companies.unwrap_or(total).min(total);
        let workers = self.settings.concurrency.max(1).min(limit.max(1));

        let pool: Mutex<Vec<Arc<dyn BrowserSession>>> = Mutex::new(Vec::with_capacity(workers));
        if limit > 0 {
            for _ in 0..workers {
                let session = self.launcher.new_session().await?;
                pool.lock().push(session);
            }
        }
        info!(
            "Processing {} of {} companies with {} worker(s)",
            limit, total, workers
        );

        let records = futures::stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| {
                let pool = &pool;
                async move {
                    if index >= limit {
                        return skipped(record, "beyond max companies limit");
                    }
                    self.process_slot(index, total, workers, record, pool).await
                }
            })
            .buffered(workers)
            .collect::<Vec<_>>()
            .await;

        let sessions: Vec<_> = pool.lock().drain(..).collect();
        for session in sessions {
            if let Err(e) = session.close().await {
                warn!("Failed to close browser session: {}", e);
            }
        }

        for record in &records {
            metrics::counter!("records_total", "status" => record.status.as_str()).increment(1);
        }

        Ok(PipelineReport {
            records,
            captcha_events: self.coordinator.captcha_log().snapshot(),
        })
    }

    async fn process_slot(
        &self,
        index: usize,
        total: usize,
        workers: usize,
        record: CompanyRecord,
        pool: &Mutex<Vec<Arc<dyn BrowserSession>>>,
    ) -> EnrichedRecord {
        if self.cancel.is_cancelled() {
            return skipped(record, "run cancelled");
        }
        if index >= workers {
            let delay = self.pacing_delay();
            tokio::select! {
                _ = self.cancel.cancelled() => return skipped(record, "run cancelled"),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let pooled = pool.lock().pop();
        let session = match pooled {
            Some(session) => session,
            None => match self.launcher.new_session().await {
                Ok(session) => session,
                Err(e) => {
                    return EnrichedRecord::failed(record, RecordStatus::SearchFailed, e.to_string())
                }
            },
        };

        info!("[{}/{}] {}", index + 1, total, record.name);
        let result = AssertUnwindSafe(self.process(record.clone(), session.as_ref()))
            .catch_unwind()
            .await;
        pool.lock().push(session);

        match result {
            Ok(enriched) => {
                info!("[{}/{}] {} -> {}", index + 1, total, record.name, enriched.status);
                enriched
            }
            Err(panic) => {
                error!("Processing {} panicked: {}", record.name, panic_message(&panic));
                EnrichedRecord::failed(
                    record,
                    RecordStatus::SearchFailed,
                    format!("internal error: {}", panic_message(&panic)),
                )
            }
        }
    }

    fn pacing_delay(&self) -> Duration {
        let jitter = if self.settings.jitter_ms > 0 {
            rand::rng().random_range(0..=self.settings.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.settings.delay_ms + jitter)
    }

    /// 处理单家公司
    pub async fn process(&self, record: CompanyRecord, session: &dyn BrowserSession) -> EnrichedRecord {
        let name = CompanyName::parse(&record.name);
        let identity = record.identity();
        let queries = build_queries(&record);

        let mut searched = false;
        let mut last_error: Option<String> = None;
        let mut found: Option<(WebsiteCandidate, SearchOutcome)> = None;

        for query in &queries {
            match self.coordinator.search(&identity, query, session).await {
                Ok(outcome) => {
                    searched = true;
                    match self.selector.select(
                        &name,
                        record.country(),
                        &outcome.page.results,
                        outcome.page.knowledge_panel.as_ref(),
                    ) {
                        Selection::Selected(candidate) => {
                            info!(
                                "Selected {} for {} (confidence {:.2}, via {})",
                                candidate.url, record.name, candidate.confidence, outcome.engine
                            );
                            found = Some((candidate, outcome));
                            break;
                        }
                        Selection::NoMatch { best_rejected } => {
                            debug!(
                                "No website accepted for query {:?}; best rejected: {:?}",
                                query,
                                best_rejected.map(|c| (c.url, c.confidence))
                            );
                        }
                    }
                }
                Err(FallbackError::Blocked { engine }) => {
                    warn!("Search blocked for {} (last engine: {})", record.name, engine);
                    return EnrichedRecord::failed(
                        record,
                        RecordStatus::Blocked,
                        format!("search blocked on {}", engine),
                    );
                }
                Err(FallbackError::SearchFailed(message)) => {
                    warn!("Search failed for {} with query {:?}: {}", record.name, query, message);
                    last_error = Some(message);
                }
            }
        }

        let Some((candidate, outcome)) = found else {
            return if searched {
                EnrichedRecord::new(record, ContactBundle::default(), RecordStatus::NoWebsiteFound)
            } else {
                EnrichedRecord::failed(
                    record,
                    RecordStatus::SearchFailed,
                    last_error.unwrap_or_else(|| "no queries could be built".to_string()),
                )
            };
        };

        let pages = match self.fetcher.fetch(&candidate.url, session).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Fetching {} failed: {}", candidate.url, e);
                return EnrichedRecord::new(
                    record,
                    ContactBundle::for_website(&candidate.url, &outcome.engine),
                    RecordStatus::FetchFailed,
                )
                .with_website_confidence(candidate.confidence)
                .with_error(e.to_string());
            }
        };

        let (contacts, failures) = self.extract(&candidate, &outcome, &pages);
        let status = if contacts.has_contact_fields() {
            RecordStatus::Resolved
        } else {
            RecordStatus::WebsiteOnly
        };

        let enriched = EnrichedRecord::new(record, contacts, status)
            .with_website_confidence(candidate.confidence);
        if failures > 0 {
            enriched.with_error(format!("extraction failed on {} page(s)", failures))
        } else {
            enriched
        }
    }

    /// 提取并合并联系信息，返回结果与失败页数
    ///
    /// 单页提取出错或 panic 只跳过该页
    fn extract(
        &self,
        candidate: &WebsiteCandidate,
        outcome: &SearchOutcome,
        pages: &[PageContent],
    ) -> (ContactBundle, usize) {
        let mut failures = 0;
        let mut bundles = Vec::with_capacity(pages.len());

        for page in pages {
            match std::panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract_page(page))) {
                Ok(Ok(bundle)) => bundles.push(bundle),
                Ok(Err(e)) => {
                    warn!("Extraction failed on {}: {}", page.url, e);
                    failures += 1;
                }
                Err(panic) => {
                    error!("Extraction panicked on {}: {}", page.url, panic_message(&panic));
                    failures += 1;
                }
            }
        }

        let panel = outcome
            .page
            .knowledge_panel
            .as_ref()
            .map(|panel| self.extractor.extract_panel(panel));

        (
            self.extractor
                .combine(&candidate.url, &outcome.engine, bundles, panel),
            failures,
        )
    }
}

fn skipped(record: CompanyRecord, reason: &str) -> EnrichedRecord {
    EnrichedRecord::failed(record, RecordStatus::Skipped, reason)
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
