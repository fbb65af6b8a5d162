// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::captcha_event::{CaptchaEvent, CaptchaResolution};
use crate::domain::models::search_result::SearchPage;
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::engines::traits::BrowserSession;
use crate::infrastructure::search::captcha_log::CaptchaLog;
use crate::infrastructure::search::manual_solve::ClearanceSignal;
use crate::infrastructure::search::rate_limit::SearchBudget;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 同一查询对同一引擎的最大调用次数
pub const MAX_CALLS_PER_ENGINE: u32 = 2;

/// 回退状态机的当前状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    /// 正在使用第 `engine_idx` 个引擎发起第 `attempt` 次调用
    Querying { engine_idx: usize, attempt: u32 },
    /// 等待人工处理验证码
    AwaitingClearance { engine_idx: usize },
    /// 所有引擎均已尝试
    Exhausted,
}

/// 成功的搜索结果及产出它的引擎
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub page: SearchPage,
    pub engine: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FallbackError {
    /// 至少一个引擎返回了验证页，且没有可用的后续路径
    #[error("Search blocked by challenge pages (last engine: {engine})")]
    Blocked { engine: String },
    /// 所有引擎均因非验证码错误失败
    #[error("All search engines failed: {0}")]
    SearchFailed(String),
}

/// 引擎回退协调器
///
/// 按配置顺序尝试搜索引擎；遇到验证页时切换到下一个引擎，
/// 或在启用人工处理时暂停等待恢复信号后重试同一引擎一次。
pub struct FallbackCoordinator {
    engines: Vec<Arc<dyn SearchEngine>>,
    budget: SearchBudget,
    captcha_log: CaptchaLog,
    clearance: Option<Arc<dyn ClearanceSignal>>,
    request_timeout: Duration,
    /// 每次搜索一个条目：搜索编号 -> (公司, 状态)
    states: DashMap<u64, (String, FallbackState)>,
    next_search_id: AtomicU64,
}

impl FallbackCoordinator {
    /// 创建回退协调器
    ///
    /// # 参数
    ///
    /// * `engines` - 按优先级排列的搜索引擎
    /// * `budget` - 所有 worker 共享的搜索额度
    /// * `captcha_log` - 验证码事件日志
    /// * `request_timeout` - 单次引擎调用超时
    pub fn new(
        engines: Vec<Arc<dyn SearchEngine>>,
        budget: SearchBudget,
        captcha_log: CaptchaLog,
        request_timeout: Duration,
    ) -> Self {
        Self {
            engines,
            budget,
            captcha_log,
            clearance: None,
            request_timeout,
            states: DashMap::new(),
            next_search_id: AtomicU64::new(0),
        }
    }

    /// 启用人工处理验证码
    pub fn with_manual_solve(mut self, clearance: Arc<dyn ClearanceSignal>) -> Self {
        self.clearance = Some(clearance);
        self
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    pub fn captcha_log(&self) -> &CaptchaLog {
        &self.captcha_log
    }

    /// 指定公司当前所处的状态（仅在搜索进行中存在）
    ///
    /// 同名公司有多个搜索进行中时返回其中任意一个
    pub fn state_of(&self, company: &str) -> Option<FallbackState> {
        self.states
            .iter()
            .find(|entry| entry.value().0 == company)
            .map(|entry| entry.value().1)
    }

    /// 正在等待人工处理的公司，每个暂停中的搜索一项
    pub fn awaiting_clearance(&self) -> Vec<String> {
        self.states
            .iter()
            .filter(|entry| matches!(entry.value().1, FallbackState::AwaitingClearance { .. }))
            .map(|entry| entry.value().0.clone())
            .collect()
    }

    /// 执行一次带回退的搜索
    ///
    /// # 参数
    ///
    /// * `company` - 公司标识（写入验证码事件）
    /// * `query` - 查询字符串
    /// * `session` - 浏览器会话
    ///
    /// # 返回值
    ///
    /// 成功时返回结果页及引擎名；全部引擎被拦截返回 `Blocked`，
    /// 全部因其他错误失败返回 `SearchFailed`
    pub async fn search(
        &self,
        company: &str,
        query: &str,
        session: &dyn BrowserSession,
    ) -> Result<SearchOutcome, FallbackError> {
        if self.engines.is_empty() {
            return Err(FallbackError::SearchFailed(
                "No search engines configured".to_string(),
            ));
        }

        let mut state = FallbackState::Querying {
            engine_idx: 0,
            attempt: 1,
        };
        let mut blocked_on: Option<&'static str> = None;
        let mut last_error: Option<SearchError> = None;
        let search_id = self.next_search_id.fetch_add(1, Ordering::Relaxed);

        let result = loop {
            self.states.insert(search_id, (company.to_string(), state));
            debug!("Fallback state for {}: {:?}", company, state);

            match state {
                FallbackState::Querying { engine_idx, attempt } => {
                    let engine = &self.engines[engine_idx];
                    match self.call(engine.as_ref(), query, session).await {
                        Ok(page) => {
                            break Ok(SearchOutcome {
                                page,
                                engine: engine.name().to_string(),
                            });
                        }
                        Err(e) if e.is_challenge() => {
                            warn!("Challenge detected on {} for {}", engine.name(), company);
                            blocked_on = Some(engine.name());

                            if self.clearance.is_some()
                                && engine.supports_manual_solve()
                                && attempt < MAX_CALLS_PER_ENGINE
                            {
                                self.record(company, engine.name(), query, CaptchaResolution::ManualSolve);
                                state = FallbackState::AwaitingClearance { engine_idx };
                            } else if engine_idx + 1 < self.engines.len() {
                                self.record(company, engine.name(), query, CaptchaResolution::AutoFallback);
                                state = self.next_engine(engine_idx);
                            } else {
                                state = FallbackState::Exhausted;
                            }
                        }
                        Err(e) => {
                            warn!("Search on {} failed for {}: {}", engine.name(), company, e);
                            last_error = Some(e);
                            state = self.next_engine(engine_idx);
                        }
                    }
                }
                FallbackState::AwaitingClearance { engine_idx } => {
                    let engine_name = self.engines[engine_idx].name();
                    let cleared = match &self.clearance {
                        Some(signal) => signal.wait_for_clearance(engine_name, query).await,
                        None => Ok(()),
                    };
                    state = match cleared {
                        Ok(()) => FallbackState::Querying {
                            engine_idx,
                            attempt: MAX_CALLS_PER_ENGINE,
                        },
                        Err(e) => {
                            warn!("Manual solve abandoned for {}: {}", engine_name, e);
                            self.next_engine(engine_idx)
                        }
                    };
                }
                FallbackState::Exhausted => {
                    break Err(match blocked_on {
                        Some(engine) => FallbackError::Blocked {
                            engine: engine.to_string(),
                        },
                        None => FallbackError::SearchFailed(
                            last_error
                                .map(|e| e.to_string())
                                .unwrap_or_else(|| "unknown error".to_string()),
                        ),
                    });
                }
            }
        };

        self.states.remove(&search_id);
        result
    }

    fn next_engine(&self, engine_idx: usize) -> FallbackState {
        if engine_idx + 1 < self.engines.len() {
            FallbackState::Querying {
                engine_idx: engine_idx + 1,
                attempt: 1,
            }
        } else {
            FallbackState::Exhausted
        }
    }

    async fn call(
        &self,
        engine: &dyn SearchEngine,
        query: &str,
        session: &dyn BrowserSession,
    ) -> Result<SearchPage, SearchError> {
        let _permit = self.budget.acquire(engine.name()).await?;
        let start = Instant::now();

        let result = match tokio::time::timeout(self.request_timeout, engine.search(query, session))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_challenge() => "challenge",
            Err(_) => "error",
        };
        metrics::counter!("search_requests_total", "engine" => engine.name(), "outcome" => outcome)
            .increment(1);
        info!(
            "{} search finished in {:?} ({})",
            engine.name(),
            start.elapsed(),
            outcome
        );
        result
    }

    fn record(&self, company: &str, engine: &str, query: &str, resolution: CaptchaResolution) {
        metrics::counter!(
            "captcha_events_total",
            "engine" => engine.to_string(),
            "resolution" => resolution.as_str()
        )
        .increment(1);
        self.captcha_log
            .append(CaptchaEvent::new(company, engine, query, resolution));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::search_result::SearchResult;
    use crate::engines::traits::{ElementSnapshot, EngineError, NavigateOptions, PageContent};
    use crate::infrastructure::search::manual_solve::ChannelClearance;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedEngine {
        name: &'static str,
        manual: bool,
        responses: Mutex<VecDeque<Result<SearchPage, SearchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(name: &'static str, responses: Vec<Result<SearchPage, SearchError>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                manual: false,
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn manual(name: &'static str, responses: Vec<Result<SearchPage, SearchError>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                manual: true,
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchEngine for ScriptedEngine {
        async fn search(
            &self,
            _query: &str,
            _session: &dyn BrowserSession,
        ) -> Result<SearchPage, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(SearchError::EngineError("script exhausted".into())))
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn supports_manual_solve(&self) -> bool {
            self.manual
        }
    }

    struct NoBrowser;

    #[async_trait]
    impl BrowserSession for NoBrowser {
        async fn navigate(&self, _u: &str, _o: &NavigateOptions) -> Result<PageContent, EngineError> {
            Ok(PageContent::default())
        }
        async fn find_elements(&self, _s: &str) -> Result<Vec<ElementSnapshot>, EngineError> {
            Ok(Vec::new())
        }
        async fn click(&self, _selector: &str, _text: Option<&str>) -> Result<bool, EngineError> {
            Ok(false)
        }
        async fn close(&self) -> Result<(), EngineError> {
            Ok(())
        }
        fn name(&self) -> &'static str {
            "none"
        }
    }

    fn page(url: &str) -> SearchPage {
        SearchPage::new(vec![SearchResult::new("Acme", url, "", "test", 0)])
    }

    fn coordinator(engines: Vec<Arc<dyn SearchEngine>>) -> FallbackCoordinator {
        FallbackCoordinator::new(
            engines,
            SearchBudget::new(600, 1),
            CaptchaLog::new(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_primary_success_uses_no_fallback() {
        let primary = ScriptedEngine::new("google", vec![Ok(page("https://acme.com"))]);
        let secondary = ScriptedEngine::new("duckduckgo", vec![]);
        let coord = coordinator(vec![primary.clone(), secondary.clone()]);

        let outcome = coord.search("Acme", "acme", &NoBrowser).await.unwrap();
        assert_eq!(outcome.engine, "google");
        assert_eq!(secondary.calls(), 0);
        assert!(coord.captcha_log().is_empty());
        assert_eq!(coord.state_of("Acme"), None);
    }

    #[tokio::test]
    async fn test_challenge_falls_back_to_secondary_once() {
        let primary = ScriptedEngine::new("google", vec![Err(SearchError::challenge("google"))]);
        let secondary = ScriptedEngine::new("duckduckgo", vec![Ok(page("https://acme.com"))]);
        let coord = coordinator(vec![primary.clone(), secondary.clone()]);

        let outcome = coord.search("Acme", "acme", &NoBrowser).await.unwrap();
        assert_eq!(outcome.engine, "duckduckgo");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);

        let events = coord.captcha_log().snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].engine, "google");
        assert_eq!(events[0].resolution, CaptchaResolution::AutoFallback);
    }

    #[tokio::test]
    async fn test_challenge_on_every_engine_is_blocked() {
        let primary = ScriptedEngine::new("google", vec![Err(SearchError::challenge("google"))]);
        let secondary =
            ScriptedEngine::new("duckduckgo", vec![Err(SearchError::challenge("duckduckgo"))]);
        let coord = coordinator(vec![primary.clone(), secondary.clone()]);

        let err = coord.search("Acme", "acme", &NoBrowser).await.unwrap_err();
        assert_eq!(
            err,
            FallbackError::Blocked {
                engine: "duckduckgo".to_string()
            }
        );
        assert_eq!(secondary.calls(), 1);
        assert_eq!(coord.captcha_log().len(), 1);
    }

    #[tokio::test]
    async fn test_non_challenge_failures_report_search_failed() {
        let primary = ScriptedEngine::new("google", vec![Err(SearchError::Timeout)]);
        let secondary = ScriptedEngine::new(
            "duckduckgo",
            vec![Err(SearchError::NetworkError("connection reset".into()))],
        );
        let coord = coordinator(vec![primary, secondary]);

        let err = coord.search("Acme", "acme", &NoBrowser).await.unwrap_err();
        assert!(matches!(err, FallbackError::SearchFailed(msg) if msg.contains("connection reset")));
        assert!(coord.captcha_log().is_empty());
    }

    #[tokio::test]
    async fn test_manual_solve_retries_same_engine_once() {
        let primary = ScriptedEngine::manual(
            "google",
            vec![
                Err(SearchError::challenge("google")),
                Ok(page("https://acme.com")),
            ],
        );
        let secondary = ScriptedEngine::new("duckduckgo", vec![]);
        let (signal, sender) = ChannelClearance::new();
        sender.send(()).unwrap();
        let coord = coordinator(vec![primary.clone(), secondary.clone()])
            .with_manual_solve(Arc::new(signal));

        let outcome = coord.search("Acme", "acme", &NoBrowser).await.unwrap();
        assert_eq!(outcome.engine, "google");
        assert_eq!(primary.calls(), 2);
        assert_eq!(secondary.calls(), 0);

        let events = coord.captcha_log().snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resolution, CaptchaResolution::ManualSolve);
    }

    #[tokio::test]
    async fn test_manual_solve_never_calls_engine_more_than_twice() {
        let primary = ScriptedEngine::manual(
            "google",
            vec![
                Err(SearchError::challenge("google")),
                Err(SearchError::challenge("google")),
            ],
        );
        let secondary = ScriptedEngine::new("duckduckgo", vec![Ok(page("https://acme.com"))]);
        let (signal, sender) = ChannelClearance::new();
        sender.send(()).unwrap();
        sender.send(()).unwrap();
        let coord = coordinator(vec![primary.clone(), secondary.clone()])
            .with_manual_solve(Arc::new(signal));

        let outcome = coord.search("Acme", "acme", &NoBrowser).await.unwrap();
        assert_eq!(outcome.engine, "duckduckgo");
        assert_eq!(primary.calls(), 2);

        let resolutions: Vec<_> = coord
            .captcha_log()
            .snapshot()
            .into_iter()
            .map(|e| e.resolution)
            .collect();
        assert_eq!(
            resolutions,
            vec![CaptchaResolution::ManualSolve, CaptchaResolution::AutoFallback]
        );
    }

    #[tokio::test]
    async fn test_state_is_observable_while_awaiting_clearance() {
        let primary = ScriptedEngine::manual(
            "google",
            vec![
                Err(SearchError::challenge("google")),
                Ok(page("https://acme.com")),
            ],
        );
        let (signal, sender) = ChannelClearance::new();
        let coord = Arc::new(coordinator(vec![primary]).with_manual_solve(Arc::new(signal)));

        let task = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.search("Acme", "acme", &NoBrowser).await })
        };

        let mut waited = 0;
        while coord.awaiting_clearance().is_empty() && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        assert_eq!(
            coord.state_of("Acme"),
            Some(FallbackState::AwaitingClearance { engine_idx: 0 })
        );

        sender.send(()).unwrap();
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.engine, "google");
        assert!(coord.awaiting_clearance().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_companies_keep_separate_states() {
        let primary = ScriptedEngine::manual(
            "google",
            vec![
                Err(SearchError::challenge("google")),
                Err(SearchError::challenge("google")),
                Ok(page("https://acme.com")),
                Ok(page("https://acme.com")),
            ],
        );
        let (signal, sender) = ChannelClearance::new();
        let coord = Arc::new(coordinator(vec![primary]).with_manual_solve(Arc::new(signal)));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let coord = coord.clone();
                tokio::spawn(async move { coord.search("Acme", "acme", &NoBrowser).await })
            })
            .collect();

        let mut waited = 0;
        while coord.awaiting_clearance().len() < 2 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        assert_eq!(coord.awaiting_clearance(), vec!["Acme", "Acme"]);

        // 放行一个，另一个仍在等待
        sender.send(()).unwrap();
        let mut waited = 0;
        while !tasks.iter().any(|t| t.is_finished()) && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        assert_eq!(tasks.iter().filter(|t| t.is_finished()).count(), 1);
        assert_eq!(coord.awaiting_clearance().len(), 1);
        assert_eq!(
            coord.state_of("Acme"),
            Some(FallbackState::AwaitingClearance { engine_idx: 0 })
        );

        sender.send(()).unwrap();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().engine, "google");
        }
        assert_eq!(coord.state_of("Acme"), None);
    }

    #[tokio::test]
    async fn test_no_engines_is_search_failed() {
        let coord = coordinator(vec![]);
        assert!(matches!(
            coord.search("Acme", "acme", &NoBrowser).await,
            Err(FallbackError::SearchFailed(_))
        ));
    }
}
