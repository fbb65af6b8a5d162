// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SearchSettings;
use crate::domain::search::engine::SearchError;
use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// 搜索请求额度
///
/// 每个引擎一个并发信号量和一个按分钟计的令牌桶，
/// 所有 worker 共享同一份额度。
#[derive(Clone)]
pub struct SearchBudget {
    semaphores: Arc<DashMap<String, Arc<Semaphore>>>,
    limiters: Arc<DashMap<String, Arc<DefaultDirectRateLimiter>>>,
    max_in_flight: usize,
    quota: Quota,
}

/// 持有期间占用引擎的一个并发名额
pub struct SearchPermit {
    _permit: OwnedSemaphorePermit,
}

impl SearchBudget {
    /// 创建搜索额度
    ///
    /// # 参数
    ///
    /// * `requests_per_minute` - 每个引擎每分钟允许的请求数（0 视为 1）
    /// * `max_in_flight` - 每个引擎同时进行的请求数（0 视为 1）
    pub fn new(requests_per_minute: u32, max_in_flight: usize) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            semaphores: Arc::new(DashMap::new()),
            limiters: Arc::new(DashMap::new()),
            max_in_flight: max_in_flight.max(1),
            quota: Quota::per_minute(per_minute),
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(settings.requests_per_minute, settings.max_in_flight)
    }

    /// 等待指定引擎的额度
    ///
    /// 先占并发名额，再等令牌桶放行。
    pub async fn acquire(&self, engine: &str) -> Result<SearchPermit, SearchError> {
        let permit = self
            .semaphore(engine)
            .acquire_owned()
            .await
            .map_err(|_| SearchError::RateLimitExceeded)?;

        let limiter = self.limiter(engine);
        if limiter.check().is_err() {
            debug!("Search budget exhausted for {}, waiting", engine);
            limiter.until_ready().await;
        }

        Ok(SearchPermit { _permit: permit })
    }

    /// 当前可用的并发名额
    pub fn available(&self, engine: &str) -> usize {
        self.semaphore(engine).available_permits()
    }

    fn semaphore(&self, engine: &str) -> Arc<Semaphore> {
        self.semaphores
            .entry(engine.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_in_flight)))
            .clone()
    }

    fn limiter(&self, engine: &str) -> Arc<DefaultDirectRateLimiter> {
        self.limiters
            .entry(engine.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)))
            .clone()
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default())
    }
}
