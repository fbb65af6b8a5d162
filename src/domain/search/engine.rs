// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_result::SearchPage;
use crate::engines::traits::{BrowserSession, EngineError};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error("Search engine error: {0}")]
    EngineError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Challenge page detected on {engine}")]
    ChallengeDetected { engine: String },
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Timeout")]
    Timeout,
}

impl SearchError {
    pub fn challenge(engine: impl Into<String>) -> Self {
        SearchError::ChallengeDetected {
            engine: engine.into(),
        }
    }

    pub fn is_challenge(&self) -> bool {
        matches!(self, SearchError::ChallengeDetected { .. })
    }
}

impl From<EngineError> for SearchError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Timeout => SearchError::Timeout,
            EngineError::Navigation(msg) => SearchError::NetworkError(msg),
            other => SearchError::EngineError(other.to_string()),
        }
    }
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Perform a search query
    ///
    /// Browser-driven engines navigate `session`; HTTP engines ignore it.
    async fn search(
        &self,
        query: &str,
        session: &dyn BrowserSession,
    ) -> Result<SearchPage, SearchError>;

    /// Get the name of the search engine
    fn name(&self) -> &'static str;

    /// Whether a person can clear this engine's challenge in the visible browser
    fn supports_manual_solve(&self) -> bool {
        false
    }
}
