// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{
    BrowserLauncher, BrowserSession, ElementSnapshot, EngineError, NavigateOptions, PageContent,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 资源屏蔽时拦截的 URL 模式
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.css", "*.woff",
    "*.woff2", "*.ttf", "*.otf", "*.mp4", "*.webm", "*.mp3", "*doubleclick.net*",
    "*googlesyndication.com*", "*google-analytics.com*", "*googletagmanager.com*",
    "*facebook.net*", "*hotjar.com*",
];

const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const ELEMENTS_SCRIPT: &str = r#"(sel) => Array.from(document.querySelectorAll(sel)).map(e => ({
    text: (e.innerText || e.textContent || '').trim(),
    attributes: Object.fromEntries(Array.from(e.attributes).map(a => [a.name, a.value]))
}))"#;

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(default)]
    text: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

/// 基于 chromiumoxide 的浏览器启动器
///
/// 启动本地 Chrome（或连接 `remote_debugging_url` 指向的实例），
/// 每个会话使用独立的浏览器上下文
pub struct ChromiumLauncher {
    browser: Arc<Mutex<Option<Browser>>>,
    handler: JoinHandle<()>,
    profile: BrowserSettings,
}

impl ChromiumLauncher {
    /// 启动或连接浏览器
    ///
    /// # 参数
    ///
    /// * `profile` - 浏览器配置
    ///
    /// # 返回值
    ///
    /// * `Ok(ChromiumLauncher)` - 可用的启动器
    /// * `Err(EngineError::Launch)` - 浏览器无法启动或连接
    pub async fn launch(profile: BrowserSettings) -> Result<Self, EngineError> {
        let launch_timeout = Duration::from_secs(profile.launch_timeout_secs);

        let (browser, mut handler) = if let Some(ref url) = profile.remote_debugging_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            tokio::time::timeout(launch_timeout, Browser::connect(url))
                .await
                .map_err(|_| EngineError::Launch("timed out connecting to Chrome".to_string()))?
                .map_err(|e| {
                    EngineError::Launch(format!("Failed to connect to remote Chrome: {}", e))
                })?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(launch_timeout)
                .window_size(profile.viewport_width, profile.viewport_height)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-blink-features=AutomationControlled")
                .arg(format!("--lang={}", profile.locale));
            if !profile.headless {
                builder = builder.with_head();
            }
            let config = builder.build().map_err(EngineError::Launch)?;

            tokio::time::timeout(launch_timeout, Browser::launch(config))
                .await
                .map_err(|_| EngineError::Launch("timed out launching Chrome".to_string()))?
                .map_err(|e| EngineError::Launch(e.to_string()))?
        };

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        info!(
            headless = profile.headless,
            block_resources = profile.block_resources,
            "Browser ready"
        );

        Ok(Self {
            browser: Arc::new(Mutex::new(Some(browser))),
            handler,
            profile,
        })
    }

    async fn prepare_page(&self, page: &Page) -> Result<(), EngineError> {
        let profile = &self.profile;
        page.set_user_agent(profile.user_agent.as_str())
            .await
            .map_err(other)?;
        page.evaluate_on_new_document(HIDE_WEBDRIVER_SCRIPT)
            .await
            .map_err(other)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            profile.viewport_width as i64,
            profile.viewport_height as i64,
            1.0,
            false,
        ))
        .await
        .map_err(other)?;
        page.execute(SetLocaleOverrideParams {
            locale: Some(profile.locale.clone()),
        })
        .await
        .map_err(other)?;
        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(profile.timezone.clone()))
            .await
        {
            warn!("Timezone override {} rejected: {}", profile.timezone, e);
        }

        if profile.block_resources {
            page.execute(EnableParams::default()).await.map_err(other)?;
            let patterns = BLOCKED_URL_PATTERNS.iter().map(|p| p.to_string()).collect();
            page.execute(SetBlockedUrLsParams::new(patterns))
                .await
                .map_err(other)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn new_session(&self) -> Result<Arc<dyn BrowserSession>, EngineError> {
        let (page, context_id) = {
            let guard = self.browser.lock().await;
            let browser = guard.as_ref().ok_or(EngineError::SessionClosed)?;

            let context_id = browser
                .execute(CreateBrowserContextParams::default())
                .await
                .map_err(|e| EngineError::Launch(e.to_string()))?
                .result
                .browser_context_id
                .clone();

            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(EngineError::Other)?;
            (browser.new_page(target).await.map_err(other)?, context_id)
        };

        self.prepare_page(&page).await?;
        debug!("Opened browser context {:?}", context_id);

        Ok(Arc::new(ChromiumSession {
            page: Mutex::new(Some(page)),
            context_id,
            browser: Arc::clone(&self.browser),
        }))
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        if let Some(mut browser) = self.browser.lock().await.take() {
            browser.close().await.map_err(other)?;
            if let Err(e) = browser.wait().await {
                debug!("Browser process wait failed: {}", e);
            }
        }
        self.handler.abort();
        info!("Browser shut down");
        Ok(())
    }
}

/// 单个浏览器上下文中的会话
pub struct ChromiumSession {
    page: Mutex<Option<Page>>,
    context_id: BrowserContextId,
    browser: Arc<Mutex<Option<Browser>>>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &self,
        url: &str,
        options: &NavigateOptions,
    ) -> Result<PageContent, EngineError> {
        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or(EngineError::SessionClosed)?;

        // Wrap the entire operation in a timeout
        tokio::time::timeout(options.timeout, async {
            page.goto(url)
                .await
                .map_err(|e| EngineError::Navigation(e.to_string()))?;

            if let Some(selector) = &options.wait_for_selector {
                if let Err(e) = page.find_element(selector.as_str()).await {
                    debug!("Selector {} not present after load: {}", selector, e);
                }
            }

            let html = page.content().await.map_err(other)?;
            let text = page
                .evaluate("document.body ? document.body.innerText : ''")
                .await
                .map_err(other)?
                .into_value::<String>()
                .unwrap_or_default();
            let final_url = page
                .url()
                .await
                .map_err(other)?
                .unwrap_or_else(|| url.to_string());

            Ok(PageContent {
                url: final_url,
                html,
                text,
            })
        })
        .await
        .map_err(|_| EngineError::Timeout)?
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementSnapshot>, EngineError> {
        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or(EngineError::SessionClosed)?;

        let selector_literal = serde_json::to_string(selector).map_err(other)?;
        let script = format!("({})({})", ELEMENTS_SCRIPT, selector_literal);
        let raw = page
            .evaluate(script)
            .await
            .map_err(other)?
            .into_value::<Vec<RawElement>>()
            .map_err(other)?;

        Ok(raw
            .into_iter()
            .map(|e| ElementSnapshot {
                text: e.text,
                attributes: e.attributes,
            })
            .collect())
    }

    async fn click(&self, selector: &str, text: Option<&str>) -> Result<bool, EngineError> {
        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or(EngineError::SessionClosed)?;

        let elements = match page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!("No element for {}: {}", selector, e);
                return Ok(false);
            }
        };
        let wanted = text.map(str::to_lowercase);
        for element in elements {
            if let Some(wanted) = &wanted {
                let visible = element.inner_text().await.map_err(other)?.unwrap_or_default();
                if !visible.to_lowercase().contains(wanted.as_str()) {
                    continue;
                }
            }
            element.click().await.map_err(other)?;
            debug!("Clicked {} ({:?})", selector, text);
            return Ok(true);
        }
        Ok(false)
    }

    async fn close(&self) -> Result<(), EngineError> {
        if let Some(page) = self.page.lock().await.take() {
            if let Err(e) = page.close().await {
                debug!("Page close failed: {}", e);
            }
        }
        if let Some(browser) = self.browser.lock().await.as_ref() {
            browser
                .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
                .await
                .map_err(other)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

fn other(e: impl std::fmt::Display) -> EngineError {
    EngineError::Other(e.to_string())
}
