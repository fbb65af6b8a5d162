// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClearanceError {
    #[error("Clearance signal closed")]
    Closed,
    #[error("Clearance input error: {0}")]
    Io(String),
}

/// 人工处理验证码后的恢复信号
///
/// 调用方在等待期间挂起，只阻塞当前公司。
#[async_trait]
pub trait ClearanceSignal: Send + Sync {
    /// 等待操作者确认验证码已处理
    ///
    /// # 参数
    ///
    /// * `engine` - 触发验证码的搜索引擎
    /// * `query` - 触发验证码的查询
    async fn wait_for_clearance(&self, engine: &str, query: &str) -> Result<(), ClearanceError>;
}

/// 通过终端回车确认的恢复信号
///
/// 多个 worker 同时等待时提示依次出现。
pub struct StdinClearance {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinClearance {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinClearance {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClearanceSignal for StdinClearance {
    async fn wait_for_clearance(&self, engine: &str, query: &str) -> Result<(), ClearanceError> {
        let mut lines = self.lines.lock().await;
        warn!("CAPTCHA on {} for query {:?}, waiting for manual solve", engine, query);
        eprintln!(
            "请在浏览器窗口中完成 {} 的验证，然后按回车继续 (query: {})",
            engine, query
        );

        match lines.next_line().await {
            Ok(Some(_)) => {
                info!("Manual solve confirmed for {}", engine);
                Ok(())
            }
            Ok(None) => Err(ClearanceError::Closed),
            Err(e) => Err(ClearanceError::Io(e.to_string())),
        }
    }
}

/// 由通道驱动的恢复信号，供调度器或测试使用
pub struct ChannelClearance {
    receiver: Mutex<mpsc::UnboundedReceiver<()>>,
}

impl ChannelClearance {
    /// 创建信号及其发送端；每发送一次放行一次等待
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                receiver: Mutex::new(receiver),
            },
            sender,
        )
    }
}

#[async_trait]
impl ClearanceSignal for ChannelClearance {
    async fn wait_for_clearance(&self, engine: &str, _query: &str) -> Result<(), ClearanceError> {
        info!("Waiting for clearance signal for {}", engine);
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(ClearanceError::Closed)
    }
}
