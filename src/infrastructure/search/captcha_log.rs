// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::captcha_event::CaptchaEvent;
use parking_lot::Mutex;
use std::sync::Arc;

/// 只追加的验证码事件日志，worker 之间共享
#[derive(Debug, Clone, Default)]
pub struct CaptchaLog {
    events: Arc<Mutex<Vec<CaptchaEvent>>>,
}

impl CaptchaLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: CaptchaEvent) {
        self.events.lock().push(event);
    }

    /// 按追加顺序返回全部事件的副本
    pub fn snapshot(&self) -> Vec<CaptchaEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
