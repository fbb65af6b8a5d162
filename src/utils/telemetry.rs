// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 默认日志过滤指令，`verbosity` 来自命令行 `-v` 次数
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info,contactrs=info,chromiumoxide=warn",
        1 => "info,contactrs=debug,chromiumoxide=warn",
        _ => "debug,contactrs=trace",
    }
}

/// 初始化日志，`RUST_LOG` 优先于默认指令
pub fn init_telemetry(verbosity: u8) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(verbosity).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
