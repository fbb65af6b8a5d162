// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 国家顶级域下常见的二级后缀（如 co.uk、com.au）
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "gov", "ac", "edu", "ltd", "plc"];

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 解析网站地址，缺少协议时补全为 https
///
/// 只接受带主机名的 http/https 地址
pub fn parse_website(raw: &str) -> Option<Url> {
    let trimmed = raw.trim().trim_end_matches(['.', ',', ';']);
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else if trimmed.contains("://") {
        return None;
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?;
    if !host.contains('.') {
        return None;
    }
    Some(url)
}

/// 小写主机名，去掉 `www.` 前缀
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
}

/// 站点根地址，例如 `https://acme.ae/`
pub fn site_root(url: &Url) -> String {
    match url.host_str() {
        Some(host) => format!("{}://{}/", url.scheme(), host),
        None => url.as_str().to_string(),
    }
}

/// 顶级域
pub fn tld(host: &str) -> &str {
    host.rsplit('.').next().unwrap_or(host)
}

/// 可注册域名中的主标签
///
/// `www.acmecorp.ae` -> `acmecorp`，`shop.acme.co.uk` -> `acme`
pub fn registrable_label(host: &str) -> &str {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => host,
        1 => labels[0],
        n => {
            let last = labels[n - 1];
            let second = labels[n - 2];
            if n >= 3 && last.len() == 2 && SECOND_LEVEL_LABELS.contains(&second) {
                labels[n - 3]
            } else {
                second
            }
        }
    }
}

/// 主机名是否等于某域名或是其子域名
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}
