// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SelectorSettings;
use crate::domain::models::search_result::{KnowledgePanel, SearchResult};
use crate::domain::models::website::{Evidence, WebsiteCandidate};
use crate::domain::services::country::{country_tld, mentions_country};
use crate::domain::services::query_builder::CompanyName;
use crate::utils::url_utils::{host_matches, host_of, parse_website, registrable_label, site_root, tld};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// 非官网的目录、社交、新闻和聚合站点
pub const DEFAULT_DENYLIST: &[&str] = &[
    "linkedin.com", "facebook.com", "fb.com", "twitter.com", "x.com", "instagram.com",
    "youtube.com", "pinterest.com", "tiktok.com", "reddit.com", "medium.com", "slideshare.net",
    "crunchbase.com", "wikipedia.org", "wikipedia.com", "wikimedia.org", "bloomberg.com",
    "reuters.com", "bbc.com", "bbc.co.uk", "cnn.com", "nytimes.com", "theguardian.com",
    "forbes.com", "techcrunch.com", "businesswire.com", "prnewswire.com", "duckduckgo.com",
    "google.com", "w3.org", "zoominfo.com", "dial4trade.com", "zaubacorp.com", "cleartax.in",
    "salezshark.com", "craft.co", "insiderbiz.in", "indiabiz.info", "gust.com", "glassdoor.com",
    "glassdoor.co.in", "emis.com", "indiamart.com", "f6s.com", "bulwarktech.com", "bdsoft.in",
    "datanyze.com", "yellowpages.com", "yelp.com", "dnb.com", "opencorporates.com",
    "kompass.com", "europages.com", "amazon.com", "alibaba.com", "tradeindia.com",
    "justdial.com", "yellowpages.ae", "apollo.io", "rocketreach.co", "owler.com",
    "pitchbook.com", "tracxn.com", "bing.com",
];

/// 出现在主机名开头即视为非官网
const DENYLIST_HOST_PREFIXES: &[&str] = &["news.", "blog."];
/// 出现在 URL 中即视为非官网
const DENYLIST_URL_MARKERS: &[&str] = &["press-release"];
/// 文章类路径片段
const ARTICLE_PATH_MARKERS: &[&str] = &[
    "/news", "/blog", "/article", "/press", "/story", "/stories", "/wiki/", "/jobs", "/careers/",
];
const TITLE_CUES: &[&str] = &["official", "home", "welcome to", "homepage"];
/// 作为域名时不能代表某一家公司的常见名称用词
const GENERIC_NAME_WORDS: &[&str] = &[
    "global", "international", "general", "united", "national", "trading", "group", "holding",
    "holdings", "systems", "solutions", "services", "technologies", "technology", "industries",
    "enterprises", "consulting", "digital", "smart", "royal", "golden", "first", "best", "star",
];

/// 候选来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Organic,
    Panel,
    Overview,
}

/// 网站选择结果
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// 选中的网站
    Selected(WebsiteCandidate),
    /// 没有足够可信的候选；附带被拒绝的最佳候选便于诊断
    NoMatch {
        best_rejected: Option<WebsiteCandidate>,
    },
}

impl Selection {
    pub fn candidate(&self) -> Option<&WebsiteCandidate> {
        match self {
            Selection::Selected(candidate) => Some(candidate),
            Selection::NoMatch { .. } => None,
        }
    }
}

/// 网站选择器
///
/// 纯函数式打分：输入相同则输出相同，不访问网络
#[derive(Debug, Clone)]
pub struct WebsiteSelector {
    settings: SelectorSettings,
    denylist: Vec<String>,
}

impl Default for WebsiteSelector {
    fn default() -> Self {
        Self::new(SelectorSettings::default())
    }
}

impl WebsiteSelector {
    pub fn new(settings: SelectorSettings) -> Self {
        let mut denylist: Vec<String> = DEFAULT_DENYLIST.iter().map(|d| d.to_string()).collect();
        denylist.extend(
            settings
                .extra_denylist
                .iter()
                .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
                .filter(|d| !d.is_empty()),
        );
        Self { settings, denylist }
    }

    /// 主机或 URL 是否属于目录/社交/新闻站点
    pub fn is_denylisted(&self, host: &str, url: &str) -> bool {
        let url_lower = url.to_lowercase();
        self.denylist.iter().any(|d| host_matches(host, d))
            || DENYLIST_HOST_PREFIXES.iter().any(|p| host.starts_with(p))
            || DENYLIST_URL_MARKERS.iter().any(|m| url_lower.contains(m))
    }

    /// 从搜索结果中选出官网
    ///
    /// # 参数
    ///
    /// * `name` - 解析后的公司名
    /// * `country` - 国家（可选）
    /// * `results` - 按排名排列的搜索结果
    /// * `panel` - 知识面板；其网站视为排名 0，AI 概览提到的网站按出现顺序排名
    ///
    /// # 返回值
    ///
    /// 选中的候选，或 `NoMatch`
    pub fn select(
        &self,
        name: &CompanyName,
        country: Option<&str>,
        results: &[SearchResult],
        panel: Option<&KnowledgePanel>,
    ) -> Selection {
        let mut scored: Vec<(WebsiteCandidate, bool)> = Vec::new();

        if let Some(panel) = panel {
            if let Some(website) = panel.website.as_deref() {
                let result = SearchResult::new("", website, "", "knowledge_panel", 0);
                scored.extend(self.score(name, country, &result, Origin::Panel));
            }
            for (rank, website) in panel.mentioned_websites.iter().enumerate() {
                let result = SearchResult::new("", website.as_str(), "", "ai_overview", rank);
                scored.extend(self.score(name, country, &result, Origin::Overview));
            }
        }
        scored.extend(
            results
                .iter()
                .filter_map(|result| self.score(name, country, result, Origin::Organic)),
        );

        // One candidate per host, best score wins
        let mut by_host: HashMap<String, (WebsiteCandidate, bool)> = HashMap::new();
        for (candidate, denylisted) in scored {
            match by_host.get(&candidate.domain) {
                Some((existing, _)) if compare(existing, &candidate) != Ordering::Greater => {}
                _ => {
                    by_host.insert(candidate.domain.clone(), (candidate, denylisted));
                }
            }
        }

        let (allowed, denied): (Vec<_>, Vec<_>) =
            by_host.into_values().partition(|(_, denylisted)| !denylisted);
        let mut pool: Vec<WebsiteCandidate> = if allowed.is_empty() {
            denied.into_iter().map(|(c, _)| c).collect()
        } else {
            allowed.into_iter().map(|(c, _)| c).collect()
        };
        pool.sort_by(|a, b| compare(b, a));

        let Some(best) = pool.into_iter().next() else {
            return Selection::NoMatch { best_rejected: None };
        };

        if best.confidence >= self.settings.min_confidence {
            debug!(
                "Selected {} for {} (confidence {:.2}, evidence {:?})",
                best.domain, name.raw, best.confidence, best.evidence
            );
            Selection::Selected(best)
        } else {
            debug!(
                "Best candidate {} for {} below threshold ({:.2} < {:.2})",
                best.domain, name.raw, best.confidence, self.settings.min_confidence
            );
            Selection::NoMatch {
                best_rejected: Some(best),
            }
        }
    }

    /// 为单个结果打分，返回候选以及是否命中黑名单
    fn score(
        &self,
        name: &CompanyName,
        country: Option<&str>,
        result: &SearchResult,
        origin: Origin,
    ) -> Option<(WebsiteCandidate, bool)> {
        let url = parse_website(&result.url)?;
        let host = host_of(&url)?;
        let label = registrable_label(&host);
        let s = &self.settings;
        let mut evidence = BTreeSet::new();

        let name_score = name_match(name, label, &mut evidence);

        let mut country_score: f64 = 0.0;
        if let Some(country) = country {
            if country_tld(country).is_some_and(|code| code == tld(&host)) {
                evidence.insert(Evidence::CountryTld);
                country_score = 1.0;
            }
            let context = format!("{} {}", result.title, result.snippet);
            if mentions_country(&context, country) {
                evidence.insert(Evidence::CountryMentioned);
                country_score = country_score.max(0.5);
            }
        }

        let rank_score = 1.0 / (1.0 + result.rank as f64);
        if result.rank < 3 {
            evidence.insert(Evidence::EarlyRank);
        }

        let title_lower = result.title.to_lowercase();
        let title_score = if origin == Origin::Panel {
            evidence.insert(Evidence::KnowledgePanel);
            1.0
        } else if origin == Origin::Overview {
            evidence.insert(Evidence::AiOverview);
            1.0
        } else if TITLE_CUES.iter().any(|cue| title_lower.contains(cue)) {
            evidence.insert(Evidence::TitleCue);
            1.0
        } else {
            0.0
        };

        let path = url.path().to_lowercase();
        let depth = path.split('/').filter(|seg| !seg.is_empty()).count();
        let penalty = if ARTICLE_PATH_MARKERS.iter().any(|m| path.contains(m)) || depth > 2 {
            evidence.insert(Evidence::DeepPathPenalty);
            s.path_penalty
        } else {
            0.0
        };

        let mut confidence = s.name_weight * name_score
            + s.country_weight * country_score
            + s.rank_weight * rank_score
            + s.title_weight * title_score
            - penalty;

        let denylisted = self.is_denylisted(&host, url.as_str());
        if denylisted {
            evidence.insert(Evidence::DenylistedFallback);
            confidence *= s.denylist_multiplier;
        }

        Some((
            WebsiteCandidate {
                url: site_root(&url),
                domain: host,
                rank: result.rank,
                confidence: confidence.clamp(0.0, 1.0),
                evidence,
            },
            denylisted,
        ))
    }
}

/// 域名主标签与公司名的匹配度 [0, 1]
fn name_match(name: &CompanyName, label: &str, evidence: &mut BTreeSet<Evidence>) -> f64 {
    let label = label.replace('-', "");
    if label.is_empty() {
        return 0.0;
    }
    let slugs: Vec<&str> = [name.slug.as_str(), name.raw_slug.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    if slugs.iter().any(|s| *s == label) {
        evidence.insert(Evidence::DomainEqualsName);
        return 1.0;
    }
    // 域名是名称的缩写时须覆盖名称的大部分，且不能只是其中一个词
    let single_word = name.tokens.len() > 1 && name.tokens.iter().any(|t| *t == label);
    let covers_name = |s: &str| {
        label.len() >= 4 && !single_word && s.contains(label.as_str()) && label.len() * 5 >= s.len() * 3
    };
    if slugs
        .iter()
        .any(|s| (s.len() >= 3 && label.contains(s)) || covers_name(*s))
    {
        evidence.insert(Evidence::DomainContainsName);
        return 0.8;
    }

    // 名称的首个词通常是品牌，其后的词多为行业描述
    if single_word
        && label.len() >= 4
        && name.tokens.first().is_some_and(|t| *t == label)
        && !GENERIC_NAME_WORDS.contains(&label.as_str())
    {
        evidence.insert(Evidence::DomainTokenOverlap);
        return 0.6;
    }

    let significant: Vec<&String> = name.tokens.iter().filter(|t| t.len() >= 3).collect();
    let overlap = if significant.is_empty() {
        0.0
    } else {
        significant.iter().filter(|t| label.contains(t.as_str())).count() as f64
            / significant.len() as f64
    };
    // 泛化词域名只计词元重叠
    let similarity = if single_word {
        0.0
    } else {
        slugs
            .iter()
            .map(|s| strsim::jaro_winkler(s, &label))
            .fold(0.0, f64::max)
    };
    let score = (overlap * 0.7).max(if similarity >= 0.85 { similarity * 0.6 } else { 0.0 });
    if score > 0.0 {
        evidence.insert(Evidence::DomainTokenOverlap);
    }
    score
}

/// 按置信度、主机名长度（短者优先）、排名（靠前优先）排序
fn compare(a: &WebsiteCandidate, b: &WebsiteCandidate) -> Ordering {
    a.confidence
        .partial_cmp(&b.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.domain.len().cmp(&a.domain.len()))
        .then_with(|| b.rank.cmp(&a.rank))
        .then_with(|| b.domain.cmp(&a.domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, title: &str, rank: usize) -> SearchResult {
        SearchResult::new(title, url, "", "google", rank)
    }

    fn selected_domain(selection: &Selection) -> Option<&str> {
        selection.candidate().map(|c| c.domain.as_str())
    }

    #[test]
    fn test_exact_domain_beats_social_profile() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme Corp");
        let results = vec![
            result("https://acmecorp.ae", "Acme Corp - Home", 0),
            result("https://www.linkedin.com/company/acme", "Acme | LinkedIn", 1),
        ];
        let selection = selector.select(&name, Some("UAE"), &results, None);
        assert_eq!(selected_domain(&selection), Some("acmecorp.ae"));
        let candidate = selection.candidate().unwrap();
        assert!(candidate.has(Evidence::DomainEqualsName));
        assert!(candidate.has(Evidence::CountryTld));
        assert_eq!(candidate.url, "https://acmecorp.ae/");
    }

    #[test]
    fn test_exact_domain_scores_strictly_higher_than_aggregator() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme Corp");
        // Aggregator ranked first and titled with a cue still loses
        let aggregator = result("https://www.zoominfo.com/c/acme-corp/123", "Acme Corp official profile", 0);
        let official = result("https://acmecorp.com", "Acme", 5);

        let agg_selection = selector.select(&name, None, std::slice::from_ref(&aggregator), None);
        let off_selection = selector.select(&name, None, std::slice::from_ref(&official), None);
        let agg_score = match agg_selection {
            Selection::NoMatch { best_rejected: Some(c) } => c.confidence,
            Selection::Selected(c) => c.confidence,
            Selection::NoMatch { best_rejected: None } => 0.0,
        };
        let off_score = off_selection.candidate().unwrap().confidence;
        assert!(off_score > agg_score);
    }

    #[test]
    fn test_only_denylisted_results_yield_no_match() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme Corp");
        let results = vec![
            result("https://www.linkedin.com/company/acme", "Acme | LinkedIn", 0),
            result("https://www.facebook.com/acmecorp", "Acme Corp", 1),
            result("https://www.crunchbase.com/organization/acme", "Acme - Crunchbase", 2),
        ];
        match selector.select(&name, Some("UAE"), &results, None) {
            Selection::NoMatch { best_rejected } => {
                let best = best_rejected.unwrap();
                assert!(best.has(Evidence::DenylistedFallback));
            }
            other => panic!("expected no match, got {:?}", other),
        }
    }

    #[test]
    fn test_unrelated_results_below_threshold() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Zephyr Marine Logistics");
        let results = vec![result("https://www.weather.com/forecast", "Weather forecast", 3)];
        assert!(matches!(
            selector.select(&name, None, &results, None),
            Selection::NoMatch { .. }
        ));
    }

    #[test]
    fn test_empty_results_yield_no_match() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme");
        assert_eq!(
            selector.select(&name, None, &[], None),
            Selection::NoMatch { best_rejected: None }
        );
    }

    #[test]
    fn test_selection_is_deterministic() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Gulf Steel Industries");
        let results = vec![
            result("https://gulfsteel.ae/about", "About us", 0),
            result("https://www.gulfsteelindustries.com", "Gulf Steel Industries", 1),
            result("https://news.example.com/gulf-steel", "Gulf Steel expands", 2),
        ];
        let first = selector.select(&name, Some("UAE"), &results, None);
        for _ in 0..5 {
            assert_eq!(selector.select(&name, Some("UAE"), &results, None), first);
        }
    }

    #[test]
    fn test_tie_prefers_shorter_domain_then_earlier_rank() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme");
        let results = vec![
            result("https://acme.co", "", 0),
            result("https://acme.com", "", 0),
        ];
        assert_eq!(
            selected_domain(&selector.select(&name, None, &results, None)),
            Some("acme.co")
        );
    }

    #[test]
    fn test_article_paths_are_penalised() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme");
        let results = vec![
            result("https://acme.com/news/2023/acme-wins-award", "Acme wins award", 0),
            result("https://acme.io", "Acme", 1),
        ];
        let selection = selector.select(&name, None, &results, None);
        assert_eq!(selected_domain(&selection), Some("acme.io"));
    }

    #[test]
    fn test_scheme_less_urls_are_accepted() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme Corp");
        let results = vec![result("acmecorp.ae", "Acme Corp", 0)];
        assert_eq!(
            selected_domain(&selector.select(&name, Some("UAE"), &results, None)),
            Some("acmecorp.ae")
        );
    }

    #[test]
    fn test_knowledge_panel_website_is_considered() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Acme Corp");
        let panel = KnowledgePanel {
            website: Some("https://www.acmecorp.com/".to_string()),
            ..Default::default()
        };
        let selection = selector.select(&name, None, &[], Some(&panel));
        let candidate = selection.candidate().unwrap();
        assert!(candidate.has(Evidence::KnowledgePanel));
        assert_eq!(candidate.domain, "acmecorp.com");
    }

    #[test]
    fn test_overview_mentions_are_candidates() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("42Gears Mobility Systems");
        let panel = KnowledgePanel {
            text: "AI Overview 42Gears is a mobile device management company ...".to_string(),
            mentioned_websites: vec![
                "https://www.linkedin.com".to_string(),
                "https://42gears.com".to_string(),
            ],
            ..Default::default()
        };
        let results = vec![result("https://www.g2.com/products/42gears/reviews", "42Gears Reviews", 0)];
        let selection = selector.select(&name, Some("India"), &results, Some(&panel));
        let candidate = selection.candidate().unwrap();
        assert_eq!(candidate.domain, "42gears.com");
        assert!(candidate.has(Evidence::AiOverview));
    }

    #[test]
    fn test_generic_word_domain_is_not_the_company_site() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("ABC Trading LLC");
        let results = vec![result("https://trading.com", "Trading news and markets", 0)];
        match selector.select(&name, None, &results, None) {
            Selection::NoMatch { best_rejected } => {
                let best = best_rejected.unwrap();
                assert_eq!(best.domain, "trading.com");
                assert!(!best.has(Evidence::DomainContainsName));
                assert!(best.confidence < 0.35);
            }
            other => panic!("expected no match, got {:?}", other),
        }
    }

    #[test]
    fn test_generic_leading_word_domain_is_rejected() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Global Trading LLC");
        let results = vec![result("https://global.com", "Global", 0)];
        assert!(matches!(
            selector.select(&name, None, &results, None),
            Selection::NoMatch { .. }
        ));
    }

    #[test]
    fn test_brand_word_domain_is_accepted() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Emirates Airline");
        let results = vec![result("https://www.emirates.com", "Emirates", 0)];
        let selection = selector.select(&name, None, &results, None);
        let candidate = selection.candidate().unwrap();
        assert_eq!(candidate.domain, "emirates.com");
        assert!(candidate.has(Evidence::DomainTokenOverlap));
        assert!(!candidate.has(Evidence::DomainContainsName));
    }

    #[test]
    fn test_abbreviated_domain_still_matches_name() {
        let selector = WebsiteSelector::default();
        let name = CompanyName::parse("Gulf Steel Industries");
        let results = vec![result("https://gulfsteelind.com", "Gulf Steel", 0)];
        let selection = selector.select(&name, None, &results, None);
        let candidate = selection.candidate().unwrap();
        assert!(candidate.has(Evidence::DomainContainsName));
    }

    #[test]
    fn test_denylisted_fallback_is_selected_when_threshold_allows() {
        let settings = SelectorSettings {
            min_confidence: 0.02,
            ..Default::default()
        };
        let selector = WebsiteSelector::new(settings);
        let name = CompanyName::parse("Acme Corp");
        let results = vec![
            result("https://www.linkedin.com/company/acme", "Acme | LinkedIn", 0),
            result("https://www.facebook.com/acmecorp", "Acme Corp", 1),
        ];
        let selection = selector.select(&name, None, &results, None);
        let candidate = selection.candidate().unwrap();
        assert!(candidate.has(Evidence::DenylistedFallback));
        assert_eq!(candidate.domain, "linkedin.com");
        assert!(candidate.confidence < SelectorSettings::default().min_confidence);
    }

    #[test]
    fn test_extra_denylist_from_settings() {
        let settings = SelectorSettings {
            extra_denylist: vec!["www.acme-directory.com".to_string()],
            ..Default::default()
        };
        let selector = WebsiteSelector::new(settings);
        assert!(selector.is_denylisted("acme-directory.com", "https://acme-directory.com/acme"));
        assert!(selector.is_denylisted("news.acme.com", "https://news.acme.com/"));
        assert!(!selector.is_denylisted("acme.com", "https://acme.com/"));
    }
}
