// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 国家名与国家代码顶级域的对照

/// (国家代码顶级域, 别名列表)，别名均为小写
const COUNTRIES: &[(&str, &[&str])] = &[
    ("ae", &["uae", "united arab emirates", "emirates", "dubai", "abu dhabi"]),
    ("in", &["india", "bharat"]),
    ("uk", &["uk", "united kingdom", "great britain", "britain", "england", "gb"]),
    ("us", &["us", "usa", "united states", "united states of america", "america"]),
    ("de", &["germany", "deutschland"]),
    ("fr", &["france"]),
    ("it", &["italy", "italia"]),
    ("es", &["spain", "espana"]),
    ("nl", &["netherlands", "holland"]),
    ("be", &["belgium"]),
    ("ch", &["switzerland"]),
    ("at", &["austria"]),
    ("se", &["sweden"]),
    ("no", &["norway"]),
    ("dk", &["denmark"]),
    ("fi", &["finland"]),
    ("pl", &["poland"]),
    ("pt", &["portugal"]),
    ("ie", &["ireland"]),
    ("tr", &["turkey", "turkiye"]),
    ("sa", &["saudi arabia", "ksa", "saudi"]),
    ("qa", &["qatar"]),
    ("kw", &["kuwait"]),
    ("om", &["oman"]),
    ("bh", &["bahrain"]),
    ("eg", &["egypt"]),
    ("za", &["south africa"]),
    ("ng", &["nigeria"]),
    ("ke", &["kenya"]),
    ("pk", &["pakistan"]),
    ("bd", &["bangladesh"]),
    ("lk", &["sri lanka"]),
    ("sg", &["singapore"]),
    ("my", &["malaysia"]),
    ("id", &["indonesia"]),
    ("th", &["thailand"]),
    ("vn", &["vietnam", "viet nam"]),
    ("ph", &["philippines"]),
    ("cn", &["china", "prc"]),
    ("hk", &["hong kong"]),
    ("tw", &["taiwan"]),
    ("jp", &["japan"]),
    ("kr", &["south korea", "korea"]),
    ("au", &["australia"]),
    ("nz", &["new zealand"]),
    ("ca", &["canada"]),
    ("mx", &["mexico"]),
    ("br", &["brazil", "brasil"]),
    ("ar", &["argentina"]),
    ("cl", &["chile"]),
    ("ru", &["russia", "russian federation"]),
    ("ua", &["ukraine"]),
    ("il", &["israel"]),
];

/// 国家名或代码对应的顶级域
pub fn country_tld(country: &str) -> Option<&'static str> {
    let needle = country.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    COUNTRIES
        .iter()
        .find(|(code, aliases)| *code == needle || aliases.contains(&needle.as_str()))
        .map(|(code, _)| *code)
}

/// 顶级域对应的所有别名
pub fn country_aliases(tld: &str) -> &'static [&'static str] {
    COUNTRIES
        .iter()
        .find(|(code, _)| *code == tld)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// 文本中是否提及该国家（按词边界匹配任一别名）
pub fn mentions_country(text: &str, country: &str) -> bool {
    let lower = text.to_lowercase();
    let mut names: Vec<String> = vec![country.trim().to_lowercase()];
    if let Some(code) = country_tld(country) {
        names.extend(country_aliases(code).iter().map(|a| a.to_string()));
    }
    names
        .iter()
        .filter(|n| n.len() > 2)
        .any(|n| contains_word(&lower, n))
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_tld_from_alias_and_code() {
        assert_eq!(country_tld("UAE"), Some("ae"));
        assert_eq!(country_tld("United Arab Emirates"), Some("ae"));
        assert_eq!(country_tld("in"), Some("in"));
        assert_eq!(country_tld("Atlantis"), None);
        assert_eq!(country_tld(" "), None);
    }

    #[test]
    fn test_mentions_country_uses_word_boundaries() {
        assert!(mentions_country("Leading supplier in Dubai since 1990", "UAE"));
        assert!(mentions_country("Offices across the United Arab Emirates", "uae"));
        assert!(!mentions_country("Indiana Jones merchandise", "India"));
    }
}
