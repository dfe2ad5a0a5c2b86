use anyhow::{bail, Context};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Dotted-quad IPv4 literal anywhere in the input.
const IPV4_HOST_PATTERN: &str = r"\b(?:\d{1,3}\.){3}\d{1,3}\b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub keywords: Vec<String>,
    pub suspicious_tlds: Vec<String>,
    pub asset_request_phrases: Vec<String>,
    pub weights: RuleWeights,
    pub limits: RuleLimits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleWeights {
    pub keyword: u32,
    pub gibberish: u32,
    pub repetition: u32,
    pub insecure_protocol: u32,
    pub ip_host: u32,
    pub at_symbol: u32,
    pub suspicious_tld: u32,
    pub long_url: u32,
    pub asset_request: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleLimits {
    /// Anomaly checks only run on inputs longer than this.
    pub anomaly_min_length: usize,
    pub max_vowel_ratio: f64,
    pub repeat_run: usize,
    /// URL-like inputs longer than this are flagged.
    pub long_url_length: usize,
    /// Plain messages shorter than this get an informational note.
    pub short_message_length: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let keywords = [
            "verify",
            "suspended",
            "urgent",
            "immediately",
            "password",
            "bank",
            "bitcoin",
            "crypto",
            "prize",
            "winner",
            "lottery",
            "gift card",
            "login",
            "refund",
            "wire transfer",
            "confirm your",
            "unusual activity",
        ];
        let tlds = [".xyz", ".top", ".gq", ".tk", ".ml", ".cf", ".cc", ".ru", ".cn"];
        let phrases = ["click link", "open attachment"];

        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            suspicious_tlds: tlds.iter().map(|s| s.to_string()).collect(),
            asset_request_phrases: phrases.iter().map(|s| s.to_string()).collect(),
            weights: RuleWeights::default(),
            limits: RuleLimits::default(),
        }
    }
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            keyword: 15,
            gibberish: 35,
            repetition: 30,
            insecure_protocol: 25,
            ip_host: 40,
            at_symbol: 30,
            suspicious_tld: 20,
            long_url: 10,
            asset_request: 20,
        }
    }
}

impl Default for RuleLimits {
    fn default() -> Self {
        Self {
            anomaly_min_length: 6,
            max_vowel_ratio: 0.1,
            repeat_run: 4,
            long_url_length: 70,
            short_message_length: 20,
        }
    }
}

/// Compiled, read-only form of [`RulesConfig`]. Built once at startup and
/// shared between requests.
#[derive(Debug, Clone)]
pub struct RuleTable {
    keywords: Vec<String>,
    suspicious_tlds: Vec<String>,
    asset_request_phrases: Vec<String>,
    ip_host: Regex,
    weights: RuleWeights,
    limits: RuleLimits,
}

impl RuleTable {
    pub fn from_config(config: &RulesConfig) -> anyhow::Result<Self> {
        let keywords = normalize_list(&config.keywords, "keyword")?;
        let asset_request_phrases =
            normalize_list(&config.asset_request_phrases, "asset request phrase")?;

        let mut suspicious_tlds = normalize_list(&config.suspicious_tlds, "TLD")?;
        for tld in suspicious_tlds.iter_mut() {
            if !tld.starts_with('.') {
                tld.insert(0, '.');
            }
            if tld.len() < 2 {
                bail!("TLD entry '{tld}' has no label");
            }
        }

        let limits = config.limits.clone();
        if !(0.0..=1.0).contains(&limits.max_vowel_ratio) {
            bail!(
                "max_vowel_ratio must be between 0 and 1, got {}",
                limits.max_vowel_ratio
            );
        }
        if limits.repeat_run < 2 {
            bail!("repeat_run must be at least 2, got {}", limits.repeat_run);
        }

        let ip_host = Regex::new(IPV4_HOST_PATTERN).context("compiling IPv4 host pattern")?;

        log::debug!(
            "Rule table compiled: {} keywords, {} TLDs, {} asset request phrases",
            keywords.len(),
            suspicious_tlds.len(),
            asset_request_phrases.len()
        );

        Ok(Self {
            keywords,
            suspicious_tlds,
            asset_request_phrases,
            ip_host,
            weights: config.weights.clone(),
            limits,
        })
    }

    pub fn weights(&self) -> &RuleWeights {
        &self.weights
    }

    pub fn limits(&self) -> &RuleLimits {
        &self.limits
    }

    #[cfg(test)]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[cfg(test)]
    pub fn suspicious_tlds(&self) -> &[String] {
        &self.suspicious_tlds
    }

    /// Keywords present in `text`, in table order, each at most once.
    pub fn matched_keywords<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.keywords
            .iter()
            .filter(move |k| text.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Suspicious TLDs occurring anywhere in `text`, in table order. Plain
    /// substring match: `.ru` also fires on `site.rugby.com`.
    pub fn matched_tlds<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.suspicious_tlds
            .iter()
            .filter(move |tld| text.contains(tld.as_str()))
            .map(String::as_str)
    }

    pub fn has_asset_request(&self, text: &str) -> bool {
        self.asset_request_phrases
            .iter()
            .any(|phrase| text.contains(phrase.as_str()))
    }

    pub fn has_ip_host(&self, text: &str) -> bool {
        self.ip_host.is_match(text)
    }

    /// True when any character repeats `repeat_run` or more times in a row.
    pub fn has_repeated_run(&self, text: &str) -> bool {
        // The regex crate has no backreferences, so this is a manual scan.
        let mut previous = None;
        let mut run = 0;
        for c in text.chars() {
            if Some(c) == previous {
                run += 1;
            } else {
                previous = Some(c);
                run = 1;
            }
            if run >= self.limits.repeat_run {
                return true;
            }
        }
        false
    }
}

pub fn vowel_ratio(text: &str) -> f64 {
    let length = text.chars().count();
    if length == 0 {
        return 0.0;
    }
    let vowels = text
        .chars()
        .filter(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
        .count();
    vowels as f64 / length as f64
}

fn normalize_list(entries: &[String], what: &str) -> anyhow::Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.trim().to_lowercase();
        if entry.is_empty() {
            bail!("empty {what} entry in rule configuration");
        }
        if !normalized.contains(&entry) {
            normalized.push(entry);
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_table() -> RuleTable {
        RuleTable::from_config(&RulesConfig::default()).unwrap()
    }

    #[test]
    fn test_keywords_matched_in_table_order_once() {
        let table = default_table();
        let text = "urgent urgent: verify your bank password";

        let matched: Vec<&str> = table.matched_keywords(text).collect();
        assert_eq!(matched, vec!["verify", "urgent", "password", "bank"]);
    }

    #[test]
    fn test_tld_matching_is_substring() {
        let table = default_table();

        let matched: Vec<&str> = table.matched_tlds("http://bank.ru/login").collect();
        assert_eq!(matched, vec![".ru"]);

        assert_eq!(
            table.matched_tlds("http://site.rugby.com").collect::<Vec<_>>(),
            vec![".ru"]
        );
        assert_eq!(
            table.matched_tlds("https://www.tkmaxx.com/sale").collect::<Vec<_>>(),
            vec![".tk"]
        );
        assert_eq!(table.matched_tlds("https://www.example.org").count(), 0);
        assert_eq!(
            table.matched_tlds("promo.xyz and gift.top").collect::<Vec<_>>(),
            vec![".xyz", ".top"]
        );
    }

    #[test]
    fn test_ip_host_detection() {
        let table = default_table();

        assert!(table.has_ip_host("http://192.168.0.5/login"));
        assert!(table.has_ip_host("10.0.0.1"));
        assert!(!table.has_ip_host("version 1.2.3 released"));
    }

    #[test]
    fn test_repeated_run() {
        let table = default_table();

        assert!(table.has_repeated_run("heyyyy there"));
        assert!(table.has_repeated_run("!!!!"));
        assert!(!table.has_repeated_run("hello bookkeeper"));
    }

    #[test]
    fn test_vowel_ratio() {
        assert_eq!(vowel_ratio(""), 0.0);
        assert_eq!(vowel_ratio("bcdf"), 0.0);
        assert!((vowel_ratio("aeio") - 1.0).abs() < f64::EPSILON);
        assert!((vowel_ratio("abcd") - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_normalization() {
        let config = RulesConfig {
            keywords: vec!["  Verify ".to_string(), "verify".to_string()],
            suspicious_tlds: vec!["XYZ".to_string()],
            ..Default::default()
        };
        let table = RuleTable::from_config(&config).unwrap();

        assert_eq!(table.keywords(), ["verify".to_string()]);
        assert_eq!(table.suspicious_tlds(), [".xyz".to_string()]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let empty_keyword = RulesConfig {
            keywords: vec!["".to_string()],
            ..Default::default()
        };
        assert!(RuleTable::from_config(&empty_keyword).is_err());

        let bad_tld = RulesConfig {
            suspicious_tlds: vec![".".to_string()],
            ..Default::default()
        };
        assert!(RuleTable::from_config(&bad_tld).is_err());

        let mut bad_ratio = RulesConfig::default();
        bad_ratio.limits.max_vowel_ratio = 1.5;
        assert!(RuleTable::from_config(&bad_ratio).is_err());
    }
}
