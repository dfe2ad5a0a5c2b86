//! Local heuristic risk scorer.
//!
//! Rule evaluation order is fixed: character anomalies (plain text only),
//! keywords, then either URL structure checks or message checks. Findings
//! keep that order in the result.

use crate::analysis::{
    AnalysisError, AnalysisRequest, AnalysisResult, Finding, InputKind, Thresholds,
};
use crate::rules::{vowel_ratio, RuleTable};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    rules: Arc<RuleTable>,
    thresholds: Thresholds,
}

impl HeuristicScorer {
    pub fn new(rules: Arc<RuleTable>, thresholds: Thresholds) -> Self {
        Self { rules, thresholds }
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        request.validate()?;

        let normalized = request.text.to_lowercase();
        let length = normalized.chars().count();
        let url_like = request.kind == Some(InputKind::Url) || is_url_like(&normalized);

        let mut findings = Vec::new();

        if !url_like && length > self.rules.limits().anomaly_min_length {
            self.check_anomalies(&normalized, &mut findings);
        }

        self.check_keywords(&normalized, &mut findings);

        if url_like {
            self.check_url_structure(&normalized, length, &mut findings);
        } else {
            self.check_message(&normalized, length, &mut findings);
        }

        let raw_score: i64 = findings.iter().map(|f| i64::from(f.weight)).sum();
        for finding in &findings {
            log::debug!("Rule fired: {} (+{})", finding.code, finding.weight);
        }

        let result = AnalysisResult::new(raw_score, findings, &self.thresholds);
        log::debug!(
            "Heuristic verdict {} (raw score {}, clamped {}, url_like {})",
            result.verdict,
            raw_score,
            result.risk_score,
            url_like
        );
        Ok(result)
    }

    fn check_anomalies(&self, text: &str, findings: &mut Vec<Finding>) {
        let weights = self.rules.weights();

        if vowel_ratio(text) < self.rules.limits().max_vowel_ratio {
            findings.push(Finding::new(
                "gibberish",
                weights.gibberish,
                "High consonant density: possible gibberish or random string.",
            ));
        }

        if self.rules.has_repeated_run(text) {
            findings.push(Finding::new(
                "repetition",
                weights.repetition,
                "Repetitive character pattern detected.",
            ));
        }
    }

    fn check_keywords(&self, text: &str, findings: &mut Vec<Finding>) {
        let weight = self.rules.weights().keyword;
        for keyword in self.rules.matched_keywords(text) {
            findings.push(Finding::new(
                format!("keyword:{keyword}"),
                weight,
                format!("Suspicious keyword detected: '{keyword}'."),
            ));
        }
    }

    fn check_url_structure(&self, text: &str, length: usize, findings: &mut Vec<Finding>) {
        let weights = self.rules.weights();

        if text.contains("http:") && !text.contains("https:") {
            findings.push(Finding::new(
                "insecure-protocol",
                weights.insecure_protocol,
                "Insecure protocol (plain HTTP) in use.",
            ));
        }

        if self.rules.has_ip_host(text) {
            findings.push(Finding::new(
                "ip-host",
                weights.ip_host,
                "Raw IP address used as host instead of a domain name.",
            ));
        }

        if text.contains('@') {
            findings.push(Finding::new(
                "at-symbol",
                weights.at_symbol,
                "Embedded '@' symbol: possible credential or obfuscation trick.",
            ));
        }

        for tld in self.rules.matched_tlds(text) {
            findings.push(Finding::new(
                format!("tld:{tld}"),
                weights.suspicious_tld,
                format!("Suspicious top-level domain: '{tld}'."),
            ));
        }

        if length > self.rules.limits().long_url_length {
            findings.push(Finding::new(
                "long-url",
                weights.long_url,
                "Excessive URL length.",
            ));
        }
    }

    fn check_message(&self, text: &str, length: usize, findings: &mut Vec<Finding>) {
        if length < self.rules.limits().short_message_length {
            findings.push(Finding::informational(
                "short-input",
                "Input too short for definitive analysis.",
            ));
        }

        if self.rules.has_asset_request(text) {
            findings.push(Finding::new(
                "asset-request",
                self.rules.weights().asset_request,
                "External-asset request detected (link or attachment).",
            ));
        }
    }
}

/// Cheap pre-filter, not a URL parser. Expects lowercased input.
pub fn is_url_like(text: &str) -> bool {
    text.contains("http")
        || text.contains("www.")
        || (text.contains('.') && !text.chars().any(char::is_whitespace))
}
