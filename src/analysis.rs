//! Request/response types shared by every classifier backend.
//!
//! `AnalysisResult` is always built through [`AnalysisResult::new`] or
//! [`AnalysisResult::error`] so the score clamp, the non-empty `details`
//! list and the score-to-verdict mapping hold no matter which backend
//! produced the findings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_RISK_SCORE: u32 = 100;

pub const CLEAN_SCAN_CODE: &str = "clean";
pub const CLEAN_SCAN_DETAIL: &str = "Standard heuristic scan passed: no risk indicators found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Url,
    Message,
    General,
}

impl FromStr for InputKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "url" => Ok(InputKind::Url),
            "message" => Ok(InputKind::Message),
            "general" | "" => Ok(InputKind::General),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown input type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputKind::Url => "url",
            InputKind::Message => "message",
            InputKind::General => "general",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub text: String,
    pub kind: Option<InputKind>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: InputKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Rejects missing or whitespace-only text.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.text.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "text to analyze must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One rule match. `weight` is zero for informational findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: String,
    pub weight: u32,
    pub description: String,
}

impl Finding {
    pub fn new(code: impl Into<String>, weight: u32, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            weight,
            description: description.into(),
        }
    }

    pub fn informational(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, 0, description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Suspicious,
    Malicious,
    Error,
}

impl Verdict {
    pub fn from_score(score: u32, thresholds: &Thresholds) -> Self {
        match score {
            s if s >= thresholds.malicious => Verdict::Malicious,
            s if s >= thresholds.suspicious => Verdict::Suspicious,
            _ => Verdict::Safe,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Verdict::Safe => "No significant risk indicators were detected.",
            Verdict::Suspicious => {
                "Some risk indicators were detected. Treat this input with caution."
            }
            Verdict::Malicious => {
                "Strong risk indicators were detected. This is likely a scam or phishing attempt."
            }
            Verdict::Error => "Analysis failed.",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Safe => "SAFE",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Malicious => "MALICIOUS",
            Verdict::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Score cut-offs: `score >= malicious` is MALICIOUS, `score >= suspicious`
/// is SUSPICIOUS, anything lower is SAFE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub suspicious: u32,
    pub malicious: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            suspicious: 30,
            malicious: 70,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.suspicious == 0
            || self.suspicious >= self.malicious
            || self.malicious > MAX_RISK_SCORE
        {
            anyhow::bail!(
                "invalid thresholds: need 0 < suspicious ({}) < malicious ({}) <= {}",
                self.suspicious,
                self.malicious,
                MAX_RISK_SCORE
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub verdict: Verdict,
    pub risk_score: u32,
    pub summary: String,
    pub details: Vec<String>,
    #[serde(skip)]
    pub findings: Vec<Finding>,
}

impl AnalysisResult {
    /// Builds a result from a raw (unclamped) score and the findings that
    /// produced it, in evaluation order.
    pub fn new(raw_score: i64, mut findings: Vec<Finding>, thresholds: &Thresholds) -> Self {
        let risk_score = raw_score.clamp(0, i64::from(MAX_RISK_SCORE)) as u32;

        if findings.is_empty() {
            findings.push(Finding::informational(CLEAN_SCAN_CODE, CLEAN_SCAN_DETAIL));
        }

        let verdict = Verdict::from_score(risk_score, thresholds);
        let details = findings.iter().map(|f| f.description.clone()).collect();

        Self {
            verdict,
            risk_score,
            summary: verdict.summary().to_string(),
            details,
            findings,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            verdict: Verdict::Error,
            risk_score: 0,
            summary: Verdict::Error.summary().to_string(),
            details: vec![message.clone()],
            findings: vec![Finding::informational("error", message)],
        }
    }

    pub fn has_finding(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("remote classifier failed: {0}")]
    Remote(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_thresholds() {
        let thresholds = Thresholds::default();

        assert_eq!(Verdict::from_score(0, &thresholds), Verdict::Safe);
        assert_eq!(Verdict::from_score(29, &thresholds), Verdict::Safe);
        assert_eq!(Verdict::from_score(30, &thresholds), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(69, &thresholds), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(70, &thresholds), Verdict::Malicious);
        assert_eq!(Verdict::from_score(100, &thresholds), Verdict::Malicious);
    }

    #[test]
    fn test_verdict_is_monotone() {
        let thresholds = Thresholds::default();
        let rank = |v: Verdict| match v {
            Verdict::Safe => 0,
            Verdict::Suspicious => 1,
            Verdict::Malicious => 2,
            Verdict::Error => unreachable!(),
        };

        let mut previous = 0;
        for score in 0..=MAX_RISK_SCORE {
            let current = rank(Verdict::from_score(score, &thresholds));
            assert!(current >= previous, "verdict dropped at score {score}");
            previous = current;
        }
    }

    #[test]
    fn test_result_clamps_and_never_has_empty_details() {
        let thresholds = Thresholds::default();

        let high = AnalysisResult::new(245, vec![Finding::new("x", 245, "x")], &thresholds);
        assert_eq!(high.risk_score, 100);
        assert_eq!(high.verdict, Verdict::Malicious);

        let negative = AnalysisResult::new(-20, Vec::new(), &thresholds);
        assert_eq!(negative.risk_score, 0);
        assert_eq!(negative.details, vec![CLEAN_SCAN_DETAIL.to_string()]);
        assert!(negative.has_finding(CLEAN_SCAN_CODE));
    }

    #[test]
    fn test_error_result_shape() {
        let result = AnalysisResult::error("upstream timed out");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["verdict"], "ERROR");
        assert_eq!(json["risk_score"], 0);
        assert_eq!(json["details"], serde_json::json!(["upstream timed out"]));
        assert!(json.get("findings").is_none());
    }

    #[test]
    fn test_request_validation() {
        assert!(AnalysisRequest::new("hello").validate().is_ok());
        assert!(AnalysisRequest::new("").validate().unwrap_err().is_client_error());
        assert!(AnalysisRequest::new("   \n").validate().is_err());
    }

    #[test]
    fn test_input_kind_parsing() {
        assert_eq!("url".parse::<InputKind>().unwrap(), InputKind::Url);
        assert_eq!("MESSAGE".parse::<InputKind>().unwrap(), InputKind::Message);
        assert_eq!("general".parse::<InputKind>().unwrap(), InputKind::General);
        assert!("carrier-pigeon".parse::<InputKind>().is_err());
    }

    #[test]
    fn test_input_kind_rejects_undocumented_names() {
        for name in ["link", "text", "sms", "email"] {
            assert!(name.parse::<InputKind>().is_err(), "accepted '{name}'");
        }
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Thresholds::default().validate().is_ok());
        assert!(Thresholds {
            suspicious: 70,
            malicious: 30
        }
        .validate()
        .is_err());
        assert!(Thresholds {
            suspicious: 0,
            malicious: 30
        }
        .validate()
        .is_err());
        assert!(Thresholds {
            suspicious: 30,
            malicious: 101
        }
        .validate()
        .is_err());
    }
}
