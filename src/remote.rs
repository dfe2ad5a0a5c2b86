//! Generative-language API adapter.
//!
//! Candidate endpoints are tried in order until one returns a usable
//! verdict. Transport errors, non-2xx statuses and replies that do not
//! contain a parseable verdict all move on to the next endpoint; if every
//! endpoint fails the last error is returned.

use crate::analysis::{
    AnalysisError, AnalysisRequest, AnalysisResult, Finding, InputKind, Thresholds,
};
use crate::classifier::RiskClassifier;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("scamcheck/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Tried in order; the first success wins.
    pub endpoints: Vec<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent".to_string(),
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent".to_string(),
                "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent".to_string(),
            ],
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl RemoteConfig {
    pub fn parse_endpoints(&self) -> anyhow::Result<Vec<Url>> {
        if self.endpoints.is_empty() {
            anyhow::bail!("remote classifier needs at least one endpoint");
        }
        self.endpoints
            .iter()
            .map(|e| Url::parse(e).with_context(|| format!("invalid remote endpoint '{e}'")))
            .collect()
    }
}

pub struct RemoteClassifier {
    client: Client,
    endpoints: Vec<Url>,
    api_key: String,
    thresholds: Thresholds,
}

impl RemoteClassifier {
    pub fn new(
        endpoints: Vec<Url>,
        api_key: String,
        timeout: Duration,
        thresholds: Thresholds,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoints,
            api_key,
            thresholds,
        })
    }

    pub fn from_config(config: &RemoteConfig, thresholds: Thresholds) -> anyhow::Result<Self> {
        let endpoints = config.parse_endpoints()?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| {
                format!(
                    "API key is missing: set the {} environment variable",
                    config.api_key_env
                )
            })?;

        let classifier = Self::new(
            endpoints,
            api_key,
            Duration::from_secs(config.timeout_seconds),
            thresholds,
        )?;
        Ok(classifier)
    }

    async fn try_endpoint(
        &self,
        endpoint: &Url,
        body: &Value,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AnalysisError::Remote(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Remote(format!(
                "HTTP {}: {}",
                status,
                truncate(&text, MAX_ERROR_BODY)
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            AnalysisError::Remote(format!("invalid JSON response: {}", e.without_url()))
        })?;

        parse_generation(&payload, &self.thresholds)
    }
}

#[async_trait]
impl RiskClassifier for RemoteClassifier {
    async fn classify(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        request.validate()?;

        let body = build_request_body(request);
        let mut last_error = None;

        for endpoint in &self.endpoints {
            match self.try_endpoint(endpoint, &body).await {
                Ok(result) => {
                    log::debug!("Remote verdict {} from {}", result.verdict, endpoint);
                    return Ok(result);
                }
                Err(e) => {
                    log::warn!("Remote endpoint {endpoint} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| AnalysisError::Remote("no remote endpoints configured".to_string()));
        log::error!("All {} remote endpoints failed", self.endpoints.len());
        Err(error)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

pub fn build_prompt(request: &AnalysisRequest) -> String {
    let kind = request.kind.unwrap_or(InputKind::General);
    format!(
        "You are a fraud and phishing analyst. Assess whether the following {kind} input is a \
         scam, phishing attempt or otherwise malicious.\n\
         Reply with only a JSON object of the form \
         {{\"risk_score\": <integer 0-100>, \"summary\": \"<one sentence>\", \
         \"details\": [\"<finding>\", ...]}}.\n\n\
         Input:\n{}",
        request.text
    )
}

pub fn build_request_body(request: &AnalysisRequest) -> Value {
    json!({
        "contents": [
            { "parts": [ { "text": build_prompt(request) } ] }
        ]
    })
}

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    risk_score: f64,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Vec<String>,
}

/// Extracts the verdict from a `generateContent` response body.
pub fn parse_generation(
    payload: &Value,
    thresholds: &Thresholds,
) -> Result<AnalysisResult, AnalysisError> {
    let text = payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::Remote("response contains no candidate text".to_string()))?;

    parse_verdict_text(text, thresholds)
}

fn parse_verdict_text(text: &str, thresholds: &Thresholds) -> Result<AnalysisResult, AnalysisError> {
    // Models like to wrap JSON in markdown fences; take the outermost object.
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(AnalysisError::Remote(format!(
                "model reply has no JSON object: {}",
                truncate(text, MAX_ERROR_BODY)
            )))
        }
    };

    let verdict: ModelVerdict = serde_json::from_str(object)
        .map_err(|e| AnalysisError::Remote(format!("model reply is not a verdict: {e}")))?;

    if !verdict.risk_score.is_finite() {
        return Err(AnalysisError::Remote(
            "model returned a non-numeric risk score".to_string(),
        ));
    }

    let findings = verdict
        .details
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .map(|d| Finding::informational("remote", d))
        .collect();

    let mut result = AnalysisResult::new(verdict.risk_score.round() as i64, findings, thresholds);
    if let Some(summary) = verdict.summary.filter(|s| !s.trim().is_empty()) {
        result.summary = summary;
    }
    Ok(result)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len).collect();
        format!("{cut}...")
    }
}
