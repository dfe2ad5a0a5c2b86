use crate::analysis::{AnalysisError, AnalysisRequest, AnalysisResult};
use crate::config::{ClassifierKind, Config};
use crate::remote::RemoteClassifier;
use crate::rules::RuleTable;
use crate::scorer::HeuristicScorer;
use async_trait::async_trait;
use std::sync::Arc;

/// Anything that can turn an input into a verdict. The HTTP layer and the
/// CLI only ever see this trait.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn classify(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
    fn name(&self) -> &str;
}

#[async_trait]
impl RiskClassifier for HeuristicScorer {
    async fn classify(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.analyze(request)
    }

    fn name(&self) -> &str {
        "local"
    }
}

pub fn build_classifier(config: &Config) -> anyhow::Result<Arc<dyn RiskClassifier>> {
    config.thresholds.validate()?;

    let classifier: Arc<dyn RiskClassifier> = match config.classifier {
        ClassifierKind::Local => {
            let rules = RuleTable::from_config(&config.rules)?;
            Arc::new(HeuristicScorer::new(Arc::new(rules), config.thresholds))
        }
        ClassifierKind::Remote => {
            Arc::new(RemoteClassifier::from_config(&config.remote, config.thresholds)?)
        }
    };

    log::info!("Using {} classifier", classifier.name());
    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Verdict;
    use crate::remote::RemoteConfig;

    #[tokio::test]
    async fn test_local_classifier_from_default_config() {
        let classifier = build_classifier(&Config::default()).unwrap();
        assert_eq!(classifier.name(), "local");

        let result = classifier
            .classify(&AnalysisRequest::new("http://203.0.113.9/verify"))
            .await
            .unwrap();
        assert_eq!(result.verdict, Verdict::Malicious);
    }

    #[tokio::test]
    async fn test_custom_rules_flow_through() {
        let mut config = Config::default();
        config.rules.keywords = vec!["parcel".to_string()];
        config.rules.weights.keyword = 50;

        let classifier = build_classifier(&config).unwrap();
        let result = classifier
            .classify(&AnalysisRequest::new("your parcel could not be delivered"))
            .await
            .unwrap();

        assert_eq!(result.risk_score, 50);
        assert_eq!(result.verdict, Verdict::Suspicious);
    }

    #[test]
    fn test_remote_classifier_requires_key() {
        let config = Config {
            classifier: ClassifierKind::Remote,
            remote: RemoteConfig {
                api_key_env: "SCAMCHECK_TEST_UNSET_REMOTE_KEY".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(build_classifier(&config).is_err());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = Config::default();
        config.thresholds.suspicious = 90;

        assert!(build_classifier(&config).is_err());
    }
}
