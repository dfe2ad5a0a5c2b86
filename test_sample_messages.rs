#![allow(clippy::uninlined_format_args)]

use scamcheck::analysis::{AnalysisRequest, InputKind};
use scamcheck::classifier::{build_classifier, RiskClassifier};
use scamcheck::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Running sample messages through the local rule engine...");

    // Stricter than the defaults so borderline samples show up as SUSPICIOUS
    let config_yaml = r#"
classifier: local
thresholds:
  suspicious: 25
  malicious: 70
rules:
  asset_request_phrases:
    - "click link"
    - "click the link"
    - "open attachment"
    - "open the attachment"
"#;

    let config: Config = serde_yaml::from_str(config_yaml)?;
    config.validate()?;
    let classifier = build_classifier(&config)?;

    let samples: Vec<(&str, Option<InputKind>)> = vec![
        (
            "Your account is suspended, verify immediately at http://192.168.0.5/login",
            None,
        ),
        ("lets meet at 5pm", None),
        ("asdkjhqwkjh", None),
        ("Congratulations WINNER! Claim your prize, click the link now", None),
        ("http://paypal.com.secure-login.xyz/@update?session=8f2e", None),
        ("https://www.rust-lang.org/learn", Some(InputKind::Url)),
        ("Please open the attachment for the overdue invoice", Some(InputKind::Message)),
    ];

    for (text, kind) in samples {
        let mut request = AnalysisRequest::new(text);
        if let Some(kind) = kind {
            request = request.with_kind(kind);
        }

        let result = classifier.classify(&request).await?;
        println!();
        println!("Input:   {}", text);
        println!("Verdict: {} (score {})", result.verdict, result.risk_score);
        for finding in &result.findings {
            println!("  - [{} +{}] {}", finding.code, finding.weight, finding.description);
        }
    }

    Ok(())
}
