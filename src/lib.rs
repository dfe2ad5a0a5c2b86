pub mod analysis;
pub mod classifier;
pub mod config;
pub mod remote;
pub mod rules;
pub mod scorer;
pub mod server;

pub use analysis::{AnalysisError, AnalysisRequest, AnalysisResult, Finding, InputKind, Verdict};
pub use classifier::{build_classifier, RiskClassifier};
pub use config::Config;
pub use remote::RemoteClassifier;
pub use rules::RuleTable;
pub use scorer::HeuristicScorer;
