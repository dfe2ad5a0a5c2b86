use crate::analysis::Thresholds;
use crate::remote::RemoteConfig;
use crate::rules::{RuleTable, RulesConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub classifier: ClassifierKind,
    pub thresholds: Thresholds,
    pub rules: RulesConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Local,
    Remote,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            classifier: ClassifierKind::Local,
            thresholds: Thresholds::default(),
            rules: RulesConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks everything that can be checked without network access or
    /// secrets. The remote API key is only resolved when the classifier is
    /// built.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.thresholds.validate()?;
        RuleTable::from_config(&self.rules)?;
        if self.classifier == ClassifierKind::Remote {
            self.remote.parse_endpoints()?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
