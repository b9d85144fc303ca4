use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::naics::SectorGroups;

pub const CONFIG_FILE: &str = "naics_tam.toml";
pub const ENV_PREFIX: &str = "NAICS_TAM_";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Ask the configured LLM from this process.
    Direct,
    /// POST to a remote `relevant-naics` endpoint.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClassifierConfig {
    pub mode: ClassifierMode,
    #[validate(custom(function = "validate_url"))]
    pub endpoint: String,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::Direct,
            endpoint: "http://127.0.0.1:3001/api/relevant-naics".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn validate_url(value: &str) -> std::result::Result<(), ValidationError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_url"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(length(min = 1))]
    pub dataset_path: String,
    #[validate(nested)]
    pub classifier: ClassifierConfig,
    pub llm: LLMConfig,
    /// Hyphenated combined-sector keys, e.g. `"31-33"`.
    pub sector_groups: Vec<String>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dataset_path: "naics_data.csv".to_string(),
            classifier: ClassifierConfig::default(),
            llm: LLMConfig::default(),
            sector_groups: vec![
                "31-33".to_string(),
                "44-45".to_string(),
                "48-49".to_string(),
            ],
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `naics_tam.toml`, then `NAICS_TAM_*` variables.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn sector_groups(&self) -> Result<SectorGroups> {
        SectorGroups::from_group_keys(&self.sector_groups)
    }
}
