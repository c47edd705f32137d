use crate::core::{ScoringPolicy, SpecialtyTaxonomy, DEFAULT_LIMIT};
use crate::models::ScoringWeights;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub directory: DirectorySettings,
    pub database: DatabaseSettings,
    pub matching: MatchingSettings,
    pub scoring: ScoringSettings,
    pub reranker: RerankerSettings,
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    Airtable,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub backend: DirectoryBackend,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub base_id: Option<String>,
    pub table: String,
    /// JSON array of surgeon records, for the `file` backend
    pub file_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_capacity: Option<u64>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Airtable,
            endpoint: "https://api.airtable.com/v0".to_string(),
            api_key: None,
            base_id: None,
            table: "Surgeons".to_string(),
            file_path: None,
            timeout_secs: None,
            cache_ttl_secs: None,
            cache_capacity: None,
        }
    }
}

/// Ledger database; without a URL the ledger is kept in memory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
}

impl MatchingSettings {
    pub fn default_limit(&self) -> usize {
        self.default_limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn max_limit(&self) -> usize {
        self.max_limit.unwrap_or(10)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub weights: WeightsConfig,
    pub prior_rating: f64,
    pub prior_weight: f64,
    pub category_confidence: f64,
    pub budget_floor: f64,
    /// category -> procedures it covers
    pub taxonomy: HashMap<String, Vec<String>>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        let policy = ScoringPolicy::default();
        Self {
            weights: WeightsConfig::default(),
            prior_rating: policy.prior_rating,
            prior_weight: policy.prior_weight,
            category_confidence: policy.category_confidence,
            budget_floor: policy.budget_floor,
            taxonomy: HashMap::new(),
        }
    }
}

impl ScoringSettings {
    pub fn to_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            weights: ScoringWeights {
                specialty: self.weights.specialty,
                location: self.weights.location,
                quality: self.weights.quality,
                budget: self.weights.budget,
            },
            prior_rating: self.prior_rating,
            prior_weight: self.prior_weight,
            category_confidence: self.category_confidence,
            budget_floor: self.budget_floor,
            taxonomy: SpecialtyTaxonomy::from_map(&self.taxonomy),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_specialty_weight")]
    pub specialty: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_quality_weight")]
    pub quality: f64,
    #[serde(default = "default_budget_weight")]
    pub budget: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            specialty: default_specialty_weight(),
            location: default_location_weight(),
            quality: default_quality_weight(),
            budget: default_budget_weight(),
        }
    }
}

fn default_specialty_weight() -> f64 { 0.35 }
fn default_location_weight() -> f64 { 0.25 }
fn default_quality_weight() -> f64 { 0.30 }
fn default_budget_weight() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: Option<u64>,
    /// How many of the engine's best candidates the re-ranker gets to see
    pub pool_size: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4".to_string(),
            timeout_secs: None,
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub webhook_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SURGEON_MATCH__)
    /// 5. Conventional deployment variables (DATABASE_URL, AIRTABLE_API_KEY, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        Self::from_layers(builder)
    }

    /// Load configuration from a custom path, with the same environment
    /// layering as [`Settings::load`]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_layers(Config::builder().add_source(File::from(path.as_ref())))
    }

    fn from_layers(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings = builder
            // e.g., SURGEON_MATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SURGEON_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = substitute_env_vars(settings)?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring
            .to_policy()
            .validate()
            .map_err(|e| ConfigError::Message(format!("scoring: {}", e)))?;

        if self.matching.default_limit() == 0 || self.matching.max_limit() == 0 {
            return Err(ConfigError::Message("matching limits must be at least 1".to_string()));
        }
        if self.matching.default_limit() > self.matching.max_limit() {
            return Err(ConfigError::Message(
                "matching.default_limit must not exceed matching.max_limit".to_string(),
            ));
        }

        match self.directory.backend {
            DirectoryBackend::Airtable => {
                if self.directory.api_key.is_none() || self.directory.base_id.is_none() {
                    return Err(ConfigError::Message(
                        "directory: airtable backend needs api_key and base_id".to_string(),
                    ));
                }
            }
            DirectoryBackend::File => {
                if self.directory.file_path.is_none() {
                    return Err(ConfigError::Message(
                        "directory: file backend needs file_path".to_string(),
                    ));
                }
            }
        }

        if self.reranker.enabled && self.reranker.api_key.is_none() {
            return Err(ConfigError::Message("reranker: enabled without api_key".to_string()));
        }

        Ok(())
    }
}

/// Apply the conventional, unprefixed deployment variables on top of the
/// layered configuration
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("AIRTABLE_API_KEY", "directory.api_key"),
        ("AIRTABLE_BASE_ID", "directory.base_id"),
        ("OPENAI_API_KEY", "reranker.api_key"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            if !value.trim().is_empty() {
                builder = builder.set_override(key, value)?;
            }
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_settings() -> Settings {
        let mut settings = Settings::default();
        settings.directory.backend = DirectoryBackend::File;
        settings.directory.file_path = Some("data/surgeons.json".to_string());
        settings
    }

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.specialty, 0.35);
        assert_eq!(weights.location, 0.25);
        assert_eq!(weights.quality, 0.30);
        assert_eq!(weights.budget, 0.10);
    }

    #[test]
    fn test_default_policy_matches_engine_default() {
        assert_eq!(ScoringSettings::default().to_policy(), ScoringPolicy::default());
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut settings = file_settings();
        assert!(settings.validate().is_ok());

        settings.scoring.weights.location = 0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_requires_airtable_credentials() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_err());

        settings.directory.api_key = Some("key".to_string());
        settings.directory.base_id = Some("appBase".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_limits() {
        let mut settings = file_settings();
        settings.matching.default_limit = Some(20);
        assert!(settings.validate().is_err());

        settings.matching.max_limit = Some(25);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_taxonomy_from_settings() {
        let mut settings = ScoringSettings::default();
        settings
            .taxonomy
            .insert("Facial Surgery".to_string(), vec!["Rhinoplasty".to_string()]);

        let policy = settings.to_policy();
        let categories: Vec<&str> = policy.taxonomy.categories_for("rhinoplasty").collect();
        assert_eq!(categories, vec!["facial surgery"]);
    }

    #[test]
    fn test_load_from_applies_deployment_variables() {
        let path = std::env::temp_dir().join(format!("surgeon-match-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[directory]\nbackend = \"airtable\"\napi_key = \"keyFromFile\"\ntable = \"Surgeons\"\n",
        )
        .unwrap();

        std::env::set_var("AIRTABLE_BASE_ID", "appFromEnv");
        let result = Settings::load_from(&path);
        std::env::remove_var("AIRTABLE_BASE_ID");
        std::fs::remove_file(&path).unwrap();

        let settings = result.unwrap();
        assert_eq!(settings.directory.backend, DirectoryBackend::Airtable);
        assert_eq!(settings.directory.api_key.as_deref(), Some("keyFromFile"));
        assert_eq!(settings.directory.base_id.as_deref(), Some("appFromEnv"));
    }
}
