use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

use crate::core::fare::FareSchedule;
use crate::core::filters::EligibilityPolicy;
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub fare: FareSchedule,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub rides: String,
    pub profiles: String,
    pub vehicles: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// L1 only when unset or unreachable
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_max_distance_km")]
    pub default_max_distance_km: f64,
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    #[serde(default)]
    pub eligibility_policy: EligibilityPolicy,
}

impl MatchingSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_max_distance_km: default_max_distance_km(),
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            candidate_limit: default_candidate_limit(),
            eligibility_policy: EligibilityPolicy::default(),
        }
    }
}

fn default_max_distance_km() -> f64 { 10.0 }
fn default_top_n() -> usize { 10 }
fn default_max_top_n() -> usize { 50 }
fn default_lookup_timeout_ms() -> u64 { 3000 }
fn default_candidate_limit() -> usize { 100 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: ScoringWeights,
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
    /// 4. Environment variables (prefixed with CARPOOL__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., CARPOOL__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        apply_env_fallbacks(settings)?.try_deserialize()
    }

    /// Load configuration from TOML text, ignoring the environment
    pub fn load_from_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("CARPOOL")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Accept the conventional unprefixed variables when the prefixed ones are absent
fn apply_env_fallbacks(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    const FALLBACKS: [(&str, &str, &str); 5] = [
        ("appwrite.endpoint", "CARPOOL__APPWRITE__ENDPOINT", "APPWRITE_ENDPOINT"),
        ("appwrite.api_key", "CARPOOL__APPWRITE__API_KEY", "APPWRITE_API_KEY"),
        ("appwrite.project_id", "CARPOOL__APPWRITE__PROJECT_ID", "APPWRITE_PROJECT_ID"),
        ("appwrite.database_id", "CARPOOL__APPWRITE__DATABASE_ID", "APPWRITE_DATABASE_ID"),
        ("cache.redis_url", "CARPOOL__CACHE__REDIS_URL", "REDIS_URL"),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (key, prefixed, plain) in FALLBACKS {
        if env::var(prefixed).is_ok() {
            continue;
        }
        if let Ok(value) = env::var(plain) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
