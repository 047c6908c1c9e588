use nimbus_core::Region;
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::redis_repo::DEFAULT_SNAPSHOT_KEY;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory holding the snapshot file.
    #[serde(default = "default_storage_path")]
    pub path: String,
    pub redis_url: Option<String>,
    #[serde(default = "default_snapshot_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            redis_url: None,
            key: default_snapshot_key(),
        }
    }
}

fn default_storage_path() -> String {
    "data".into()
}

fn default_snapshot_key() -> String {
    DEFAULT_SNAPSHOT_KEY.into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_provisioning_delay")]
    pub provisioning_delay_ms: u64,
    #[serde(default = "default_activation_delay")]
    pub activation_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            provisioning_delay_ms: default_provisioning_delay(),
            activation_delay_ms: default_activation_delay(),
        }
    }
}

fn default_provisioning_delay() -> u64 { 1_500 }
fn default_activation_delay() -> u64 { 4_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            tax_rate: 0.0,
            default_currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    "USD".into()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// JSON array of raw pricing rows loaded at startup.
    pub pricing_feed_path: Option<String>,
    /// Display names for region keys.
    #[serde(default)]
    pub regions: Vec<Region>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Layers `default`, `$RUN_MODE` and `local` files from `dir`, then
    /// `NIMBUS__*` environment variables.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .add_source(config::File::with_name(&file("default")))
            .add_source(config::File::with_name(&file(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&file("local")).required(false))
            // Eg. `NIMBUS__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("NIMBUS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
