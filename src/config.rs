//! YAML configuration (spec §6) plus CLI overlay (clap, see `src/bin/main.rs`).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::model::table::TableId;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub endpoint: String,
    pub network_passphrase: String,
    #[serde(default)]
    pub start_ledger: u32,
    /// 0 = unbounded/live.
    #[serde(default)]
    pub end_ledger: u32,
    /// Optional cold-tier endpoint; when absent, fallback is disabled.
    #[serde(default)]
    pub cold_endpoint: Option<String>,
    /// Whether the source manager (C9) is allowed to fall back to
    /// `cold_endpoint` on gap detection. Has no effect when
    /// `cold_endpoint` is absent.
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
}

fn default_fallback_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectStoreConfig {
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub url_style: Option<String>,
}

fn default_partition_width() -> u32 {
    100_000
}

fn default_commit_interval() -> u64 {
    5
}

fn default_batch_size() -> usize {
    1_000
}

fn default_param_limit() -> usize {
    65_535
}

fn default_flush_deadline_secs() -> u64 {
    900
}

fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// DuckDB/Ducklake-style catalog URI (local file or object-storage backed).
    pub catalog_uri: String,
    pub data_path: String,
    #[serde(default = "default_catalog_name")]
    pub catalog_name: String,
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub batch_size_overrides: HashMap<TableId, usize>,
    #[serde(default = "default_commit_interval")]
    pub commit_interval_seconds: u64,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_partition_width")]
    pub partition_width: u32,
    #[serde(default = "default_param_limit")]
    pub param_limit: usize,
    #[serde(default = "default_flush_deadline_secs")]
    pub flush_deadline_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Optional relational row-store DSN; when set, flushes also write there
    /// (spec §1: "... and/or a relational row-store").
    #[serde(default)]
    pub postgres_dsn: Option<String>,
}

fn default_catalog_name() -> String {
    "stellar".to_string()
}

fn default_schema_name() -> String {
    "public".to_string()
}

fn default_num_workers() -> usize {
    1
}

impl StorageConfig {
    pub fn batch_size_for(&self, table: TableId) -> usize {
        self.batch_size_overrides
            .get(&table)
            .copied()
            .unwrap_or(self.batch_size)
    }

    /// A catalog URI without an explicit server scheme (`postgres://`,
    /// `http(s)://`) is a single local file, which forces `num_workers = 1`
    /// (§9 "single-writer catalog constraint").
    pub fn is_single_writer_catalog(&self) -> bool {
        !(self.catalog_uri.starts_with("postgres://")
            || self.catalog_uri.starts_with("postgresql://")
            || self.catalog_uri.starts_with("http://")
            || self.catalog_uri.starts_with("https://"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct QualityConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_null_rate_threshold")]
    pub null_rate_threshold: f64,
}

fn default_null_rate_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckpointConfig {
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    pub checkpoint: CheckpointConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| IngestError::Config(format!("reading {:?}: {e}", path.as_ref())))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| IngestError::Config(format!("parsing YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.endpoint.is_empty() {
            return Err(IngestError::Config("source.endpoint is required".into()));
        }
        if self.storage.num_workers > 1 && self.storage.is_single_writer_catalog() {
            return Err(IngestError::Config(format!(
                "storage.num_workers={} requires a multi-writer (server-backed) catalog, but catalog_uri={:?} is a single-file catalog",
                self.storage.num_workers, self.storage.catalog_uri
            )));
        }
        if self.storage.partition_width == 0 {
            return Err(IngestError::Config(
                "storage.partition_width must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
