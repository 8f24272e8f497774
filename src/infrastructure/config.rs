use serde::Deserialize;

use crate::infrastructure::database::DatabaseConfig;

/// Config はアプリケーション全体の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub schema_engine: SchemaEngineConfig,
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// AppConfig はアプリケーション設定。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// LoggingConfig はログ出力形式の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// "json" または "text"。
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

/// SchemaEngineConfig はスキーマ進化エンジン固有の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEngineConfig {
    /// バッチ作成時に同時実行するテーブル数。
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// フィールド一括 upsert の1文あたりの行数。
    #[serde(default = "default_field_chunk_size")]
    pub field_chunk_size: usize,
    #[serde(default = "default_tx_max_retries")]
    pub tx_max_retries: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
}

fn default_batch_concurrency() -> usize {
    10
}

fn default_field_chunk_size() -> usize {
    50
}

fn default_tx_max_retries() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    100
}

impl Default for SchemaEngineConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: default_batch_concurrency(),
            field_chunk_size: default_field_chunk_size(),
            tx_max_retries: default_tx_max_retries(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
        }
    }
}
