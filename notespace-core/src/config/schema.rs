use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::model::Language;

/// Upper bound accepted for `editor.history_retention_days`.
pub const MAX_HISTORY_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub editor: EditorConfig,
    pub tokens: TokenBudgetConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub connection_string: String,
    pub pool_size: usize,
    pub sqlite: SqliteStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Sqlite,
            connection_string: "sqlite://notespace.db".to_owned(),
            pool_size: 5,
            sqlite: SqliteStorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteStorageConfig {
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
    pub foreign_keys: bool,
    pub create_if_missing: bool,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            journal_mode: "WAL".to_owned(),
            synchronous: "NORMAL".to_owned(),
            foreign_keys: true,
            create_if_missing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Language variant created by `add_file` and mutated by `edit_file`.
    pub primary_language: Language,
    /// Days a history snapshot (and a trashed file) is retained.
    pub history_retention_days: i64,
    pub history_limit: usize,
}

impl EditorConfig {
    /// `from + history_retention_days`, or a config error when the sum leaves
    /// the representable date range.
    pub fn retention_expiry(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
        Duration::try_days(self.history_retention_days)
            .and_then(|retention| from.checked_add_signed(retention))
            .ok_or_else(|| {
                Error::Config(format!(
                    "editor.history_retention_days ({}) overflows the date range",
                    self.history_retention_days
                ))
            })
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            primary_language: Language::Ko,
            history_retention_days: 30,
            history_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBudgetConfig {
    pub default_max_tokens: u64,
    pub reserve_tokens: u64,
    pub finish_threshold_percent: u32,
    pub exceeded_threshold_percent: u32,
    /// Ordered: substring matching walks this list front to back.
    pub models: Vec<ModelLimitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelLimitConfig {
    pub model: String,
    pub max_tokens: u64,
}

impl ModelLimitConfig {
    fn new(model: &str, max_tokens: u64) -> Self {
        Self {
            model: model.to_owned(),
            max_tokens,
        }
    }
}

impl Default for TokenBudgetConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: 32_000,
            reserve_tokens: 500,
            finish_threshold_percent: 80,
            exceeded_threshold_percent: 100,
            models: vec![
                ModelLimitConfig::new("gpt-4o", 128_000),
                ModelLimitConfig::new("gpt-4o-mini", 128_000),
                ModelLimitConfig::new("gpt-4-turbo", 128_000),
                ModelLimitConfig::new("gpt-4-turbo-preview", 128_000),
                ModelLimitConfig::new("gpt-4", 8_192),
                ModelLimitConfig::new("gpt-3.5-turbo", 16_385),
                ModelLimitConfig::new("gpt-3.5-turbo-16k", 16_385),
                ModelLimitConfig::new("claude-3-opus", 200_000),
                ModelLimitConfig::new("claude-3-sonnet", 200_000),
                ModelLimitConfig::new("claude-3-haiku", 200_000),
                ModelLimitConfig::new("claude-3-5-sonnet", 200_000),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}
