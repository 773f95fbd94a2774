use std::path::Path;

use crate::config::schema::Config;
use crate::error::{Error, Result};

pub const DATABASE_URL_ENV: &str = "NOTESPACE_DATABASE_URL";
pub const LOG_LEVEL_ENV: &str = "NOTESPACE_LOG";

pub fn load_from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read config '{}': {err}", path.display()))
    })?;

    toml::from_str(&content).map_err(|err| {
        Error::Config(format!(
            "failed to parse config '{}': {err}",
            path.display()
        ))
    })
}

/// Loads `path` when given (a missing file falls back to defaults), then
/// applies environment overrides.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) if path.exists() => load_from_file(path)?,
        Some(path) => {
            tracing::debug!(path = %path.display(), "config file not found; using defaults");
            Config::default()
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(DATABASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
        config.storage.connection_string = url;
    }
    if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|value| !value.trim().is_empty()) {
        config.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StorageBackendKind;
    use crate::storage::model::Language;

    #[test]
    fn parses_partial_toml_over_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            backend = "memory"

            [editor]
            primary_language = "EN"

            [[tokens.models]]
            model = "local-llm"
            max_tokens = 4096
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.storage.pool_size, 5);
        assert_eq!(config.editor.primary_language, Language::En);
        assert_eq!(config.editor.history_retention_days, 30);
        assert_eq!(config.tokens.models.len(), 1);
        assert_eq!(config.tokens.reserve_tokens, 500);
    }

    #[test]
    fn env_overrides_replace_connection_and_level() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            DATABASE_URL_ENV => Some("sqlite://other.db".to_owned()),
            LOG_LEVEL_ENV => Some("debug".to_owned()),
            _ => None,
        });

        assert_eq!(config.storage.connection_string, "sqlite://other.db");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |_| Some("  ".to_owned()));
        assert_eq!(config.logging.level, "info");
    }
}
