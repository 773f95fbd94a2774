use std::collections::HashSet;

use crate::config::schema::{Config, StorageBackendKind, MAX_HISTORY_RETENTION_DAYS};
use crate::error::{Error, Result};

pub fn validate_config(config: &Config) -> Result<()> {
    if config.storage.pool_size == 0 {
        return Err(Error::Validation(
            "storage.pool_size must be at least 1".to_owned(),
        ));
    }

    if matches!(config.storage.backend, StorageBackendKind::Sqlite)
        && config.storage.connection_string.trim().is_empty()
    {
        return Err(Error::Validation(
            "storage.connection_string is required for the sqlite backend".to_owned(),
        ));
    }

    if config.editor.history_retention_days <= 0 {
        return Err(Error::Validation(
            "editor.history_retention_days must be positive".to_owned(),
        ));
    }

    if config.editor.history_retention_days > MAX_HISTORY_RETENTION_DAYS {
        return Err(Error::Validation(format!(
            "editor.history_retention_days cannot exceed {MAX_HISTORY_RETENTION_DAYS}"
        )));
    }

    if config.editor.history_limit == 0 {
        return Err(Error::Validation(
            "editor.history_limit must be at least 1".to_owned(),
        ));
    }

    let tokens = &config.tokens;
    if tokens.default_max_tokens == 0 {
        return Err(Error::Validation(
            "tokens.default_max_tokens must be positive".to_owned(),
        ));
    }

    if tokens.finish_threshold_percent > tokens.exceeded_threshold_percent {
        return Err(Error::Validation(format!(
            "tokens.finish_threshold_percent ({}) cannot exceed tokens.exceeded_threshold_percent ({})",
            tokens.finish_threshold_percent, tokens.exceeded_threshold_percent
        )));
    }

    let mut model_names = HashSet::new();
    for entry in &tokens.models {
        let name = entry.model.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "token model name cannot be empty".to_owned(),
            ));
        }

        if entry.max_tokens == 0 {
            return Err(Error::Validation(format!(
                "token model '{name}' must have a positive max_tokens"
            )));
        }

        if !model_names.insert(name.to_owned()) {
            return Err(Error::Validation(format!(
                "duplicate token model '{name}'"
            )));
        }
    }

    Ok(())
}
