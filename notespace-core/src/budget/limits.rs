use crate::config::schema::{ModelLimitConfig, TokenBudgetConfig};

/// Context-window ceilings per model name.
#[derive(Debug, Clone)]
pub struct ModelLimits {
    entries: Vec<ModelLimitConfig>,
    default_max_tokens: u64,
}

impl ModelLimits {
    pub fn from_config(config: &TokenBudgetConfig) -> Self {
        Self {
            entries: config.models.clone(),
            default_max_tokens: config.default_max_tokens,
        }
    }

    /// Exact name first, then the first entry (in table order) whose name is
    /// contained in `model` ignoring case, then the default ceiling.
    pub fn resolve(&self, model: &str) -> u64 {
        if let Some(entry) = self.entries.iter().find(|entry| entry.model == model) {
            return entry.max_tokens;
        }

        let lowered = model.to_lowercase();
        self.entries
            .iter()
            .find(|entry| lowered.contains(&entry.model.to_lowercase()))
            .map_or(self.default_max_tokens, |entry| entry.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ModelLimits {
        ModelLimits::from_config(&TokenBudgetConfig::default())
    }

    #[test]
    fn exact_match_wins() {
        assert_eq!(limits().resolve("gpt-4"), 8_192);
        assert_eq!(limits().resolve("gpt-3.5-turbo-16k"), 16_385);
    }

    #[test]
    fn substring_match_follows_table_order() {
        // "gpt-4o" precedes "gpt-4" in the table.
        assert_eq!(limits().resolve("GPT-4o-2024-08-06"), 128_000);
        assert_eq!(limits().resolve("gpt-4-0613"), 8_192);
        assert_eq!(limits().resolve("anthropic/Claude-3-5-Sonnet-latest"), 200_000);
    }

    #[test]
    fn unknown_models_use_default() {
        assert_eq!(limits().resolve("llama-3-70b"), 32_000);
    }

    #[test]
    fn injected_table_replaces_defaults() {
        let config = TokenBudgetConfig {
            default_max_tokens: 1_000,
            models: vec![ModelLimitConfig {
                model: "local".to_owned(),
                max_tokens: 4_096,
            }],
            ..TokenBudgetConfig::default()
        };
        let limits = ModelLimits::from_config(&config);
        assert_eq!(limits.resolve("my-local-model"), 4_096);
        assert_eq!(limits.resolve("gpt-4o"), 1_000);
    }
}
