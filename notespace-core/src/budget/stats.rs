use serde::Serialize;

use crate::budget::session::AgentSession;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub session_count: usize,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
    /// Rounded mean of each session's own last-iteration usage.
    pub average_usage_percent: u32,
}

impl TokenStats {
    pub fn aggregate(sessions: &[AgentSession]) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }

        let total_prompt_tokens = sessions
            .iter()
            .fold(0u64, |sum, s| sum.saturating_add(s.last_prompt_tokens));
        let total_completion_tokens = sessions
            .iter()
            .fold(0u64, |sum, s| sum.saturating_add(s.last_completion_tokens));

        let usage_sum: f64 = sessions
            .iter()
            .map(|s| {
                let used = s.last_prompt_tokens.saturating_add(s.last_completion_tokens) as f64;
                if s.max_tokens == 0 {
                    100.0
                } else {
                    used / s.max_tokens as f64 * 100.0
                }
            })
            .sum();

        Self {
            session_count: sessions.len(),
            total_prompt_tokens,
            total_completion_tokens,
            total_tokens: total_prompt_tokens.saturating_add(total_completion_tokens),
            average_usage_percent: (usage_sum / sessions.len() as f64).round() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::session::{TokenBudgetManager, TokenUsage};
    use crate::config::schema::TokenBudgetConfig;

    #[test]
    fn averages_each_sessions_own_percentage() {
        let manager = TokenBudgetManager::new(&TokenBudgetConfig::default());
        let mut small = manager.create_session("gpt-4");
        let mut large = manager.create_session("claude-3-opus");
        manager.update(&mut small, TokenUsage::new(4_096, 0));
        manager.update(&mut large, TokenUsage::new(20_000, 0));

        let stats = TokenStats::aggregate(&[small, large]);
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.total_prompt_tokens, 24_096);
        assert_eq!(stats.total_tokens, 24_096);
        // (50% + 10%) / 2
        assert_eq!(stats.average_usage_percent, 30);
    }

    #[test]
    fn extreme_usage_saturates_instead_of_overflowing() {
        let manager = TokenBudgetManager::new(&TokenBudgetConfig::default());
        let mut first = manager.create_session("gpt-4o");
        let mut second = manager.create_session("gpt-4o");
        manager.update(&mut first, TokenUsage::new(u64::MAX, u64::MAX));
        manager.update(&mut second, TokenUsage::new(u64::MAX, 1));

        let stats = TokenStats::aggregate(&[first, second]);
        assert_eq!(stats.total_prompt_tokens, u64::MAX);
        assert_eq!(stats.total_completion_tokens, u64::MAX);
        assert_eq!(stats.total_tokens, u64::MAX);
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(TokenStats::aggregate(&[]), TokenStats::default());
    }
}
