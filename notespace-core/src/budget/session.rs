use serde::{Deserialize, Serialize};

use crate::budget::limits::ModelLimits;
use crate::config::schema::TokenBudgetConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetState {
    Fresh,
    Active,
    NeedsFinish,
    Exceeded,
}

/// Token bookkeeping for one agent run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub model_name: String,
    pub max_tokens: u64,
    pub last_prompt_tokens: u64,
    pub last_completion_tokens: u64,
    pub iteration_count: u32,
    pub state: BudgetState,
}

/// Provider-reported usage of one model response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub current_prompt_tokens: u64,
    pub completion_tokens: u64,
    pub estimated_next_prompt: u64,
    /// Negative once the estimate overshoots the ceiling.
    pub remaining_tokens: i64,
    pub usage_percent: u32,
    pub needs_finish: bool,
    pub is_exceeded: bool,
    pub iteration: u32,
    pub state: BudgetState,
}

#[derive(Debug, Clone)]
pub struct TokenBudgetManager {
    limits: ModelLimits,
    reserve_tokens: u64,
    finish_threshold_percent: u32,
    exceeded_threshold_percent: u32,
}

impl TokenBudgetManager {
    pub fn new(config: &TokenBudgetConfig) -> Self {
        Self {
            limits: ModelLimits::from_config(config),
            reserve_tokens: config.reserve_tokens,
            finish_threshold_percent: config.finish_threshold_percent,
            exceeded_threshold_percent: config.exceeded_threshold_percent,
        }
    }

    pub fn create_session(&self, model_name: &str) -> AgentSession {
        let max_tokens = self.limits.resolve(model_name);
        tracing::debug!(model = model_name, max_tokens, "token budget session created");
        AgentSession {
            model_name: model_name.to_owned(),
            max_tokens,
            last_prompt_tokens: 0,
            last_completion_tokens: 0,
            iteration_count: 0,
            state: BudgetState::Fresh,
        }
    }

    /// Records the latest response usage and forecasts the next prompt.
    pub fn update(&self, session: &mut AgentSession, usage: TokenUsage) -> TokenStatus {
        session.last_prompt_tokens = usage.prompt_tokens;
        session.last_completion_tokens = usage.completion_tokens;
        session.iteration_count = session.iteration_count.saturating_add(1);

        let estimated_next_prompt = usage
            .prompt_tokens
            .saturating_add(usage.completion_tokens)
            .saturating_add(self.reserve_tokens);
        let usage_percent = percent_of(estimated_next_prompt, session.max_tokens);
        let remaining_tokens = i64::try_from(session.max_tokens)
            .unwrap_or(i64::MAX)
            .saturating_sub(i64::try_from(estimated_next_prompt).unwrap_or(i64::MAX));
        let needs_finish = usage_percent >= self.finish_threshold_percent;
        let is_exceeded = usage_percent >= self.exceeded_threshold_percent;

        session.state = if is_exceeded {
            BudgetState::Exceeded
        } else if needs_finish {
            BudgetState::NeedsFinish
        } else {
            BudgetState::Active
        };

        if needs_finish {
            tracing::warn!(
                model = %session.model_name,
                iteration = session.iteration_count,
                usage_percent,
                remaining_tokens,
                "token budget nearly exhausted"
            );
        } else {
            tracing::debug!(
                model = %session.model_name,
                iteration = session.iteration_count,
                usage_percent,
                "token usage updated"
            );
        }

        TokenStatus {
            current_prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            estimated_next_prompt,
            remaining_tokens,
            usage_percent,
            needs_finish,
            is_exceeded,
            iteration: session.iteration_count,
            state: session.state,
        }
    }

    /// Wrap-up instructions to append to the agent's system prompt.
    pub fn warning_text(&self, status: &TokenStatus) -> String {
        let estimated_sentences = (status.remaining_tokens / 100).max(0);
        format!(
            "TOKEN LIMIT WARNING\n\
             - Current token usage: {}%\n\
             - Remaining tokens: {} (about {} sentences)\n\
             - Status: wrap up now\n\
             \n\
             Instructions:\n\
             1. Finish the task in progress immediately.\n\
             2. Avoid further file reads and complex edits.\n\
             3. Call complete() within the next 1-2 iterations.\n\
             4. If work remains unfinished, say so in the summary as \"Further work needed: ...\".\n",
            status.usage_percent, status.remaining_tokens, estimated_sentences
        )
    }
}

/// `round(100 * part / whole)`; a zero ceiling counts as fully used.
fn percent_of(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 100;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}
