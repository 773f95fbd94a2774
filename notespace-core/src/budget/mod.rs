//! Per-session token accounting that tells an agent loop when to wrap up.

pub mod limits;
pub mod session;
pub mod stats;

pub use limits::ModelLimits;
pub use session::{AgentSession, BudgetState, TokenBudgetManager, TokenStatus, TokenUsage};
pub use stats::TokenStats;
