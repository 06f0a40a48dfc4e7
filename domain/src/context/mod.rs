//! Context management for model queries.
//!
//! - [`assembler`] — per-model history → ordered role-tagged messages
//! - [`tokens`] — token estimates, context usage and usage accounting
//! - [`profile`] — operating profile section of the system prompt
//! - [`prompt`] — default decision-format system prompt

pub mod assembler;
pub mod profile;
pub mod prompt;
pub mod tokens;

pub use assembler::{FieldPrompts, build_conversation_messages, inject_field_prompts, render_entry};
pub use profile::{AgentProfile, inject_operating_profile};
pub use tokens::{
    CONTEXT_WARNING_THRESHOLD_PCT, TokenUsage, context_usage_percentage, estimate_history_tokens, estimate_tokens,
    estimate_total_context_tokens, is_near_context_limit, update_token_usage,
};
