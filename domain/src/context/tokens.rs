//! Token accounting.
//!
//! Estimates are a coarse `ceil(chars / 4)` heuristic. They only need to be
//! deterministic and monotonic; exact provider counts come back in each
//! [`UsageRecord`] and are accumulated in [`TokenUsage`].

use crate::agent::state::AgentState;
use crate::context::assembler::render_entry;
use crate::core::model::ModelId;
use crate::history::HistoryEntry;
use crate::session::response::{ModelResponse, UsageRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Usage percentage at which an agent reports its context as nearly full.
pub const CONTEXT_WARNING_THRESHOLD_PCT: f64 = 80.0;

/// Running usage counters for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Sum of `total_tokens` over every response
    pub total: u64,
    /// Per-model sum of `total_tokens`
    pub by_model: BTreeMap<ModelId, u64>,
    /// Prompt tokens of the most recent response
    pub last_request: u64,
    /// Completion tokens of the most recent response
    pub last_response: u64,
}

impl TokenUsage {
    /// Add one response's usage. Unknown models start at zero.
    pub fn record(&mut self, model: &ModelId, usage: &UsageRecord) {
        self.total = self.total.saturating_add(usage.total_tokens);
        let entry = self.by_model.entry(model.clone()).or_insert(0);
        *entry = entry.saturating_add(usage.total_tokens);
        self.last_request = usage.prompt_tokens;
        self.last_response = usage.completion_tokens;
    }

    pub fn for_model(&self, model: &ModelId) -> u64 {
        self.by_model.get(model).copied().unwrap_or(0)
    }
}

/// Estimate the token cost of `text`. `None` and `""` cost nothing.
pub fn estimate_tokens(text: Option<&str>) -> usize {
    match text {
        Some(t) => t.chars().count().div_ceil(CHARS_PER_TOKEN),
        None => 0,
    }
}

/// Sum of the estimated cost of each entry's rendered content.
pub fn estimate_history_tokens(entries: &[HistoryEntry]) -> usize {
    entries
        .iter()
        .map(|e| estimate_tokens(Some(&render_entry(e).content)))
        .sum()
}

/// Estimated history cost for `model`, or the largest per-model history when
/// no model is given, plus the system prompt when `include_system` is set.
pub fn estimate_total_context_tokens(
    state: &AgentState,
    model: Option<&ModelId>,
    include_system: bool,
) -> usize {
    let history = match model {
        Some(m) => state
            .history(m)
            .map(estimate_history_tokens)
            .unwrap_or(0),
        None => largest_history_tokens(state),
    };
    let system = if include_system {
        estimate_tokens(state.system_prompt.as_deref())
    } else {
        0
    };
    history + system
}

/// History tokens as a percentage of the agent's context limit.
pub fn context_usage_percentage(state: &AgentState) -> f64 {
    if state.context_limit == 0 {
        return 0.0;
    }
    largest_history_tokens(state) as f64 / state.context_limit as f64 * 100.0
}

/// Whether the fullest model history has crossed `threshold_pct` of the limit.
pub fn is_near_context_limit(state: &AgentState, threshold_pct: f64) -> bool {
    context_usage_percentage(state) >= threshold_pct
}

/// Accumulate a response's usage into the agent's counters.
pub fn update_token_usage(state: &mut AgentState, response: &ModelResponse) {
    if let Some(usage) = &response.usage {
        state.token_usage.record(&response.model, usage);
    }
}

fn largest_history_tokens(state: &AgentState) -> usize {
    state
        .model_histories
        .values()
        .map(|h| estimate_history_tokens(h))
        .max()
        .unwrap_or(0)
}
