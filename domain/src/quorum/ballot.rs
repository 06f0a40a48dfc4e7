//! A single model's decision within a consensus round.

use crate::agent::action::Decision;
use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};

/// Decision returned by one model, with its arrival order in the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDecision {
    pub model: ModelId,
    pub decision: Decision,
    /// 0-based position in which this reply arrived
    pub arrival: usize,
}

impl ModelDecision {
    pub fn new(model: impl Into<ModelId>, decision: Decision, arrival: usize) -> Self {
        Self {
            model: model.into(),
            decision,
            arrival,
        }
    }
}
