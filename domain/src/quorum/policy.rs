//! Quorum policy: the rule plus how ties are broken.

use super::rule::QuorumRule;
use serde::{Deserialize, Serialize};

/// How to choose between equally large groups of agreeing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The group whose first decision arrived earliest wins
    #[default]
    FirstResponder,
    /// The group containing the model listed first in the agent's model list wins
    ModelOrder,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::FirstResponder => "first_responder",
            TieBreak::ModelOrder => "model_order",
        }
    }
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_responder" | "first" => Ok(TieBreak::FirstResponder),
            "model_order" | "order" => Ok(TieBreak::ModelOrder),
            _ => Err(format!(
                "Unknown tie-break: {}. Valid: first_responder, model_order",
                s
            )),
        }
    }
}

/// Quorum policy used by the consensus engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuorumPolicy {
    #[serde(default)]
    pub rule: QuorumRule,
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl QuorumPolicy {
    pub fn new(rule: QuorumRule, tie_break: TieBreak) -> Self {
        Self { rule, tie_break }
    }

    pub fn with_rule(mut self, rule: QuorumRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}
