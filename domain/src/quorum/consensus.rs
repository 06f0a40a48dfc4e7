//! Consensus round record
//!
//! A [`ConsensusRound`] captures one round of parallel model queries. It is
//! ephemeral: logged through the conversation logger, never stored in agent
//! state.

use super::aggregate::{Agreement, aggregate};
use super::ballot::ModelDecision;
use super::policy::QuorumPolicy;
use crate::agent::action::Decision;
use crate::core::error::DomainError;
use crate::core::model::ModelId;
use crate::session::response::QueryOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a consensus round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsensusOutcome {
    /// Still collecting replies
    #[default]
    Pending,
    /// A decision met the quorum rule
    Decided { decision: Decision, supporters: Vec<ModelId> },
    /// Replies arrived but none reached quorum
    NoQuorum { best: usize, required: usize },
    /// No model produced a usable decision
    AllFailed,
}

impl ConsensusOutcome {
    pub fn is_decided(&self) -> bool {
        matches!(self, ConsensusOutcome::Decided { .. })
    }
}

/// A single round of quorum consensus
///
/// # Example
///
/// ```
/// use quorum_domain::quorum::{ConsensusRound, ModelDecision, QuorumPolicy};
/// use quorum_domain::agent::{ActionKind, Decision};
/// use quorum_domain::ModelId;
///
/// let mut round = ConsensusRound::new(1, vec![ModelId::new("a"), ModelId::new("b")]);
/// let done = Decision::new(ActionKind::Done, serde_json::json!({}));
/// round.record_decision(ModelId::new("a"), done.clone());
/// round.record_decision(ModelId::new("b"), done.clone());
/// assert_eq!(round.conclude(&QuorumPolicy::default()).unwrap().decision, done);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRound {
    pub round: u32,
    pub queried: Vec<ModelId>,
    pub options: BTreeMap<ModelId, QueryOptions>,
    pub decisions: Vec<ModelDecision>,
    pub failed: Vec<ModelId>,
    pub outcome: ConsensusOutcome,
}

impl ConsensusRound {
    pub fn new(round: u32, queried: Vec<ModelId>) -> Self {
        Self {
            round,
            queried,
            options: BTreeMap::new(),
            decisions: Vec::new(),
            failed: Vec::new(),
            outcome: ConsensusOutcome::Pending,
        }
    }

    pub fn with_options(mut self, model: ModelId, options: QueryOptions) -> Self {
        self.options.insert(model, options);
        self
    }

    /// Record a successful decision; arrival order is the recording order.
    pub fn record_decision(&mut self, model: ModelId, decision: Decision) {
        let arrival = self.decisions.len();
        self.decisions.push(ModelDecision::new(model, decision, arrival));
    }

    pub fn record_failure(&mut self, model: ModelId) {
        self.failed.push(model);
    }

    pub fn responded(&self) -> usize {
        self.decisions.len()
    }

    /// Aggregate what was collected and store the outcome.
    pub fn conclude(&mut self, policy: &QuorumPolicy) -> Result<Agreement, DomainError> {
        let result = aggregate(&self.decisions, &self.queried, policy);
        self.outcome = match &result {
            Ok(agreement) => ConsensusOutcome::Decided {
                decision: agreement.decision.clone(),
                supporters: agreement.supporters.clone(),
            },
            Err(DomainError::QuorumNotReached { best, required, .. }) => {
                ConsensusOutcome::NoQuorum {
                    best: *best,
                    required: *required,
                }
            }
            Err(_) => ConsensusOutcome::AllFailed,
        };
        result
    }
}
