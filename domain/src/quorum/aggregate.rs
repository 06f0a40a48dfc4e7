//! Aggregation of per-model decisions into one agreed decision.

use super::ballot::ModelDecision;
use super::policy::{QuorumPolicy, TieBreak};
use crate::agent::action::Decision;
use crate::core::error::DomainError;
use crate::core::model::ModelId;

/// Result of a successful aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Agreement {
    pub decision: Decision,
    pub supporters: Vec<ModelId>,
    pub total: usize,
}

impl Agreement {
    pub fn agreeing(&self) -> usize {
        self.supporters.len()
    }
}

struct Group<'a> {
    decision: &'a Decision,
    members: Vec<&'a ModelDecision>,
}

impl Group<'_> {
    fn first_arrival(&self) -> usize {
        self.members.iter().map(|m| m.arrival).min().unwrap_or(usize::MAX)
    }

    fn first_position(&self, queried: &[ModelId]) -> usize {
        self.members
            .iter()
            .filter_map(|m| queried.iter().position(|q| *q == m.model))
            .min()
            .unwrap_or(usize::MAX)
    }
}

/// Aggregate `decisions` from a round that queried `queried` models.
///
/// Identical `(action, params)` pairs form a group. The largest group must
/// satisfy the policy's rule against `queried.len()`; equally large groups are
/// ordered by the policy's tie-break. Output depends only on the inputs.
pub fn aggregate(
    decisions: &[ModelDecision],
    queried: &[ModelId],
    policy: &QuorumPolicy,
) -> Result<Agreement, DomainError> {
    let total = queried.len();
    if total == 0 {
        return Err(DomainError::NoModels);
    }
    if decisions.is_empty() {
        return Err(DomainError::AllModelsFailed);
    }

    let mut groups: Vec<Group<'_>> = Vec::new();
    for entry in decisions {
        match groups.iter_mut().find(|g| *g.decision == entry.decision) {
            Some(group) => group.members.push(entry),
            None => groups.push(Group {
                decision: &entry.decision,
                members: vec![entry],
            }),
        }
    }

    let best_size = groups.iter().map(|g| g.members.len()).max().unwrap_or(0);
    let winner = groups
        .iter()
        .filter(|g| g.members.len() == best_size)
        .min_by_key(|g| match policy.tie_break {
            TieBreak::FirstResponder => (g.first_arrival(), g.first_position(queried)),
            TieBreak::ModelOrder => (g.first_position(queried), g.first_arrival()),
        })
        .ok_or(DomainError::AllModelsFailed)?;

    if !policy.rule.is_satisfied(best_size, total) {
        return Err(DomainError::QuorumNotReached {
            best: best_size,
            required: policy.rule.min_agreeing(total),
            total,
        });
    }

    let mut supporters: Vec<&ModelDecision> = winner.members.clone();
    supporters.sort_by_key(|m| m.arrival);

    Ok(Agreement {
        decision: winner.decision.clone(),
        supporters: supporters.into_iter().map(|m| m.model.clone()).collect(),
        total,
    })
}
