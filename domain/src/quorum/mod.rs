//! Quorum consensus domain
//!
//! Several models are asked for the next action in parallel. Their replies
//! are parsed into [`Decision`](crate::agent::Decision)s, grouped, and the
//! largest group wins when it satisfies the [`QuorumRule`].
//!
//! ```text
//! replies ──parse_decision──▶ ModelDecision ──aggregate(policy)──▶ Agreement
//!                                   │
//!                             ConsensusRound (logged)
//! ```

pub mod aggregate;
pub mod ballot;
pub mod consensus;
pub mod parsing;
pub mod policy;
pub mod rule;

pub use aggregate::{Agreement, aggregate};
pub use ballot::ModelDecision;
pub use consensus::{ConsensusOutcome, ConsensusRound};
pub use parsing::parse_decision;
pub use policy::{QuorumPolicy, TieBreak};
pub use rule::QuorumRule;
