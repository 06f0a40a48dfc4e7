//! Use cases (application services)
//!
//! - [`router`] — normalizes inbound stimuli into history and timer effects
//! - [`consensus`] — parallel model queries, retry and quorum aggregation
//! - [`actor`] — the per-agent mailbox loop and action dispatch
//! - [`supervisor`] — supervision scope and spawn authority

pub mod actor;
pub mod consensus;
pub mod router;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_support;
