//! Quorum rules for consensus determination
//!
//! A rule decides whether the largest group of agreeing decisions is big
//! enough, measured against the number of models queried in the round.

use serde::{Deserialize, Serialize};

/// Rule for determining whether a round reached quorum
///
/// - `Majority`: more than half of the queried models agree (default)
/// - `Unanimous`: every queried model agrees
/// - `AtLeast(n)`: at least n models agree
/// - `Percentage(p)`: at least p% of the queried models agree
///
/// # Example
///
/// ```
/// use quorum_domain::quorum::QuorumRule;
///
/// let rule = QuorumRule::Majority;
/// assert!(rule.is_satisfied(2, 3));
/// assert!(!rule.is_satisfied(1, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuorumRule {
    #[default]
    Majority,
    Unanimous,
    AtLeast(usize),
    Percentage(u8),
}

impl QuorumRule {
    /// Check whether `agreeing` out of `total` queried models is enough.
    pub fn is_satisfied(&self, agreeing: usize, total: usize) -> bool {
        if total == 0 || agreeing == 0 {
            return false;
        }
        agreeing >= self.min_agreeing(total)
    }

    /// Minimum number of agreeing models for `total` queried models.
    pub fn min_agreeing(&self, total: usize) -> usize {
        match self {
            QuorumRule::Majority => total / 2 + 1,
            QuorumRule::Unanimous => total,
            QuorumRule::AtLeast(n) => *n,
            QuorumRule::Percentage(p) => (total * *p as usize).div_ceil(100),
        }
    }

    /// Check that this rule can ever be satisfied with `total` models.
    pub fn check_satisfiable(&self, total: usize) -> Result<(), String> {
        match self {
            QuorumRule::AtLeast(0) => Err("at_least requires n >= 1".to_string()),
            QuorumRule::AtLeast(n) if *n > total => Err(format!(
                "at_least({}) can never be met with {} model(s)",
                n, total
            )),
            QuorumRule::Percentage(p) if *p == 0 || *p > 100 => {
                Err(format!("percentage must be within 1..=100, got {}", p))
            }
            _ => Ok(()),
        }
    }

    /// Canonical form accepted by [`FromStr`](std::str::FromStr), as written
    /// in config files.
    pub fn as_config_str(&self) -> String {
        match self {
            QuorumRule::Majority => "majority".to_string(),
            QuorumRule::Unanimous => "unanimous".to_string(),
            QuorumRule::AtLeast(n) => format!("at_least:{}", n),
            QuorumRule::Percentage(p) => format!("{}%", p),
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            QuorumRule::Majority => "majority (more than half)".to_string(),
            QuorumRule::Unanimous => "unanimous (all must agree)".to_string(),
            QuorumRule::AtLeast(n) => format!("at least {} agreeing", n),
            QuorumRule::Percentage(p) => format!("at least {}% agreeing", p),
        }
    }
}

impl std::fmt::Display for QuorumRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_config_str())
    }
}

impl std::str::FromStr for QuorumRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "majority" => Ok(QuorumRule::Majority),
            "unanimous" => Ok(QuorumRule::Unanimous),
            s if s.starts_with("atleast:") || s.starts_with("at_least:") => {
                let n: usize = s
                    .split(':')
                    .nth(1)
                    .ok_or("Missing number after at_least:")?
                    .parse()
                    .map_err(|_| "Invalid number for at_least")?;
                Ok(QuorumRule::AtLeast(n))
            }
            s if s.starts_with("percentage:") || s.ends_with('%') => {
                let num_str = s.trim_start_matches("percentage:").trim_end_matches('%');
                let p: u8 = num_str.parse().map_err(|_| "Invalid percentage")?;
                Ok(QuorumRule::Percentage(p))
            }
            _ => Err(format!(
                "Unknown quorum rule: {}. Valid: majority, unanimous, at_least:N, percentage:N or N%",
                s
            )),
        }
    }
}
