//! Operating profile section of the system prompt.
//!
//! Only capability-group identifiers are listed. The profile's display name
//! and description are deliberately left out so they cannot steer spawn or
//! action decisions.

use serde::{Deserialize, Serialize};

/// Header of the injected section.
pub const OPERATING_PROFILE_HEADER: &str = "## Operating Profile";

/// Profile attached to an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Display name (never rendered into prompts)
    pub name: String,
    /// Human description (never rendered into prompts)
    pub description: String,
    /// Capability groups the agent may use
    #[serde(default)]
    pub capability_groups: Option<Vec<String>>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capability_groups(mut self, groups: Vec<String>) -> Self {
        self.capability_groups = Some(groups);
        self
    }
}

/// Append the operating profile section to `system_prompt`.
pub fn inject_operating_profile(system_prompt: &str, profile: &AgentProfile) -> String {
    let mut out = String::from(system_prompt);
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(OPERATING_PROFILE_HEADER);
    out.push('\n');
    let groups = profile.capability_groups.as_deref().unwrap_or(&[]);
    for group in groups {
        out.push_str("- ");
        out.push_str(group);
        out.push('\n');
    }
    out
}
