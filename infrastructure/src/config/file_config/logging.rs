//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ```toml
/// [logging]
/// conversation_log = "logs/run.conversation.jsonl"
/// log_dir = "logs"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of consensus rounds and actions
    pub conversation_log: Option<PathBuf>,
    /// Directory for daily rolling diagnostic logs
    pub log_dir: Option<PathBuf>,
}
