//! Configuration file loading for quorum-tree
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `QUORUM_TREE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./quorum-tree.toml` or `./.quorum-tree.toml`
//! 4. Global: `$XDG_CONFIG_HOME/quorum-tree/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig, FileQuorumConfig,
    FileRetryConfig,
};
pub use loader::{ConfigLoader, ConfigSource, ENV_PREFIX, PROJECT_CONFIG_FILES};
