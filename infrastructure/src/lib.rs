//! Infrastructure layer for quorum-tree
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod bus;
pub mod config;
pub mod logging;
pub mod providers;
pub mod registry;

// Re-export commonly used types
pub use bus::LocalBroadcaster;
pub use config::{
    ConfigLoader, ConfigSource, ConfigValidationError, FileAgentConfig, FileConfig,
    FileLoggingConfig, FileQuorumConfig, FileRetryConfig,
};
pub use logging::JsonlConversationLogger;
pub use providers::{Script, ScriptError, ScriptedModelGateway, ScriptedReply};
pub use registry::InMemoryRegistry;
