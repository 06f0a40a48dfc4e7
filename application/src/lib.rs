//! Application layer for quorum-tree
//!
//! This crate contains the agent runtime: ports, configuration, the message
//! router, the consensus engine, the agent actor and its supervisor.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{AgentConfig, ConfigBuilder, ConfigError, Injected, RetryPolicy};
pub use ports::{
    action_executor::{ActionExecutor, NoActionExecutor},
    agent_registry::{AgentRegistry, RegistryError},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    message_bus::{MessageBus, NoBus},
    model_gateway::{GatewayError, ModelGateway},
};
pub use use_cases::actor::{
    ActorError, AgentActor, AgentHandle, ExitReason, Stimulus, WeakAgentHandle,
    schedule_consensus_continuation,
};
pub use use_cases::consensus::{ConsensusEngine, ConsensusError, ContinuationHooks, ModelQueryOutcome};
pub use use_cases::router::{Inbound, MessageRouter, Routed};
pub use use_cases::supervisor::{SpawnError, Supervisor};
