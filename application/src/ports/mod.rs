//! Port definitions (interfaces for external dependencies)
//!
//! Ports define the boundary between the application core and the outside
//! world. Adapters in the infrastructure layer implement them.

pub mod action_executor;
pub mod agent_registry;
pub mod conversation_logger;
pub mod message_bus;
pub mod model_gateway;
