//! Model gateway providers.
//!
//! Only the scripted provider ships with the runtime; network backends plug
//! in by implementing [`ModelGateway`](quorum_application::ModelGateway).

mod scripted;

pub use scripted::{Script, ScriptError, ScriptedFailure, ScriptedModelGateway, ScriptedReply};
