//! Topic message bus.
//!
//! Provides [`LocalBroadcaster`], an in-process implementation of the
//! [`MessageBus`](quorum_application::MessageBus) port.

mod broadcaster;

pub use broadcaster::{DEFAULT_CAPACITY, LocalBroadcaster};
