//! Event system for presentation-layer notifications.
//!
//! The orchestrator publishes conversation and tool lifecycle events on an
//! in-memory broadcast channel. Subscribers (a side panel, the CLI, tests)
//! receive every event published after they subscribe; publishing with no
//! subscriber is a logged no-op.

mod event_bus;
pub mod event_types;

pub use event_bus::{BusEvent, EventBus};
