//! Crate-level tests for the conversation runtime.
//!
//! These drive a full [`Orchestrator`](crate::runtime::Orchestrator) against
//! a scripted model and the in-memory part history.

#[cfg(test)]
mod orchestrator;

#[cfg(test)]
mod events;
