//! Shared types and utilities used across the agent.
//!
//! # Sub-modules
//!
//! - `tool`: Tool descriptors advertised to the model
//! - `numeric`: Lenient numeric parsing for model-supplied JSON values

pub mod numeric;
pub mod tool;
