//! cadchat backend library.
//!
//! A chat agent that edits a parametric CAD part history through model
//! tool calls. It handles:
//! - Conversation history and its projection into model requests
//! - Building the tool catalog from the host's feature registry
//! - Normalizing model-written sketches into consistent sketch documents
//! - Running the tool-calling loop with its retry and depth policies
//!
//! # Architecture
//!
//! - `runtime`: The orchestrator (turn state machine) and credential handling
//! - `conversation`: Message store and request projection
//! - `tools`: Tool catalog, selection, argument decoding and handlers
//! - `sketch`: Sketch normalization
//! - `document`: Part-history contract and an in-memory implementation
//! - `model`: Chat-completions client and wire types
//! - `bus`: Event bus for presentation-layer notifications
//! - `config`: Environment-driven configuration
//! - `core`: Shared types and utilities

pub mod bus;
pub mod config;
pub mod conversation;
pub mod core;
pub mod document;
pub mod model;
pub mod runtime;
pub mod sketch;
pub mod tools;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

pub use config::{ChatConfig, ConfigError};
pub use runtime::{Orchestrator, TurnOutcome};

const DEFAULT_LOG_FILTER: &str = "cadchat=debug,info";

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
