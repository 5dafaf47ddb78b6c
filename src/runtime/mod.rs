//! Conversation runtime.
//!
//! - `orchestrator`: The tool-calling loop for one chat session
//! - `credentials`: API key cache and the host prompt contract

pub mod credentials;
pub mod orchestrator;

pub use credentials::{CredentialCache, CredentialPrompt};
pub use orchestrator::{Orchestrator, TurnOutcome, MAX_FOLLOWUP_ROUNDS};
