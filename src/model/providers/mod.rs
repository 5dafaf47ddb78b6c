//! Provider-specific model clients.

pub mod openai_compat;
