//! Shared types for the tool system.
//!
//! - Tool error type and its conversion from document errors
//! - The structured failure payload returned to the model
//! - Tool selection modes

use serde::Serialize;

use crate::document::DocumentError;

/// Errors raised while decoding or executing a single tool call. These never
/// abort a turn; they are reported back to the model as a [`ToolFailure`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<DocumentError> for ToolError {
    fn from(error: DocumentError) -> Self {
        match error {
            DocumentError::FeatureNotFound(_) => ToolError::NotFound(error.to_string()),
            DocumentError::UnknownFeatureType(_) => ToolError::InvalidInput(error.to_string()),
            DocumentError::Unsupported(_) | DocumentError::Evaluation(_) => {
                ToolError::Execution(error.to_string())
            }
        }
    }
}

/// Result content sent to the model when a tool call fails.
#[derive(Debug, Clone, Serialize)]
pub struct ToolFailure {
    pub ok: bool,
    pub tool: String,
    pub args: String,
    pub error: String,
}

impl ToolFailure {
    pub fn new(tool: &str, args: &str, error: &ToolError) -> Self {
        Self {
            ok: false,
            tool: tool.to_string(),
            args: args.to_string(),
            error: error.to_string(),
        }
    }
}

/// How many tools to advertise for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Relevance-scored selection padded to a working set.
    Normal,
    /// Reduced, fixed-preference set used after a tool-call formatting failure.
    Compact,
}
