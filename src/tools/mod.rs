//! Tool catalog, selection and execution.
//!
//! This module provides:
//! - One function tool per feature class in the registry, plus fixed tools
//! - Relevance-based selection of the tools advertised per request
//! - Decoding of model-issued arguments into typed invocations
//! - Handlers that apply invocations to the part history
//!
//! # Tool Lifecycle
//!
//! 1. The catalog is built once per session from the feature registry
//! 2. Each request advertises a selected subset
//! 3. A tool call is decoded into a [`ToolInvocation`]
//! 4. The handler mutates the document and returns result text
//!
//! # Module Structure
//!
//! - `types`: `ToolError`, the failure payload, selection modes
//! - `naming`: Tool-name sanitization and de-duplication
//! - `schema`: Feature parameter definitions to JSON Schema
//! - `fixed`: Registry-independent tools
//! - `catalog`: `ToolCatalog`
//! - `select`: Normal and compact selection
//! - `args`: Argument decoding
//! - `coerce`: Schema-driven numeric coercion
//! - `handlers`: Execution against the part history

pub mod args;
pub mod catalog;
pub mod coerce;
pub mod fixed;
pub mod handlers;
pub mod naming;
pub mod schema;
pub mod select;
pub mod types;


pub use args::ToolInvocation;
pub use catalog::ToolCatalog;
pub use handlers::ToolContext;
pub use types::{SelectionMode, ToolError, ToolFailure};
