//! Part-history contract.
//!
//! The agent never reaches into the CAD host directly. Everything it needs
//! (feature lookup, creation, removal, re-evaluation, serialization and
//! screenshots) goes through the [`PartHistory`] trait.
//!
//! # Sub-modules
//!
//! - `registry`: Feature classes and their parameter schemas
//! - `memory`: In-process part history used by the CLI and tests

mod memory;
pub mod registry;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::{demo_registry, InMemoryPartHistory};
pub use registry::{FeatureClass, FeatureRegistry, ParamDef, ParamField, ParamKind};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Feature with ID '{0}' not found")]
    FeatureNotFound(String),
    #[error("unknown feature type: {0}")]
    UnknownFeatureType(String),
    #[error("{0} is not supported by this part history")]
    Unsupported(String),
    #[error("history evaluation failed: {0}")]
    Evaluation(String),
}

/// One entry of the part history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "type")]
    pub type_name: String,
    pub input_params: Map<String, Value>,
    pub persistent_data: Map<String, Value>,
}

impl Feature {
    pub fn new(type_name: impl Into<String>, feature_id: impl Into<String>) -> Self {
        let mut input_params = Map::new();
        input_params.insert("featureID".to_string(), Value::String(feature_id.into()));
        Self {
            type_name: type_name.into(),
            input_params,
            persistent_data: Map::new(),
        }
    }

    pub fn feature_id(&self) -> Option<&str> {
        self.input_params.get("featureID").and_then(Value::as_str)
    }

    /// Sketch features are matched loosely: `Sketch`, `S`, or any type name
    /// containing "sketch".
    pub fn is_sketch(&self) -> bool {
        let name = self.type_name.trim().to_lowercase();
        name == "s" || name.contains("sketch")
    }
}

/// Narrow interface over the host CAD document.
#[async_trait]
pub trait PartHistory: Send + Sync {
    fn features(&self) -> &[Feature];

    fn feature_mut(&mut self, feature_id: &str) -> Option<&mut Feature>;

    fn feature_registry(&self) -> &FeatureRegistry;

    /// Appends a feature of the given type and returns its assigned id.
    async fn new_feature(&mut self, type_name: &str) -> Result<String, DocumentError>;

    async fn remove_feature(&mut self, feature_id: &str) -> Result<(), DocumentError>;

    /// Re-evaluates the whole history after a mutation.
    async fn run_history(&mut self) -> Result<(), DocumentError>;

    async fn to_json(&self) -> Result<String, DocumentError>;

    /// PNG bytes of the current view.
    async fn capture_screenshot(&mut self) -> Result<Vec<u8>, DocumentError> {
        Err(DocumentError::Unsupported("screenshot capture".to_string()))
    }

    fn feature(&self, feature_id: &str) -> Option<&Feature> {
        self.features()
            .iter()
            .find(|f| f.feature_id() == Some(feature_id))
    }
}
