//! Tool catalog built from the feature registry.
//!
//! One function tool per feature class (named after the sanitized short
//! name), followed by the fixed tools. The catalog remembers which feature
//! type each generated tool creates.

use std::collections::HashMap;

use crate::core::tool::ToolDescriptor;
use crate::document::FeatureRegistry;

use super::fixed::{fixed_tools, FIXED_TOOL_NAMES};
use super::naming::ToolNamer;
use super::schema::feature_tool_parameters;
use super::select::select_tools;
use super::types::SelectionMode;

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
    feature_types: HashMap<String, String>,
}

impl ToolCatalog {
    pub fn build(registry: &FeatureRegistry) -> Self {
        let mut namer = ToolNamer::default();
        for name in FIXED_TOOL_NAMES {
            namer.reserve(name);
        }

        let mut tools = Vec::new();
        let mut feature_types = HashMap::new();
        for class in registry.classes() {
            let name = namer.unique(&class.short_name);
            feature_types.insert(name.clone(), class.short_name.clone());
            tools.push(ToolDescriptor::new(
                name,
                class.display_name(),
                feature_tool_parameters(class),
            ));
        }
        tracing::debug!(feature_tools = tools.len(), "tool catalog built");

        tools.extend(fixed_tools());
        Self {
            tools,
            feature_types,
        }
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Feature type created by a generated tool, `None` for fixed or
    /// unknown tool names.
    pub fn feature_type(&self, tool_name: &str) -> Option<&str> {
        self.feature_types.get(tool_name).map(String::as_str)
    }

    pub fn select(&self, user_text: &str, mode: SelectionMode) -> Vec<ToolDescriptor> {
        select_tools(user_text, &self.tools, mode)
    }
}
