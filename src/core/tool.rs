use serde::{Deserialize, Serialize};

/// Function-tool descriptor advertised to the model.
///
/// `input_schema` is a JSON Schema object (`type: "object"`) describing the
/// arguments the model must produce for this tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Lowercased `name + " " + description`, the text that relevance
    /// scoring matches against.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.name, self.description).to_lowercase()
    }
}
