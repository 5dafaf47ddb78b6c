//! Model capability lookup.

/// Answers whether a model accepts image content parts.
pub trait ImageCapability: Send + Sync {
    fn supports_images(&self, model_id: &str) -> bool;
}

/// Substring table over lowercased model ids. An approximation: names are
/// matched, not declared capabilities.
#[derive(Debug, Clone)]
pub struct NameHintCapabilities {
    hints: Vec<String>,
}

pub const DEFAULT_IMAGE_HINTS: [&str; 7] = ["vision", "gpt-4o", "gpt-4.1", "omni", "o3", "o4", "vl"];

impl Default for NameHintCapabilities {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_HINTS)
    }
}

impl NameHintCapabilities {
    pub fn new<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hints: hints.into_iter().map(|h| h.into().to_lowercase()).collect(),
        }
    }
}

impl ImageCapability for NameHintCapabilities {
    fn supports_images(&self, model_id: &str) -> bool {
        let id = model_id.to_lowercase();
        self.hints.iter().any(|hint| id.contains(hint.as_str()))
    }
}
