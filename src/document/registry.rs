use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parameter type as declared by a feature's input schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Number,
    Boolean,
    /// Free text and the reference-like kinds that travel as a single name
    /// (`textarea`, `file`, `line`, `circle`, `arc`, `bezier`, `constraint`,
    /// `vertex`, `edge`, `point`).
    Text,
    Options,
    Vec3,
    Transform,
    ReferenceSelection,
    ComponentSelector,
    BooleanOperation,
    Other(String),
}

impl From<&str> for ParamKind {
    fn from(raw: &str) -> Self {
        match raw {
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "string" | "textarea" | "file" | "line" | "circle" | "arc" | "bezier"
            | "constraint" | "vertex" | "edge" | "point" => Self::Text,
            "options" => Self::Options,
            "vec3" => Self::Vec3,
            "transform" => Self::Transform,
            "reference_selection" => Self::ReferenceSelection,
            "component_selector" => Self::ComponentSelector,
            "boolean_operation" => Self::BooleanOperation,
            other => Self::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ParamKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

impl ParamKind {
    /// Kinds that are never listed as required even without a default.
    pub fn is_optional_by_nature(&self) -> bool {
        matches!(
            self,
            Self::ReferenceSelection | Self::BooleanOperation | Self::Transform | Self::ComponentSelector
        )
    }
}

fn default_kind() -> ParamKind {
    ParamKind::Text
}

/// Keeps an explicit `null` distinguishable from an absent key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParamDef {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ParamKind,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub options: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "present")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub multiple: Option<bool>,
}

impl ParamDef {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            hint: None,
            label: None,
            min: None,
            max: None,
            options: None,
            default_value: None,
            multiple: None,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(|o| Value::String(o.into())).collect());
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn single(mut self) -> Self {
        self.multiple = Some(false);
        self
    }

    /// Hint, falling back to the label, falling back to empty.
    pub fn describe(&self) -> &str {
        self.hint
            .as_deref()
            .filter(|h| !h.is_empty())
            .or(self.label.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    pub key: String,
    pub def: ParamDef,
}

/// A feature type the host can instantiate.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureClass {
    /// Short code such as `P.CU` or `E`; also the feature's type name.
    pub short_name: String,
    /// Human-readable name such as `Primitive Cube`.
    pub feature_name: Option<String>,
    pub params: Vec<ParamField>,
}

impl FeatureClass {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            feature_name: None,
            params: Vec::new(),
        }
    }

    pub fn named(mut self, feature_name: impl Into<String>) -> Self {
        self.feature_name = Some(feature_name.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, def: ParamDef) -> Self {
        self.params.push(ParamField {
            key: key.into(),
            def,
        });
        self
    }

    /// Builds the parameter list from a JSON schema object
    /// (`{ "<key>": { "type": ..., "default_value": ... } }`).
    pub fn with_schema_json(mut self, schema: &Value) -> Result<Self, serde_json::Error> {
        if let Some(obj) = schema.as_object() {
            for (key, raw) in obj {
                let def: ParamDef = serde_json::from_value(raw.clone())?;
                self.params.push(ParamField {
                    key: key.clone(),
                    def,
                });
            }
        }
        Ok(self)
    }

    pub fn param_def(&self, key: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.key == key).map(|p| &p.def)
    }

    pub fn display_name(&self) -> &str {
        self.feature_name.as_deref().unwrap_or(&self.short_name)
    }
}

/// Ordered collection of feature classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRegistry {
    classes: Vec<FeatureClass>,
}

impl FeatureRegistry {
    pub fn new(classes: Vec<FeatureClass>) -> Self {
        Self { classes }
    }

    pub fn register(&mut self, class: FeatureClass) {
        self.classes.push(class);
    }

    pub fn classes(&self) -> &[FeatureClass] {
        &self.classes
    }

    /// Looks a class up by short name, then case-insensitively by short or
    /// long name. Never errors.
    pub fn get_safe(&self, type_name: &str) -> Option<&FeatureClass> {
        let wanted = type_name.trim();
        self.classes
            .iter()
            .find(|c| c.short_name == wanted)
            .or_else(|| {
                self.classes.iter().find(|c| {
                    c.short_name.eq_ignore_ascii_case(wanted)
                        || c
                            .feature_name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(wanted))
                })
            })
    }
}
