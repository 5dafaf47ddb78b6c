//! Tool-call argument decoding.
//!
//! Every tool call is decoded into a [`ToolInvocation`] before anything
//! touches the document. Decoding validates the shape each tool needs and
//! reports problems as [`ToolError::InvalidInput`].

use serde_json::{Map, Value};

use crate::sketch::NormalizeOptions;

use super::catalog::ToolCatalog;
use super::fixed::{
    DELETE_FEATURE, DUMP_PART_HISTORY, DUMP_SCREENSHOT, MODIFY_FEATURE, UPDATE_FEATURE,
    UPSERT_SKETCH,
};
use super::types::ToolError;

/// Keys naming an existing feature, in priority order.
const TARGET_KEYS: [&str; 3] = ["featureId", "featureID", "id"];

pub const DEFAULT_SCREENSHOT_ALT: &str = "CAD Screenshot";

#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    UpsertSketch(UpsertSketchArgs),
    CaptureScreenshot { alt_text: String },
    DumpPartHistory,
    DeleteFeature { feature_id: String },
    UpdateFeature { feature_id: String, params: Map<String, Value> },
    RunFeature(FeatureArgs),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertSketchArgs {
    pub feature_id: Option<String>,
    /// Raw sketch object: the nested `sketch` when present, else the whole
    /// argument object.
    pub sketch: Value,
    pub options: NormalizeOptions,
    pub curve_resolution: Option<Value>,
    pub sketch_plane: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureArgs {
    pub tool_name: String,
    pub feature_type: String,
    pub feature_id: Option<String>,
    /// Remaining arguments with the targeting keys removed.
    pub params: Map<String, Value>,
}

impl ToolInvocation {
    pub fn decode(
        tool_name: &str,
        arguments: &str,
        catalog: &ToolCatalog,
    ) -> Result<Self, ToolError> {
        let args = parse_arguments(arguments)?;
        match tool_name {
            UPSERT_SKETCH => Ok(Self::UpsertSketch(UpsertSketchArgs::from_args(&args))),
            DUMP_SCREENSHOT => Ok(Self::CaptureScreenshot {
                alt_text: args
                    .get("altText")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_SCREENSHOT_ALT)
                    .to_string(),
            }),
            DUMP_PART_HISTORY => Ok(Self::DumpPartHistory),
            DELETE_FEATURE => {
                let feature_id = feature_id_arg(&args, &TARGET_KEYS).ok_or_else(|| {
                    ToolError::InvalidInput("delete_feature requires a featureId.".to_string())
                })?;
                Ok(Self::DeleteFeature { feature_id })
            }
            UPDATE_FEATURE | MODIFY_FEATURE => {
                let invalid = || {
                    ToolError::InvalidInput(format!(
                        "{tool_name} requires featureId and params object."
                    ))
                };
                let feature_id = feature_id_arg(&args, &TARGET_KEYS).ok_or_else(invalid)?;
                let params = match first_truthy(&args, &["params", "updates"]) {
                    None => Map::new(),
                    Some(Value::Object(params)) => params.clone(),
                    Some(_) => return Err(invalid()),
                };
                Ok(Self::UpdateFeature { feature_id, params })
            }
            other => {
                let feature_type = catalog
                    .feature_type(other)
                    .ok_or_else(|| ToolError::NotFound(format!("Unknown tool: {other}")))?;
                let feature_id = feature_id_arg(&args, &["featureId", "featureID"]);
                let mut params = args;
                params.remove("featureId");
                params.remove("featureID");
                Ok(Self::RunFeature(FeatureArgs {
                    tool_name: other.to_string(),
                    feature_type: feature_type.to_string(),
                    feature_id,
                    params,
                }))
            }
        }
    }
}

impl UpsertSketchArgs {
    fn from_args(args: &Map<String, Value>) -> Self {
        let sketch = match args.get("sketch") {
            Some(nested @ Value::Object(_)) => nested.clone(),
            _ => Value::Object(args.clone()),
        };
        Self {
            feature_id: feature_id_arg(args, &TARGET_KEYS),
            sketch,
            options: NormalizeOptions::from_args(args),
            curve_resolution: args.get("curveResolution").cloned(),
            sketch_plane: first_truthy(args, &["sketchPlane", "plane"]).cloned(),
        }
    }
}

/// Empty argument text decodes to an empty object.
fn parse_arguments(arguments: &str) -> Result<Map<String, Value>, ToolError> {
    if arguments.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(args)) => Ok(args),
        Ok(other) => Err(ToolError::InvalidInput(format!(
            "arguments must be a JSON object, got {other}"
        ))),
        Err(e) => Err(ToolError::InvalidInput(format!("malformed arguments: {e}"))),
    }
}

/// First key holding a non-empty string or non-zero number, as a string.
fn feature_id_arg(args: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_truthy(args, keys).and_then(|value| match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_truthy<'a>(args: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| args.get(*key))
        .find(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
