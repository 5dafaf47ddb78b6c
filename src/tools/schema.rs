//! Feature parameter definitions mapped to JSON Schema.
//!
//! Numeric fields carry no `type` so numeric strings validate; values are
//! coerced before they reach the document.

use serde_json::{json, Map, Value};

use crate::document::{FeatureClass, ParamDef, ParamKind};

const NUMERIC_ITEM: &str = "Number or numeric string";

pub fn param_schema(def: &ParamDef) -> Value {
    let hint = def.describe();
    match &def.kind {
        ParamKind::Number => {
            let mut parts = Vec::new();
            if !hint.is_empty() {
                parts.push(hint.to_string());
            }
            parts.push("Numeric value; accepts number or numeric string.".to_string());
            if let Some(min) = def.min.filter(|v| v.is_finite()) {
                parts.push(format!("Minimum: {min}."));
            }
            if let Some(max) = def.max.filter(|v| v.is_finite()) {
                parts.push(format!("Maximum: {max}."));
            }
            with_default(json!({ "description": parts.join(" ") }), def, true)
        }
        ParamKind::Boolean => {
            with_default(json!({ "type": "boolean", "description": hint }), def, true)
        }
        ParamKind::Text | ParamKind::Other(_) => {
            with_default(json!({ "type": "string", "description": hint }), def, false)
        }
        ParamKind::Options => {
            let mut schema = json!({ "type": "string", "description": hint });
            let options: Vec<String> = def
                .options
                .iter()
                .flatten()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if !options.is_empty() {
                schema["enum"] = json!(options);
            }
            with_default(schema, def, true)
        }
        ParamKind::Vec3 => {
            let description = non_empty_or(hint, "Vector3 as [x, y, z] numbers (or numeric strings)");
            with_default(triple(description), def, true)
        }
        ParamKind::Transform => {
            let description = non_empty_or(hint, "Transform with position, rotationEuler, scale");
            let schema = json!({
                "description": description,
                "type": "object",
                "properties": {
                    "position": triple("Position [x,y,z]"),
                    "rotationEuler": triple("Rotation Euler degrees [x,y,z]"),
                    "scale": triple("Scale [x,y,z]"),
                },
                "required": [],
            });
            with_default(schema, def, true)
        }
        ParamKind::ReferenceSelection => {
            let description = non_empty_or(hint, "Reference by object names");
            if def.multiple != Some(false) {
                json!({ "type": "array", "description": description, "items": { "type": "string" } })
            } else {
                json!({ "type": "string", "description": description })
            }
        }
        ParamKind::ComponentSelector => {
            json!({ "type": "string", "description": non_empty_or(hint, "Component name to insert") })
        }
        ParamKind::BooleanOperation => {
            let schema = json!({
                "description": non_empty_or(hint, "Boolean operation parameters"),
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "description": "Boolean op",
                        "enum": ["NONE", "UNION", "SUBTRACT", "INTERSECT"],
                    },
                    "targets": {
                        "type": "array",
                        "description": "Names of target solids",
                        "items": { "type": "string" },
                    },
                    "biasDistance": {
                        "description": "Small bias to reduce coplanar artifacts (number or numeric string)",
                    },
                    "offsetCoplanarCap": { "type": "string", "description": "Optional cap handling flag" },
                    "offsetDistance": {
                        "description": "Optional offset distance for caps (number or numeric string)",
                    },
                },
                "required": [],
            });
            with_default(schema, def, true)
        }
    }
}

/// Parameters object for a feature tool: every schema field, plus an
/// optional `featureId` that targets an existing feature.
pub fn feature_tool_parameters(class: &FeatureClass) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in &class.params {
        properties.insert(field.key.clone(), param_schema(&field.def));
        if field.def.default_value.is_none() && !field.def.kind.is_optional_by_nature() {
            required.push(Value::String(field.key.clone()));
        }
    }
    properties.insert(
        "featureId".to_string(),
        json!({
            "type": "string",
            "description": "Existing feature ID to modify instead of creating a new one",
        }),
    );

    let mut parameters = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        parameters["required"] = Value::Array(required);
    }
    parameters
}

fn triple(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "description": NUMERIC_ITEM },
        "minItems": 3,
        "maxItems": 3,
        "description": description,
    })
}

fn non_empty_or<'a>(hint: &'a str, fallback: &'a str) -> &'a str {
    if hint.is_empty() {
        fallback
    } else {
        hint
    }
}

/// Adds `default` when one was declared. `allow_null` keeps an explicit
/// `null` default.
fn with_default(mut schema: Value, def: &ParamDef, allow_null: bool) -> Value {
    match &def.default_value {
        Some(Value::Null) if !allow_null => {}
        Some(default) => schema["default"] = default.clone(),
        None => {}
    }
    schema
}
