//! Schema-driven numeric coercion of feature arguments.

use serde_json::{Map, Value};

use crate::core::numeric::parse_numeric_like;
use crate::document::{ParamField, ParamKind};

const TRANSFORM_VECTORS: [&str; 3] = ["position", "rotationEuler", "scale"];
const BOOLEAN_OP_NUMBERS: [&str; 2] = ["biasDistance", "offsetDistance"];

/// Converts numeric strings to numbers wherever the feature schema expects
/// numbers. Keys absent from the schema, and values that do not parse, are
/// left untouched.
pub fn coerce_args_for_schema(mut args: Map<String, Value>, params: &[ParamField]) -> Map<String, Value> {
    for field in params {
        let Some(value) = args.get_mut(&field.key) else {
            continue;
        };
        match (&field.def.kind, value) {
            (ParamKind::Number, value) => *value = parse_numeric_like(value),
            (ParamKind::Vec3, Value::Array(items)) => coerce_all(items),
            (ParamKind::Transform, Value::Object(transform)) => {
                for key in TRANSFORM_VECTORS {
                    if let Some(Value::Array(items)) = transform.get_mut(key) {
                        coerce_all(items);
                    }
                }
            }
            (ParamKind::BooleanOperation, Value::Object(operation)) => {
                for key in BOOLEAN_OP_NUMBERS {
                    if let Some(value) = operation.get_mut(key) {
                        *value = parse_numeric_like(value);
                    }
                }
            }
            _ => {}
        }
    }
    args
}

fn coerce_all(items: &mut [Value]) {
    for item in items {
        *item = parse_numeric_like(item);
    }
}
