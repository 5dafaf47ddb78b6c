//! Tools that exist regardless of the feature registry.

use serde_json::{json, Value};

use crate::core::tool::ToolDescriptor;

pub const UPSERT_SKETCH: &str = "upsert_sketch";
pub const DUMP_SCREENSHOT: &str = "dump_screenshot";
pub const DUMP_PART_HISTORY: &str = "dump_part_history";
pub const DELETE_FEATURE: &str = "delete_feature";
pub const UPDATE_FEATURE: &str = "update_feature";
pub const MODIFY_FEATURE: &str = "modify_feature";

pub const FIXED_TOOL_NAMES: [&str; 6] = [
    UPSERT_SKETCH,
    DUMP_SCREENSHOT,
    DUMP_PART_HISTORY,
    DELETE_FEATURE,
    UPDATE_FEATURE,
    MODIFY_FEATURE,
];

pub fn is_fixed_tool(name: &str) -> bool {
    FIXED_TOOL_NAMES.contains(&name)
}

pub fn fixed_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            UPSERT_SKETCH,
            "Create or update a Sketch feature from raw sketch JSON so the model can use any supported sketch geometry and constraints.",
            upsert_sketch_schema(),
        ),
        ToolDescriptor::new(
            DUMP_SCREENSHOT,
            "Capture the current viewport as a screenshot and attach it to the conversation.",
            json!({
                "type": "object",
                "properties": {
                    "altText": { "type": "string", "description": "Alternative text for the screenshot" }
                },
                "required": []
            }),
        ),
        ToolDescriptor::new(
            DUMP_PART_HISTORY,
            "Dump the current part history as JSON and attach it to the conversation.",
            json!({ "type": "object", "properties": {}, "required": [] }),
        ),
        ToolDescriptor::new(
            DELETE_FEATURE,
            "Delete a feature from the part history by its ID.",
            json!({
                "type": "object",
                "properties": {
                    "featureId": { "type": "string", "description": "The ID of the feature to delete" }
                },
                "required": ["featureId"]
            }),
        ),
        ToolDescriptor::new(
            UPDATE_FEATURE,
            "Modify an existing feature by ID; only provided params are changed.",
            update_schema(),
        ),
        ToolDescriptor::new(
            MODIFY_FEATURE,
            "Alias of update_feature; modify an existing feature by ID with partial params.",
            update_schema(),
        ),
    ]
}

fn update_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "featureId": { "type": "string", "description": "ID of the feature to modify" },
            "params": { "type": "object", "description": "Partial input params to update on the feature" }
        },
        "required": ["featureId", "params"]
    })
}

fn upsert_sketch_schema() -> Value {
    let integer_like = |what: &str| json!({ "description": format!("{what} ID (integer-like).") });
    json!({
        "type": "object",
        "properties": {
            "featureId": {
                "type": "string",
                "description": "Optional existing Sketch feature ID to update. Omit to create a new Sketch feature."
            },
            "sketchPlane": {
                "type": "string",
                "description": "Optional plane/face reference name for SketchFeature.sketchPlane."
            },
            "curveResolution": {
                "description": "Optional curve resolution used when discretizing arcs/circles/beziers."
            },
            "allowGround": {
                "type": "boolean",
                "description": "Optional. Keep ⏚ fixed/ground constraints when true. Default false."
            },
            "preferCenterConstraints": {
                "type": "boolean",
                "description": "Optional. Add non-fixed center-point relations when possible. Default true."
            },
            "centerTolerance": {
                "description": "Optional numeric tolerance for detecting center-aligned points. Default 1e-6."
            },
            "sketch": {
                "type": "object",
                "description": "Sketch object. You may also provide points/geometries/constraints at the top level.",
                "properties": {
                    "points": {
                        "type": "array",
                        "description": "Points in sketch plane coordinates.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": integer_like("Point"),
                                "x": { "description": "X coordinate (number or numeric string)." },
                                "y": { "description": "Y coordinate (number or numeric string)." },
                                "fixed": { "type": "boolean", "description": "Optional fixed point flag." }
                            },
                            "required": ["id", "x", "y"]
                        }
                    },
                    "geometries": {
                        "type": "array",
                        "description": "Sketch curves referencing point IDs.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": integer_like("Geometry"),
                                "type": {
                                    "type": "string",
                                    "enum": ["line", "circle", "arc", "bezier"],
                                    "description": "Geometry kind."
                                },
                                "points": {
                                    "type": "array",
                                    "items": integer_like("Point"),
                                    "description": "line:[a,b], circle:[center,r], arc:[center,start,end], bezier:[a0,h0,h1,a1,...]"
                                },
                                "construction": {
                                    "type": "boolean",
                                    "description": "Optional construction geometry flag."
                                }
                            },
                            "required": ["type", "points"]
                        }
                    },
                    "constraints": {
                        "type": "array",
                        "description": "Sketch constraints referencing point IDs.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": integer_like("Constraint"),
                                "type": {
                                    "type": "string",
                                    "enum": [
                                        "━", "│", "⟺", "⇌", "∥", "⟂", "∠", "≡", "⏛", "⋯", "⋱", "⏚",
                                        "horizontal", "vertical", "distance", "equal_distance",
                                        "equal_radius", "parallel", "perpendicular", "tangent",
                                        "angle", "coincident", "point_on_line", "midpoint",
                                        "fixed", "ground"
                                    ],
                                    "description": "Constraint symbol or alias."
                                },
                                "points": { "type": "array", "items": integer_like("Point") },
                                "value": {
                                    "description": "Numeric value for dimensional constraints (distance, angle)."
                                },
                                "displayStyle": {
                                    "type": "string",
                                    "description": "Optional display style (for example radius or diameter)."
                                },
                                "labelX": { "description": "Optional label X location." },
                                "labelY": { "description": "Optional label Y location." }
                            },
                            "required": ["type", "points"]
                        }
                    }
                },
                "required": []
            },
            "points": {
                "type": "array",
                "description": "Top-level shortcut for sketch.points.",
                "items": { "type": "object" }
            },
            "geometries": {
                "type": "array",
                "description": "Top-level shortcut for sketch.geometries.",
                "items": { "type": "object" }
            },
            "constraints": {
                "type": "array",
                "description": "Top-level shortcut for sketch.constraints.",
                "items": { "type": "object" }
            }
        },
        "required": []
    })
}
