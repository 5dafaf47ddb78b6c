//! Converts free-form model output into a solver-ready [`SketchDocument`].
//!
//! Normalization never fails. Anything unusable is dropped and reported
//! as a human-readable warning; the result always contains at least one
//! point and a center point near the origin.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::ids::IdAllocator;
use super::types::{
    ConstraintKind, GeometryKind, NormalizeOptions, NormalizedSketch, SketchConstraint,
    SketchDocument, SketchGeometry, SketchPoint,
};
use crate::core::numeric::{to_finite_number, to_index};

/// Substrings in an object reference's `type`/`kind`/`refType` that mark it
/// as a geometry reference rather than a point reference.
const GEOMETRY_REF_HINTS: [&str; 7] = [
    "geometry", "curve", "edge", "line", "circle", "arc", "bezier",
];
const GEOMETRY_REF_FIELDS: [&str; 6] = [
    "geometryId",
    "geometryID",
    "geometry",
    "curveId",
    "curveID",
    "curve",
];
const GEOMETRY_REF_ARRAYS: [&str; 3] = ["geometryIds", "geometries", "curves"];
const EXTRA_POINT_FIELDS: [&str; 4] = ["pointId", "point", "targetPointId", "target"];

pub fn normalize_sketch(raw: &Value, options: &NormalizeOptions) -> NormalizedSketch {
    let empty = Map::new();
    let input = raw.as_object().unwrap_or(&empty);
    let mut normalizer = Normalizer::new(options);

    normalizer.collect_points(input.get("points"));
    let center_id = normalizer.ensure_center();
    normalizer.collect_geometries(input.get("geometries"));

    let raw_constraints = match (input.get("constraints"), input.get("dimensions")) {
        (Some(Value::Array(list)), _) => list.as_slice(),
        (_, Some(Value::Array(list))) => list.as_slice(),
        _ => &[],
    };
    normalizer.collect_constraints(raw_constraints);

    if options.prefer_center_constraints {
        normalizer.inject_center_constraints(center_id);
    }

    normalizer.finish()
}

struct Normalizer {
    tolerance: f64,
    allow_ground: bool,
    sketch: SketchDocument,
    warnings: Vec<String>,
    point_ids: IdAllocator,
    geometry_ids: IdAllocator,
    constraint_ids: IdAllocator,
    geometry_points: HashMap<u64, Vec<u64>>,
}

impl Normalizer {
    fn new(options: &NormalizeOptions) -> Self {
        Self {
            tolerance: options.effective_tolerance(),
            allow_ground: options.allow_ground,
            sketch: SketchDocument::default(),
            warnings: Vec::new(),
            point_ids: IdAllocator::default(),
            geometry_ids: IdAllocator::default(),
            constraint_ids: IdAllocator::default(),
            geometry_points: HashMap::new(),
        }
    }

    fn finish(self) -> NormalizedSketch {
        NormalizedSketch {
            sketch: self.sketch,
            warnings: self.warnings,
        }
    }

    // -----------------------------------------------------------------------
    // Points
    // -----------------------------------------------------------------------

    fn collect_points(&mut self, raw: Option<&Value>) {
        for raw_point in as_list(raw) {
            let Some(obj) = raw_point.as_object() else {
                continue;
            };
            let id = self.point_ids.allocate(obj.get("id"));
            self.sketch.points.push(SketchPoint {
                id,
                x: obj.get("x").and_then(to_finite_number).unwrap_or(0.0),
                y: obj.get("y").and_then(to_finite_number).unwrap_or(0.0),
                fixed: matches!(obj.get("fixed"), Some(Value::Bool(true))),
            });
        }

        if self.sketch.points.is_empty() {
            let id = self.point_ids.allocate(None);
            self.sketch.points.push(SketchPoint::origin(id));
            self.warnings
                .push("No valid points were provided. Inserted a default origin point.".to_string());
        }
    }

    fn ensure_center(&mut self) -> u64 {
        let tolerance = self.tolerance;
        if let Some(center) = self
            .sketch
            .points
            .iter()
            .find(|p| p.is_near(0.0, 0.0, tolerance))
        {
            return center.id;
        }
        let id = self.point_ids.allocate(None);
        self.sketch.points.push(SketchPoint::origin(id));
        self.warnings.push(format!(
            "Inserted center point at (0,0) with id {id} for center-based constraints."
        ));
        id
    }

    fn valid_point(&self, value: &Value) -> Option<u64> {
        to_index(value).filter(|id| self.point_ids.contains(*id))
    }

    fn point_coords(&self, id: u64) -> Option<(f64, f64)> {
        self.sketch.point(id).map(|p| (p.x, p.y))
    }

    // -----------------------------------------------------------------------
    // Geometries
    // -----------------------------------------------------------------------

    fn collect_geometries(&mut self, raw: Option<&Value>) {
        for raw_geometry in as_list(raw) {
            let Some(obj) = raw_geometry.as_object() else {
                continue;
            };
            let type_text = obj.get("type").map(display_text).unwrap_or_default();
            let Some(kind) = GeometryKind::parse(&type_text) else {
                self.warnings.push(format!(
                    "Skipped geometry with unsupported type \"{type_text}\"."
                ));
                continue;
            };

            let mut refs: Vec<u64> = as_list(obj.get("points"))
                .iter()
                .filter_map(|r| {
                    let id_value = match r.as_object() {
                        Some(ref_obj) => non_null(ref_obj, "pointId").or_else(|| ref_obj.get("id")),
                        None => Some(r),
                    };
                    id_value.and_then(|v| self.valid_point(v))
                })
                .collect();

            let needed = kind.min_points();
            if refs.len() < needed {
                self.warnings.push(format!(
                    "Skipped {} geometry because it had {} valid point refs; needs at least {needed}.",
                    kind.as_str(),
                    refs.len()
                ));
                continue;
            }
            if kind != GeometryKind::Bezier {
                refs.truncate(needed);
            }

            let id = self.geometry_ids.allocate(obj.get("id"));
            self.geometry_points.insert(id, refs.clone());
            self.sketch.geometries.push(SketchGeometry {
                id,
                kind,
                points: refs,
                construction: matches!(obj.get("construction"), Some(Value::Bool(true))),
            });
        }
    }

    /// Appends the first two points of the referenced geometry. Returns
    /// false when the reference does not resolve to a known geometry.
    fn append_geometry_points(&self, out: &mut Vec<u64>, reference: Option<&Value>) -> bool {
        let Some(geometry_id) = reference.and_then(to_index) else {
            return false;
        };
        match self.geometry_points.get(&geometry_id) {
            Some(points) if points.len() >= 2 => {
                out.extend_from_slice(&points[..2]);
                true
            }
            _ => false,
        }
    }

    fn is_radial_pair(&self, a: u64, b: u64) -> bool {
        self.sketch.geometries.iter().any(|g| {
            g.kind.is_radial()
                && g.points.len() >= 2
                && ((g.points[0] == a && g.points[1] == b) || (g.points[0] == b && g.points[1] == a))
        })
    }

    // -----------------------------------------------------------------------
    // Constraints
    // -----------------------------------------------------------------------

    fn collect_constraints(&mut self, raw_constraints: &[Value]) {
        for raw_constraint in raw_constraints {
            let Some(obj) = raw_constraint.as_object() else {
                continue;
            };
            let type_text = obj.get("type").map(display_text).unwrap_or_default();
            let Some(kind) = ConstraintKind::from_token(&type_text) else {
                self.warnings.push(format!(
                    "Skipped constraint with unsupported type \"{type_text}\"."
                ));
                continue;
            };
            if kind == ConstraintKind::Ground && !self.allow_ground {
                self.warnings.push(
                    "Skipped ground/fixed constraint (⏚). Set allowGround=true to keep anchored points."
                        .to_string(),
                );
                continue;
            }

            let mut refs = self.constraint_refs(obj, kind);
            let needed = kind.required_points();
            if refs.len() < needed {
                self.warnings.push(format!(
                    "Skipped {} constraint because it had {} valid point refs; needs {needed}.",
                    kind.symbol(),
                    refs.len()
                ));
                continue;
            }
            refs.truncate(needed);

            let id = self.constraint_ids.allocate(obj.get("id"));
            let mut constraint = SketchConstraint::new(id, kind, refs);

            let explicit_null = matches!(obj.get("value"), Some(Value::Null));
            constraint.value = obj.get("value").and_then(to_finite_number);
            if constraint.value.is_none() && !explicit_null {
                constraint.value = self.infer_value(kind, &constraint.points);
            }
            constraint.label_x = obj.get("labelX").and_then(to_finite_number);
            constraint.label_y = obj.get("labelY").and_then(to_finite_number);

            constraint.display_style = match obj.get("displayStyle") {
                Some(Value::String(style)) if !style.trim().is_empty() => {
                    Some(style.trim().to_string())
                }
                _ if kind == ConstraintKind::Distance
                    && self.is_radial_pair(constraint.points[0], constraint.points[1]) =>
                {
                    Some("radius".to_string())
                }
                _ => None,
            };

            self.sketch.constraints.push(constraint);
        }
    }

    /// Resolves constraint references in priority order: the `points` list
    /// (point ids, object refs, or geometry fallbacks), then single geometry
    /// fields, then geometry arrays, then extra point fields for `⏛`.
    fn constraint_refs(&self, obj: &Map<String, Value>, kind: ConstraintKind) -> Vec<u64> {
        let mut out = Vec::new();

        for raw in as_list(obj.get("points")) {
            if let Some(ref_obj) = raw.as_object() {
                let ref_type = non_null(ref_obj, "type")
                    .or_else(|| non_null(ref_obj, "kind"))
                    .or_else(|| non_null(ref_obj, "refType"))
                    .map(display_text)
                    .unwrap_or_default()
                    .to_lowercase();
                if GEOMETRY_REF_HINTS.iter().any(|hint| ref_type.contains(hint)) {
                    self.append_geometry_points(&mut out, ref_obj.get("id"));
                    continue;
                }
                if let Some(id) = non_null(ref_obj, "pointId")
                    .or_else(|| ref_obj.get("id"))
                    .and_then(|v| self.valid_point(v))
                {
                    out.push(id);
                }
                continue;
            }

            if let Some(id) = self.valid_point(raw) {
                out.push(id);
                continue;
            }
            self.append_geometry_points(&mut out, Some(raw));
        }

        for field in GEOMETRY_REF_FIELDS {
            if let Some(reference) = non_null(obj, field) {
                self.append_geometry_points(&mut out, Some(reference));
            }
        }

        for field in GEOMETRY_REF_ARRAYS {
            let Some(Value::Array(items)) = obj.get(field) else {
                continue;
            };
            for item in items {
                let reference = match item.as_object() {
                    Some(item_obj) => item_obj.get("id"),
                    None => Some(item),
                };
                self.append_geometry_points(&mut out, reference);
            }
        }

        if kind == ConstraintKind::PointOnLine && out.len() < 3 {
            for field in EXTRA_POINT_FIELDS {
                if let Some(id) = obj.get(field).and_then(|v| self.valid_point(v)) {
                    out.push(id);
                    if out.len() >= 3 {
                        break;
                    }
                }
            }
        }

        out
    }

    fn infer_value(&self, kind: ConstraintKind, points: &[u64]) -> Option<f64> {
        match (kind, points) {
            (ConstraintKind::Distance, [a, b, ..]) => {
                let (ax, ay) = self.point_coords(*a)?;
                let (bx, by) = self.point_coords(*b)?;
                Some((bx - ax).hypot(by - ay))
            }
            (ConstraintKind::Angle, [a, b, c, d, ..]) => {
                let (ax, ay) = self.point_coords(*a)?;
                let (bx, by) = self.point_coords(*b)?;
                let (cx, cy) = self.point_coords(*c)?;
                let (dx, dy) = self.point_coords(*d)?;
                let first = (by - ay).atan2(bx - ax);
                let second = (dy - cy).atan2(dx - cx);
                let degrees = (first - second).to_degrees().rem_euclid(360.0);
                degrees.is_finite().then_some(degrees)
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Center injection
    // -----------------------------------------------------------------------

    fn inject_center_constraints(&mut self, center_id: u64) {
        let Some((cx, cy)) = self.point_coords(center_id) else {
            return;
        };
        let tolerance = self.tolerance;
        let candidates: Vec<(u64, bool, bool)> = self
            .sketch
            .points
            .iter()
            .filter(|p| p.id != center_id)
            .map(|p| {
                (
                    p.id,
                    (p.x - cx).abs() <= tolerance,
                    (p.y - cy).abs() <= tolerance,
                )
            })
            .collect();

        let mut injected = 0usize;
        for (point_id, near_x, near_y) in candidates {
            let wanted: &[ConstraintKind] = match (near_x, near_y) {
                (true, true) => &[ConstraintKind::Coincident],
                (true, false) => &[ConstraintKind::Vertical],
                (false, true) => &[ConstraintKind::Horizontal],
                (false, false) => &[],
            };
            for kind in wanted {
                if self.has_pair(*kind, center_id, point_id) {
                    continue;
                }
                let id = self.constraint_ids.allocate(None);
                self.sketch
                    .constraints
                    .push(SketchConstraint::new(id, *kind, vec![center_id, point_id]));
                injected += 1;
            }
        }

        if injected > 0 {
            tracing::debug!(injected, center_id, "added center-based sketch constraints");
            self.warnings.push(format!(
                "Added {injected} center-based constraints using point {center_id}."
            ));
        }
    }

    fn has_pair(&self, kind: ConstraintKind, a: u64, b: u64) -> bool {
        self.sketch.constraints.iter().any(|c| c.links(kind, a, b))
    }
}

fn as_list(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

fn non_null<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Renders a scalar the way it would appear in a warning.
fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
