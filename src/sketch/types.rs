use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::numeric::to_finite_number;

/// Smallest tolerance accepted for center detection and center injection.
pub const MIN_CENTER_TOLERANCE: f64 = 1e-9;
/// Default tolerance when the caller supplies none.
pub const DEFAULT_CENTER_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Points and geometries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchPoint {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub fixed: bool,
}

impl SketchPoint {
    pub fn origin(id: u64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            fixed: false,
        }
    }

    pub fn is_near(&self, x: f64, y: f64, tolerance: f64) -> bool {
        (self.x - x).abs() <= tolerance && (self.y - y).abs() <= tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Line,
    Circle,
    Arc,
    Bezier,
}

impl GeometryKind {
    /// Parses a geometry type name, case-insensitively. `spline` is an
    /// alias for `bezier`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "line" => Some(Self::Line),
            "circle" => Some(Self::Circle),
            "arc" => Some(Self::Arc),
            "bezier" | "spline" => Some(Self::Bezier),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Circle => "circle",
            Self::Arc => "arc",
            Self::Bezier => "bezier",
        }
    }

    /// Minimum number of point references the geometry needs.
    pub const fn min_points(self) -> usize {
        match self {
            Self::Line | Self::Circle => 2,
            Self::Arc => 3,
            Self::Bezier => 4,
        }
    }

    /// Circles and arcs reference `[center, rim, ...]`.
    pub const fn is_radial(self) -> bool {
        matches!(self, Self::Circle | Self::Arc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchGeometry {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub points: Vec<u64>,
    #[serde(default)]
    pub construction: bool,
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Constraint taxonomy. Serialized as the canonical symbol the solver reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "━")]
    Horizontal,
    #[serde(rename = "│")]
    Vertical,
    #[serde(rename = "⟺")]
    Distance,
    #[serde(rename = "⇌")]
    Equal,
    #[serde(rename = "∥")]
    Parallel,
    #[serde(rename = "⟂")]
    Perpendicular,
    #[serde(rename = "∠")]
    Angle,
    #[serde(rename = "≡")]
    Coincident,
    #[serde(rename = "⏛")]
    PointOnLine,
    #[serde(rename = "⋯")]
    Midpoint,
    #[serde(rename = "⏚")]
    Ground,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 11] = [
        Self::Horizontal,
        Self::Vertical,
        Self::Distance,
        Self::Equal,
        Self::Parallel,
        Self::Perpendicular,
        Self::Angle,
        Self::Coincident,
        Self::PointOnLine,
        Self::Midpoint,
        Self::Ground,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Horizontal => "━",
            Self::Vertical => "│",
            Self::Distance => "⟺",
            Self::Equal => "⇌",
            Self::Parallel => "∥",
            Self::Perpendicular => "⟂",
            Self::Angle => "∠",
            Self::Coincident => "≡",
            Self::PointOnLine => "⏛",
            Self::Midpoint => "⋯",
            Self::Ground => "⏚",
        }
    }

    /// Exact number of point references the constraint consumes.
    pub const fn required_points(self) -> usize {
        match self {
            Self::Ground => 1,
            Self::Horizontal | Self::Vertical | Self::Distance | Self::Coincident => 2,
            Self::PointOnLine | Self::Midpoint => 3,
            Self::Equal | Self::Parallel | Self::Perpendicular | Self::Angle => 4,
        }
    }

    /// Resolves a canonical symbol or a textual alias (case-insensitive).
    pub fn from_token(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }
        if let Some(kind) = Self::ALL.iter().copied().find(|k| k.symbol() == token) {
            return Some(kind);
        }
        if token == "⋱" {
            return Some(Self::Midpoint);
        }
        match token.to_lowercase().as_str() {
            "horizontal" | "h" => Some(Self::Horizontal),
            "vertical" | "v" => Some(Self::Vertical),
            "distance" | "length" => Some(Self::Distance),
            "equal" | "equal_distance" | "equaldistance" | "equal_radius" | "equalradius" => {
                Some(Self::Equal)
            }
            "parallel" => Some(Self::Parallel),
            "perpendicular" | "tangent" => Some(Self::Perpendicular),
            "angle" => Some(Self::Angle),
            "coincident" => Some(Self::Coincident),
            "point_on_line" | "pointonline" | "collinear" | "colinear" => Some(Self::PointOnLine),
            "midpoint" | "mid_point" => Some(Self::Midpoint),
            "fixed" | "ground" | "lock" => Some(Self::Ground),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchConstraint {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    pub points: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(
        rename = "displayStyle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_style: Option<String>,
    #[serde(rename = "labelX", default, skip_serializing_if = "Option::is_none")]
    pub label_x: Option<f64>,
    #[serde(rename = "labelY", default, skip_serializing_if = "Option::is_none")]
    pub label_y: Option<f64>,
}

impl SketchConstraint {
    pub fn new(id: u64, kind: ConstraintKind, points: Vec<u64>) -> Self {
        Self {
            id,
            kind,
            points,
            value: None,
            display_style: None,
            label_x: None,
            label_y: None,
        }
    }

    /// True when the constraint has this kind and its first two references
    /// are `a` and `b` in either order.
    pub fn links(&self, kind: ConstraintKind, a: u64, b: u64) -> bool {
        self.kind == kind
            && self.points.len() >= 2
            && ((self.points[0] == a && self.points[1] == b)
                || (self.points[0] == b && self.points[1] == a))
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Solver-ready sketch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SketchDocument {
    pub points: Vec<SketchPoint>,
    pub geometries: Vec<SketchGeometry>,
    pub constraints: Vec<SketchConstraint>,
}

impl SketchDocument {
    pub fn point(&self, id: u64) -> Option<&SketchPoint> {
        self.points.iter().find(|p| p.id == id)
    }
}

/// Counts reported back to the model after an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SketchCounts {
    pub points: usize,
    pub geometries: usize,
    pub constraints: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSketch {
    pub sketch: SketchDocument,
    pub warnings: Vec<String>,
}

impl NormalizedSketch {
    pub fn counts(&self) -> SketchCounts {
        SketchCounts {
            points: self.sketch.points.len(),
            geometries: self.sketch.geometries.len(),
            constraints: self.sketch.constraints.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Keep ground (`⏚`) constraints instead of dropping them.
    pub allow_ground: bool,
    /// Inject center-relative constraints for points aligned with the center.
    pub prefer_center_constraints: bool,
    pub center_tolerance: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            allow_ground: false,
            prefer_center_constraints: true,
            center_tolerance: DEFAULT_CENTER_TOLERANCE,
        }
    }
}

impl NormalizeOptions {
    /// Reads `allowGround`, `preferCenterConstraints` and `centerTolerance`
    /// from tool arguments. Only a literal `true` enables ground and only a
    /// literal `false` disables center injection.
    pub fn from_args(args: &serde_json::Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            allow_ground: matches!(args.get("allowGround"), Some(Value::Bool(true))),
            prefer_center_constraints: !matches!(
                args.get("preferCenterConstraints"),
                Some(Value::Bool(false))
            ),
            center_tolerance: args
                .get("centerTolerance")
                .and_then(to_finite_number)
                .unwrap_or(defaults.center_tolerance),
        }
    }

    /// Tolerance actually applied: absolute value, floored at
    /// [`MIN_CENTER_TOLERANCE`].
    pub fn effective_tolerance(&self) -> f64 {
        self.center_tolerance.abs().max(MIN_CENTER_TOLERANCE)
    }
}
