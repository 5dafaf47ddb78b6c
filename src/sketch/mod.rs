//! Sketch normalization.
//!
//! Models describe 2D sketches loosely: string numbers, textual constraint
//! names, references to geometries where points were expected. This module
//! turns that input into a [`SketchDocument`] the constraint solver accepts.
//!
//! # Sub-modules
//!
//! - `types`: Points, geometries, constraints, and normalization options
//! - `ids`: Per-space id allocation (lowest free id on collision)
//! - `normalize`: The normalization pass

mod ids;
mod normalize;
pub mod types;


pub use ids::IdAllocator;
pub use normalize::normalize_sketch;
pub use types::{
    ConstraintKind, GeometryKind, NormalizeOptions, NormalizedSketch, SketchConstraint,
    SketchCounts, SketchDocument, SketchGeometry, SketchPoint,
};
