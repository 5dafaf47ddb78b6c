use async_trait::async_trait;
use serde_json::json;

use super::registry::{FeatureClass, FeatureRegistry, ParamDef, ParamKind};
use super::{DocumentError, Feature, PartHistory};

/// Part history kept entirely in memory. Evaluation only counts runs; there
/// is no geometry kernel behind it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartHistory {
    registry: FeatureRegistry,
    features: Vec<Feature>,
    next_serial: u64,
    evaluations: u64,
    screenshot: Option<Vec<u8>>,
}

impl InMemoryPartHistory {
    pub fn new(registry: FeatureRegistry) -> Self {
        Self {
            registry,
            features: Vec::new(),
            next_serial: 1,
            evaluations: 0,
            screenshot: None,
        }
    }

    /// Serves these PNG bytes from [`PartHistory::capture_screenshot`].
    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    /// Number of completed `run_history` calls.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}

#[async_trait]
impl PartHistory for InMemoryPartHistory {
    fn features(&self) -> &[Feature] {
        &self.features
    }

    fn feature_mut(&mut self, feature_id: &str) -> Option<&mut Feature> {
        self.features
            .iter_mut()
            .find(|f| f.feature_id() == Some(feature_id))
    }

    fn feature_registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    async fn new_feature(&mut self, type_name: &str) -> Result<String, DocumentError> {
        let class = self
            .registry
            .get_safe(type_name)
            .ok_or_else(|| DocumentError::UnknownFeatureType(type_name.to_string()))?;
        let short_name = class.short_name.clone();
        let feature_id = format!("{}{}", short_name, self.next_serial);
        self.next_serial += 1;

        let mut feature = Feature::new(short_name, feature_id.clone());
        for field in &class.params {
            if let Some(default) = &field.def.default_value {
                feature
                    .input_params
                    .entry(field.key.clone())
                    .or_insert_with(|| default.clone());
            }
        }
        tracing::debug!(feature_id = %feature_id, "feature created");
        self.features.push(feature);
        Ok(feature_id)
    }

    async fn remove_feature(&mut self, feature_id: &str) -> Result<(), DocumentError> {
        let index = self
            .features
            .iter()
            .position(|f| f.feature_id() == Some(feature_id))
            .ok_or_else(|| DocumentError::FeatureNotFound(feature_id.to_string()))?;
        self.features.remove(index);
        Ok(())
    }

    async fn run_history(&mut self) -> Result<(), DocumentError> {
        self.evaluations += 1;
        Ok(())
    }

    async fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(&json!({ "features": self.features }))
            .map_err(|e| DocumentError::Evaluation(e.to_string()))
    }

    async fn capture_screenshot(&mut self) -> Result<Vec<u8>, DocumentError> {
        self.screenshot
            .clone()
            .ok_or_else(|| DocumentError::Unsupported("screenshot capture".to_string()))
    }
}

/// Registry with a small set of common modelling features.
pub fn demo_registry() -> FeatureRegistry {
    let boolean = || {
        ParamDef::new(ParamKind::BooleanOperation).default_value(json!({
            "operation": "NONE",
            "targets": []
        }))
    };
    let transform = || {
        ParamDef::new(ParamKind::Transform).default_value(json!({
            "position": [0, 0, 0],
            "rotationEuler": [0, 0, 0],
            "scale": [1, 1, 1]
        }))
    };

    FeatureRegistry::new(vec![
        FeatureClass::new("S")
            .named("Sketch")
            .param(
                "sketchPlane",
                ParamDef::new(ParamKind::ReferenceSelection)
                    .hint("Plane or face to sketch on")
                    .single(),
            )
            .param(
                "curveResolution",
                ParamDef::new(ParamKind::Number).default_value(json!(64)),
            ),
        FeatureClass::new("E")
            .named("Extrude")
            .param(
                "profile",
                ParamDef::new(ParamKind::ReferenceSelection)
                    .hint("Sketch or face to extrude")
                    .single(),
            )
            .param(
                "distance",
                ParamDef::new(ParamKind::Number)
                    .hint("Extrusion distance")
                    .default_value(json!(10)),
            )
            .param("boolean", boolean()),
        FeatureClass::new("R")
            .named("Revolve")
            .param(
                "profile",
                ParamDef::new(ParamKind::ReferenceSelection).single(),
            )
            .param("axis", ParamDef::new(ParamKind::ReferenceSelection).single())
            .param(
                "angle",
                ParamDef::new(ParamKind::Number)
                    .hint("Revolve angle in degrees")
                    .range(Some(0.0), Some(360.0))
                    .default_value(json!(360)),
            )
            .param("boolean", boolean()),
        FeatureClass::new("P.CU")
            .named("Primitive Cube")
            .param("sizeX", ParamDef::new(ParamKind::Number).hint("Width").default_value(json!(10)))
            .param("sizeY", ParamDef::new(ParamKind::Number).hint("Depth").default_value(json!(10)))
            .param("sizeZ", ParamDef::new(ParamKind::Number).hint("Height").default_value(json!(10)))
            .param("transform", transform())
            .param("boolean", boolean()),
        FeatureClass::new("P.CY")
            .named("Primitive Cylinder")
            .param("radius", ParamDef::new(ParamKind::Number).default_value(json!(5)))
            .param("height", ParamDef::new(ParamKind::Number).default_value(json!(10)))
            .param("resolution", ParamDef::new(ParamKind::Number).default_value(json!(32)))
            .param("transform", transform())
            .param("boolean", boolean()),
        FeatureClass::new("P.S")
            .named("Primitive Sphere")
            .param("radius", ParamDef::new(ParamKind::Number).default_value(json!(5)))
            .param("transform", transform())
            .param("boolean", boolean()),
        FeatureClass::new("F")
            .named("Fillet")
            .param(
                "edges",
                ParamDef::new(ParamKind::ReferenceSelection).hint("Edges to round"),
            )
            .param("radius", ParamDef::new(ParamKind::Number).hint("Fillet radius"))
            .param(
                "direction",
                ParamDef::new(ParamKind::Options)
                    .options(["AUTO", "INSET", "OUTSET"])
                    .default_value(json!("AUTO")),
            ),
        FeatureClass::new("CH")
            .named("Chamfer")
            .param("edges", ParamDef::new(ParamKind::ReferenceSelection))
            .param("distance", ParamDef::new(ParamKind::Number).default_value(json!(1))),
        FeatureClass::new("B")
            .named("Boolean")
            .param("targetSolid", ParamDef::new(ParamKind::ReferenceSelection).single())
            .param("boolean", boolean()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_feature_assigns_ids_and_defaults() {
        let mut history = InMemoryPartHistory::new(demo_registry());

        let cube = history.new_feature("P.CU").await.unwrap();
        let sketch = history.new_feature("sketch").await.unwrap();

        assert_eq!(cube, "P.CU1");
        assert_eq!(sketch, "S2");
        let feature = history.feature(&cube).unwrap();
        assert_eq!(feature.input_params.get("sizeX"), Some(&json!(10)));
        assert!(history.feature(&sketch).unwrap().is_sketch());
    }

    #[tokio::test]
    async fn test_unknown_type_and_missing_feature_errors() {
        let mut history = InMemoryPartHistory::new(demo_registry());

        let err = history.new_feature("Loft").await.unwrap_err();
        assert!(matches!(err, DocumentError::UnknownFeatureType(_)));

        let err = history.remove_feature("E9").await.unwrap_err();
        assert_eq!(err.to_string(), "Feature with ID 'E9' not found");
    }

    #[tokio::test]
    async fn test_to_json_lists_features() {
        let mut history = InMemoryPartHistory::new(demo_registry());
        history.new_feature("E").await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&history.to_json().await.unwrap()).unwrap();
        assert_eq!(parsed["features"][0]["type"], json!("E"));
        assert_eq!(parsed["features"][0]["inputParams"]["featureID"], json!("E1"));
    }
}
