//! Tool handlers.
//!
//! Each handler receives a decoded [`ToolInvocation`] and mutates the part
//! history through the [`PartHistory`] contract. Handlers return the text
//! sent back to the model as the tool result.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::bus::event_types::{CATEGORY_AGENT, CATEGORY_CONVERSATION, EVENT_AGENT_NOTICE, EVENT_MESSAGE_APPENDED};
use crate::bus::EventBus;
use crate::conversation::{MessageStore, Role};
use crate::core::numeric::{number_value, to_finite_number};
use crate::document::PartHistory;
use crate::sketch::normalize_sketch;

use super::args::{FeatureArgs, ToolInvocation, UpsertSketchArgs};
use super::coerce::coerce_args_for_schema;
use super::types::ToolError;

/// Type name used when `upsert_sketch` creates a new feature.
pub const SKETCH_FEATURE_TYPE: &str = "Sketch";
pub const MIN_CURVE_RESOLUTION: f64 = 8.0;
pub const DEFAULT_CURVE_RESOLUTION: i64 = 64;

/// Everything a handler may touch while one tool call executes.
pub struct ToolContext<'a, D: PartHistory> {
    pub document: &'a mut D,
    pub messages: &'a mut MessageStore,
    pub bus: &'a EventBus,
    pub turn_id: &'a str,
    pub screenshot_after_mutation: bool,
}

impl<D: PartHistory> ToolContext<'_, D> {
    /// Short status line for the presentation layer.
    pub fn notice(&self, text: impl Into<String>) {
        self.bus.emit(
            CATEGORY_AGENT,
            EVENT_AGENT_NOTICE,
            Some(self.turn_id.to_string()),
            json!({ "text": text.into() }),
        );
    }

    /// Captures the view and appends it to the conversation as a user image.
    pub async fn attach_screenshot(&mut self, caption: &str) -> Result<(), ToolError> {
        let png = self.document.capture_screenshot().await?;
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(png));
        let id = self.messages.append_image(Role::User, caption, data_uri);
        self.bus.emit(
            CATEGORY_CONVERSATION,
            EVENT_MESSAGE_APPENDED,
            Some(self.turn_id.to_string()),
            json!({ "id": id, "role": "user", "image": true, "caption": caption }),
        );
        Ok(())
    }

    async fn screenshot_after(&mut self, action: &str) {
        if !self.screenshot_after_mutation {
            return;
        }
        if let Err(e) = self.attach_screenshot(&format!("After {action}")).await {
            tracing::debug!("post-mutation screenshot skipped: {e}");
        }
    }
}

pub async fn execute<D: PartHistory>(
    ctx: &mut ToolContext<'_, D>,
    invocation: ToolInvocation,
) -> Result<String, ToolError> {
    match invocation {
        ToolInvocation::UpsertSketch(args) => upsert_sketch(ctx, args).await,
        ToolInvocation::CaptureScreenshot { alt_text } => {
            ctx.attach_screenshot(&alt_text).await?;
            Ok(json!({ "ok": true, "screenshot": true, "altText": alt_text }).to_string())
        }
        ToolInvocation::DumpPartHistory => {
            let history = ctx.document.to_json().await?;
            ctx.notice(history.clone());
            Ok(history)
        }
        ToolInvocation::DeleteFeature { feature_id } => {
            ctx.document.remove_feature(&feature_id).await?;
            ctx.document.run_history().await?;
            ctx.notice(format!("Deleted feature {feature_id}."));
            ctx.screenshot_after("delete_feature").await;
            Ok(json!({ "ok": true, "deleted": feature_id }).to_string())
        }
        ToolInvocation::UpdateFeature { feature_id, params } => {
            update_feature(ctx, feature_id, params).await
        }
        ToolInvocation::RunFeature(args) => run_feature(ctx, args).await,
    }
}

async fn upsert_sketch<D: PartHistory>(
    ctx: &mut ToolContext<'_, D>,
    args: UpsertSketchArgs,
) -> Result<String, ToolError> {
    let feature_id = match args.feature_id {
        Some(id) => {
            let feature = ctx
                .document
                .feature(&id)
                .ok_or_else(|| ToolError::NotFound(format!("Feature not found: {id}")))?;
            if !feature.is_sketch() {
                return Err(ToolError::InvalidInput(format!(
                    "Feature {id} is not a Sketch feature."
                )));
            }
            id
        }
        None => ctx.document.new_feature(SKETCH_FEATURE_TYPE).await?,
    };

    let normalized = normalize_sketch(&args.sketch, &args.options);
    let counts = normalized.counts();
    let sketch_value = serde_json::to_value(&normalized.sketch)
        .map_err(|e| ToolError::Execution(format!("failed to encode sketch: {e}")))?;

    let feature = ctx
        .document
        .feature_mut(&feature_id)
        .ok_or_else(|| ToolError::NotFound(format!("Feature not found: {feature_id}")))?;
    match args.curve_resolution.as_ref().and_then(to_finite_number) {
        Some(resolution) => {
            feature.input_params.insert(
                "curveResolution".to_string(),
                number_value(resolution.floor().max(MIN_CURVE_RESOLUTION)),
            );
        }
        None => {
            let current = feature
                .input_params
                .get("curveResolution")
                .and_then(to_finite_number);
            if current.is_none() {
                feature
                    .input_params
                    .insert("curveResolution".to_string(), json!(DEFAULT_CURVE_RESOLUTION));
            }
        }
    }
    if let Some(plane) = args.sketch_plane {
        feature.input_params.insert("sketchPlane".to_string(), plane);
    }
    feature
        .persistent_data
        .insert("sketch".to_string(), sketch_value);

    ctx.document.run_history().await?;

    tracing::debug!(
        feature_id = %feature_id,
        points = counts.points,
        geometries = counts.geometries,
        constraints = counts.constraints,
        warnings = normalized.warnings.len(),
        "sketch upserted"
    );
    ctx.notice(format!(
        "Upserted sketch in feature {feature_id}. Points: {}, curves: {}, constraints: {}.",
        counts.points, counts.geometries, counts.constraints
    ));
    ctx.screenshot_after("upsert_sketch").await;

    Ok(json!({
        "ok": true,
        "featureId": feature_id,
        "counts": counts,
        "warnings": normalized.warnings,
    })
    .to_string())
}

async fn update_feature<D: PartHistory>(
    ctx: &mut ToolContext<'_, D>,
    feature_id: String,
    params: Map<String, Value>,
) -> Result<String, ToolError> {
    let type_name = ctx
        .document
        .feature(&feature_id)
        .map(|f| f.type_name.clone())
        .ok_or_else(|| {
            ToolError::NotFound(format!("Feature with ID '{feature_id}' not found."))
        })?;
    let coerced = coerce_for_type(ctx.document, &type_name, params);

    let feature = ctx
        .document
        .feature_mut(&feature_id)
        .ok_or_else(|| ToolError::NotFound(format!("Feature with ID '{feature_id}' not found.")))?;
    for (key, value) in &coerced {
        feature.input_params.insert(key.clone(), value.clone());
    }
    ctx.document.run_history().await?;

    ctx.notice(format!("Updated feature {feature_id}."));
    ctx.screenshot_after(&format!("updating {feature_id}")).await;
    Ok(json!({ "ok": true, "featureId": feature_id, "params": coerced }).to_string())
}

async fn run_feature<D: PartHistory>(
    ctx: &mut ToolContext<'_, D>,
    args: FeatureArgs,
) -> Result<String, ToolError> {
    let FeatureArgs {
        tool_name,
        feature_type,
        feature_id,
        params,
    } = args;
    let coerced = coerce_for_type(ctx.document, &feature_type, params);

    let feature_id = match feature_id {
        Some(id) => {
            let existing = ctx.document.feature(&id).ok_or_else(|| {
                ToolError::NotFound(format!("Feature with ID '{id}' not found to modify."))
            })?;
            if existing.type_name != feature_type {
                return Err(ToolError::InvalidInput(format!(
                    "Feature type mismatch for '{id}'. Expected '{}', got '{feature_type}'.",
                    existing.type_name
                )));
            }
            id
        }
        None => ctx.document.new_feature(&feature_type).await?,
    };

    let feature = ctx
        .document
        .feature_mut(&feature_id)
        .ok_or_else(|| ToolError::NotFound(format!("Feature with ID '{feature_id}' not found.")))?;
    for (key, value) in &coerced {
        feature.input_params.insert(key.clone(), value.clone());
    }
    ctx.document.run_history().await?;

    tracing::debug!(tool = %tool_name, feature_id = %feature_id, "feature tool executed");
    ctx.notice(format!("Executed tool: {feature_type} on feature {feature_id}."));
    ctx.screenshot_after(&format!("executing {feature_type}")).await;
    Ok(json!({
        "ok": true,
        "executed": feature_type,
        "featureId": feature_id,
        "args": coerced,
    })
    .to_string())
}

fn coerce_for_type<D: PartHistory>(
    document: &D,
    type_name: &str,
    params: Map<String, Value>,
) -> Map<String, Value> {
    match document.feature_registry().get_safe(type_name) {
        Some(class) => coerce_args_for_schema(params, &class.params),
        None => params,
    }
}
