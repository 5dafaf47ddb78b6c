//! Single tool-call dispatch.
//!
//! Failures stop here: the model receives a structured failure payload and
//! the presentation layer a short diagnostic line, but the batch continues.

use serde_json::json;

use crate::bus::event_types::{
    CATEGORY_TOOL, EVENT_TOOL_CALL_FAILED, EVENT_TOOL_CALL_FINISHED, EVENT_TOOL_CALL_STARTED,
};
use crate::document::PartHistory;
use crate::model::ToolCall;
use crate::tools::handlers::execute;
use crate::tools::{ToolCatalog, ToolContext, ToolFailure, ToolInvocation};

use super::request::preview_text;

/// Runs one call and returns the text to send back as its tool result.
pub(super) async fn execute_tool_call<D: PartHistory>(
    ctx: &mut ToolContext<'_, D>,
    catalog: &ToolCatalog,
    call: &ToolCall,
) -> String {
    let name = call.name();
    let arguments = call.function.arguments.as_str();
    tracing::debug!(call_id = %call.id, tool = %name, arguments = %preview_text(arguments), "tool call started");
    ctx.bus.emit(
        CATEGORY_TOOL,
        EVENT_TOOL_CALL_STARTED,
        Some(ctx.turn_id.to_string()),
        json!({ "call_id": call.id, "tool_name": name, "arguments": arguments }),
    );

    let outcome = match ToolInvocation::decode(name, arguments, catalog) {
        Ok(invocation) => execute(ctx, invocation).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(result) => {
            tracing::debug!(call_id = %call.id, tool = %name, result = %preview_text(&result), "tool call finished");
            ctx.bus.emit(
                CATEGORY_TOOL,
                EVENT_TOOL_CALL_FINISHED,
                Some(ctx.turn_id.to_string()),
                json!({ "call_id": call.id, "tool_name": name, "preview": preview_text(&result) }),
            );
            result
        }
        Err(error) => {
            tracing::warn!(call_id = %call.id, tool = %name, "tool call failed: {error}");
            ctx.bus.emit(
                CATEGORY_TOOL,
                EVENT_TOOL_CALL_FAILED,
                Some(ctx.turn_id.to_string()),
                json!({ "call_id": call.id, "tool_name": name, "error": error.to_string() }),
            );
            ctx.notice(format!("Sorry, there was an error executing the tool: {error}"));

            let failure = ToolFailure::new(name, arguments, &error);
            serde_json::to_string(&failure).unwrap_or_else(|_| {
                json!({ "ok": false, "tool": name, "error": error.to_string() }).to_string()
            })
        }
    }
}
