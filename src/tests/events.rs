//! Event stream tests.
//!
//! These tests verify:
//! - Events of one turn share its turn id and arrive in sequence order
//! - Tool lifecycle events bracket each call
//! - Event payload structure

#[cfg(test)]
pub mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::bus::event_types::*;
    use crate::testing::{call, drain, orchestrator, text, tool_calls, RecordingPrompt, ScriptedModel};

    #[tokio::test]
    async fn test_turn_events_are_ordered_and_tagged() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![call("call-1", "P_CU", json!({"sizeZ": 3}))]))
            .then(text("Cube added."));
        let mut orch = orchestrator(model, RecordingPrompt::default());
        let mut rx = orch.subscribe();

        orch.send_user_message("add a cube").await;

        let events = drain(&mut rx);
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                EVENT_MESSAGE_APPENDED,
                EVENT_TOOL_CALL_STARTED,
                EVENT_AGENT_NOTICE,
                EVENT_TOOL_CALL_FINISHED,
                EVENT_MESSAGE_APPENDED,
                EVENT_MESSAGE_APPENDED,
                EVENT_MESSAGE_APPENDED,
            ]
        );

        let turn_id = events[0].turn_id.clone().expect("turn id");
        assert!(events.iter().all(|e| e.turn_id.as_deref() == Some(turn_id.as_str())));
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[tokio::test]
    async fn test_tool_event_payload_structure() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![call("call-7", "dump_part_history", json!({}))]))
            .then(text("Nothing yet."));
        let mut orch = orchestrator(model, RecordingPrompt::default());
        let mut rx = orch.subscribe();

        orch.send_user_message("what is in the part?").await;

        let events = drain(&mut rx);
        let started = events
            .iter()
            .find(|e| e.event_type == EVENT_TOOL_CALL_STARTED)
            .expect("started event");
        assert_eq!(started.category, CATEGORY_TOOL);
        assert_eq!(
            started.payload,
            json!({"call_id": "call-7", "tool_name": "dump_part_history", "arguments": "{}"})
        );

        let finished = events
            .iter()
            .find(|e| e.event_type == EVENT_TOOL_CALL_FINISHED)
            .expect("finished event");
        assert_eq!(finished.payload["preview"], r#"{"features":[]}"#);

        let appended: Vec<&str> = events
            .iter()
            .filter(|e| e.event_type == EVENT_MESSAGE_APPENDED)
            .map(|e| e.payload["role"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(appended, vec!["user", "assistant", "tool", "assistant"]);
    }
}
