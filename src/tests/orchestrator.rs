//! Orchestrator turn tests.
//!
//! These tests verify:
//! - Request framing and follow-up ordering
//! - Sequential tool execution within a batch
//! - The follow-up depth ceiling
//! - The single compact-toolset retry
//! - Credential prompting and invalidation
//! - Failure diagnostics

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::bus::event_types::{
        EVENT_AGENT_NOTICE, EVENT_CONVERSATION_RESET, EVENT_MESSAGE_DELETED,
        EVENT_ORPHAN_TOOL_MESSAGES, EVENT_TOOL_CALL_FAILED,
    };
    use crate::conversation::Role;
    use crate::document::{demo_registry, InMemoryPartHistory, PartHistory};
    use crate::model::{ChatMessage, ChatRole, ContentPart, MessageContent, ModelError};
    use crate::runtime::orchestrator::request::{find_orphan_tool_messages, preview_text};
    use crate::runtime::orchestrator::{
        AUTH_FAILED_TEXT, DEPTH_LIMIT_TEXT, GENERIC_FAILURE_TEXT, RESET_WELCOME_TEXT,
    };
    use crate::runtime::{TurnOutcome, MAX_FOLLOWUP_ROUNDS};
    use crate::testing::{
        call, drain, generation_error, orchestrator, orchestrator_with, test_config, text,
        tool_calls, RecordingPrompt, ScriptedModel, TEST_API_KEY,
    };

    fn last_text(messages: &crate::conversation::MessageStore) -> String {
        messages.messages().last().map(|m| m.text().to_string()).unwrap_or_default()
    }

    fn parse(content: &str) -> Value {
        serde_json::from_str(content).expect("tool result is JSON")
    }

    // ====================================================================================
    // REQUEST FRAMING
    // ====================================================================================

    #[tokio::test]
    async fn test_plain_reply_completes_without_followups() {
        let model = ScriptedModel::new("gpt-4o-mini").then(text("Hello!"));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        let outcome = orch.send_user_message("hi there").await;

        assert_eq!(outcome, TurnOutcome::Completed { followups: 0 });
        let roles: Vec<Role> = orch.messages().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(last_text(orch.messages()), "Hello!");
        assert_eq!(model.api_keys(), vec![TEST_API_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_request_carries_system_prompt_and_history_context() {
        let model = ScriptedModel::new("gpt-4o-mini").then(text("ok"));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        orch.send_user_message("make a cube").await;

        let request = &model.requests()[0];
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.tool_choice.as_deref(), Some("auto"));
        assert_eq!(request.parallel_tool_calls, Some(false));
        assert_eq!(request.tool_names()[0], "P_CU");
        assert!(request.tool_names().contains(&"upsert_sketch"));

        assert_eq!(request.messages[0].role, ChatRole::System);
        assert!(request.messages[0].text_content().contains("upsert_sketch"));
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert_eq!(
            request.messages[1].text_content(),
            r#"Here is the part history. This is always the latest and greatest: {"features":[]}"#
        );
        assert_eq!(request.messages[2].text_content(), "make a cube");
        assert_eq!(request.messages.len(), 3);
    }

    // ====================================================================================
    // TOOL EXECUTION
    // ====================================================================================

    #[tokio::test]
    async fn test_second_call_sees_feature_created_by_first() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![
                call("call-1", "P_CU", json!({"sizeX": "20"})),
                call(
                    "call-2",
                    "modify_feature",
                    json!({"featureId": "P.CU1", "params": {"sizeX": 40}}),
                ),
            ]))
            .then(text("Done."));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        let outcome = orch.send_user_message("cube, then make it wider").await;

        assert_eq!(outcome, TurnOutcome::Completed { followups: 1 });
        let cube = orch.document().feature("P.CU1").expect("cube created");
        assert_eq!(cube.input_params["sizeX"], json!(40));

        let followup = &model.requests()[1];
        let tail = &followup.messages[followup.messages.len() - 3..];
        assert_eq!(tail[0].role, ChatRole::Assistant);
        let ids: Vec<&str> = tail[0]
            .tool_calls
            .iter()
            .flatten()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["call-1", "call-2"]);
        assert_eq!(tail[1].tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(parse(&tail[1].text_content())["featureId"], "P.CU1");
        assert_eq!(tail[2].tool_call_id.as_deref(), Some("call-2"));
        assert_eq!(parse(&tail[2].text_content())["params"], json!({"sizeX": 40}));

        let roles: Vec<Role> = orch.messages().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_failed_tool_does_not_abort_batch() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![
                call("call-1", "delete_feature", json!({"featureId": "E9"})),
                call("call-2", "P_CU", json!({})),
            ]))
            .then(text("Created a cube."));
        let mut orch = orchestrator(model, RecordingPrompt::default());
        let mut rx = orch.subscribe();

        let outcome = orch.send_user_message("delete E9 and add a cube").await;

        assert_eq!(outcome, TurnOutcome::Completed { followups: 1 });
        let entries = orch.messages().messages();
        let failure = parse(entries[2].text());
        assert_eq!(failure["ok"], false);
        assert_eq!(failure["tool"], "delete_feature");
        assert_eq!(failure["args"], r#"{"featureId":"E9"}"#);
        assert_eq!(failure["error"], "Feature with ID 'E9' not found");
        assert_eq!(parse(entries[3].text())["ok"], true);
        assert_eq!(orch.document().features().len(), 1);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| e.event_type == EVENT_TOOL_CALL_FAILED
            && e.payload["call_id"] == "call-1"));
        assert!(events.iter().any(|e| e.event_type == EVENT_AGENT_NOTICE
            && e.payload["text"]
                == "Sorry, there was an error executing the tool: Feature with ID 'E9' not found"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![call("call-1", "LOFT", json!({}))]))
            .then(text("That tool does not exist."));
        let mut orch = orchestrator(model, RecordingPrompt::default());

        orch.send_user_message("loft it").await;

        let result = parse(orch.messages().messages()[2].text());
        assert_eq!(result["error"], "Unknown tool: LOFT");
    }

    #[tokio::test]
    async fn test_screenshot_projection_follows_image_capability() {
        for (model_id, expects_image) in [("gpt-4o", true), ("llama-3.3-70b", false)] {
            let model = ScriptedModel::new(model_id)
                .then(tool_calls(vec![call("call-1", "dump_screenshot", json!({}))]))
                .then(text("Looks good."));
            let history = InMemoryPartHistory::new(demo_registry()).with_screenshot(vec![1, 2, 3]);
            let mut orch = orchestrator_with(
                test_config(Some(TEST_API_KEY)),
                model.clone(),
                history,
                RecordingPrompt::default(),
            );

            orch.send_user_message("show me").await;

            let followup = &model.requests()[1];
            let image_message = &followup.messages[3];
            assert_eq!(image_message.role, ChatRole::User);
            let has_image = matches!(
                &image_message.content,
                Some(MessageContent::Parts(parts))
                    if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. }))
            );
            assert_eq!(has_image, expects_image, "model {model_id}");
            assert_eq!(image_message.text_content(), "CAD Screenshot");
            assert_eq!(followup.messages[4].role, ChatRole::Assistant);
        }
    }

    // ====================================================================================
    // DEPTH CEILING
    // ====================================================================================

    #[tokio::test]
    async fn test_depth_ceiling_stops_after_eight_followups() {
        let model = ScriptedModel::new("gpt-4o-mini").repeating(tool_calls(vec![call(
            "call-1",
            "dump_part_history",
            json!({}),
        )]));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        let outcome = orch.send_user_message("keep going").await;

        assert_eq!(outcome, TurnOutcome::DepthLimited);
        assert_eq!(model.requests().len(), 1 + MAX_FOLLOWUP_ROUNDS);
        let tool_results = orch
            .messages()
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .count();
        assert_eq!(tool_results, MAX_FOLLOWUP_ROUNDS);
        assert_eq!(last_text(orch.messages()), DEPTH_LIMIT_TEXT);
    }

    // ====================================================================================
    // COMPACT RETRY
    // ====================================================================================

    #[tokio::test]
    async fn test_compact_retry_then_success() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(generation_error(None))
            .then(text("Fillet added."));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());
        let mut rx = orch.subscribe();

        let outcome = orch.send_user_message("add a fillet to the edges").await;

        assert_eq!(outcome, TurnOutcome::Completed { followups: 0 });
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tool_names()[0], "F");
        assert_eq!(requests[1].tool_names()[0], "S");
        assert_eq!(requests[0].messages, requests[1].messages);

        let notice = drain(&mut rx)
            .into_iter()
            .find(|e| e.event_type == EVENT_AGENT_NOTICE)
            .expect("retry notice");
        assert_eq!(
            notice.payload["text"],
            "Tool-calling failed with model output formatting. Retrying with a compact toolset (15 tools)..."
        );
        assert_eq!(orch.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_second_format_failure_is_surfaced() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(generation_error(None))
            .then(generation_error(None));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        let outcome = orch.send_user_message("extrude it").await;

        assert_eq!(outcome, TurnOutcome::ToolCallFormatFailed);
        assert_eq!(model.requests().len(), 2);
        assert_eq!(
            last_text(orch.messages()),
            "Tool-calling failed (400). Failed to call a function. Please adjust your prompt."
        );
    }

    #[tokio::test]
    async fn test_three_format_failures_still_retry_once() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(generation_error(Some("first")))
            .then(generation_error(Some("<function=E>{bad}</function>")))
            .then(generation_error(Some("third")));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        let outcome = orch.send_user_message("extrude it").await;

        assert_eq!(outcome, TurnOutcome::ToolCallFormatFailed);
        assert_eq!(model.requests().len(), 2);
        assert_eq!(
            last_text(orch.messages()),
            "Tool-calling failed (400). failed_generation: <function=E>{bad}</function>"
        );
    }

    #[tokio::test]
    async fn test_compact_toolset_kept_for_rest_of_turn() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(generation_error(None))
            .then(tool_calls(vec![call("call-1", "dump_part_history", json!({}))]))
            .then(text("Empty part."));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        orch.send_user_message("add a fillet").await;

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].tool_names(), requests[1].tool_names());
    }

    #[tokio::test]
    async fn test_retry_budget_resets_each_turn() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(generation_error(None))
            .then(text("first"))
            .then(generation_error(None))
            .then(text("second"));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        assert_eq!(
            orch.send_user_message("one").await,
            TurnOutcome::Completed { followups: 0 }
        );
        assert_eq!(
            orch.send_user_message("two").await,
            TurnOutcome::Completed { followups: 0 }
        );
        assert_eq!(model.requests().len(), 4);
    }

    // ====================================================================================
    // CREDENTIALS AND FAILURES
    // ====================================================================================

    #[tokio::test]
    async fn test_auth_failure_invalidates_credential_and_reprompts() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(Err(ModelError::Auth("invalid api key".to_string())))
            .then(text("Welcome back."));
        let prompt = RecordingPrompt::answering(&[Some("  sk-new  ")]);
        let mut orch = orchestrator(model.clone(), prompt.clone());

        let outcome = orch.send_user_message("hello").await;
        assert_eq!(outcome, TurnOutcome::AuthFailed);
        assert_eq!(last_text(orch.messages()), AUTH_FAILED_TEXT);
        assert!(!orch.has_credential());
        assert_eq!(prompt.calls(), 0);

        let outcome = orch.send_user_message("hello again").await;
        assert_eq!(outcome, TurnOutcome::Completed { followups: 0 });
        assert_eq!(prompt.calls(), 1);
        assert_eq!(
            model.api_keys(),
            vec![TEST_API_KEY.to_string(), "sk-new".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancelled_prompt_skips_the_turn() {
        let model = ScriptedModel::new("gpt-4o-mini").then(text("unused"));
        let prompt = RecordingPrompt::answering(&[None]);
        let mut orch = orchestrator_with(
            test_config(None),
            model.clone(),
            InMemoryPartHistory::new(demo_registry()),
            prompt.clone(),
        );

        let outcome = orch.send_user_message("hello").await;

        assert_eq!(outcome, TurnOutcome::CredentialMissing);
        assert_eq!(prompt.calls(), 1);
        assert!(model.requests().is_empty());
        assert_eq!(orch.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_set_api_key_replaces_credential() {
        let model = ScriptedModel::new("gpt-4o-mini").then(text("ok"));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        assert!(orch.set_api_key(" sk-other "));
        orch.send_user_message("hi").await;

        assert_eq!(model.api_keys(), vec!["sk-other".to_string()]);
    }

    #[tokio::test]
    async fn test_initial_request_error_uses_generic_text() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(Err(ModelError::InvalidResponse("no choices".to_string())));
        let mut orch = orchestrator(model, RecordingPrompt::default());

        assert_eq!(orch.send_user_message("hi").await, TurnOutcome::Failed);
        assert_eq!(last_text(orch.messages()), GENERIC_FAILURE_TEXT);
        assert!(orch.has_credential());
    }

    #[tokio::test]
    async fn test_followup_error_reports_cause() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![call("call-1", "dump_part_history", json!({}))]))
            .then(Err(ModelError::Request("connection reset".to_string())));
        let mut orch = orchestrator(model, RecordingPrompt::default());

        assert_eq!(orch.send_user_message("what is there?").await, TurnOutcome::Failed);
        assert_eq!(
            last_text(orch.messages()),
            "Failed to complete after tool calls: request failed: connection reset"
        );
    }

    // ====================================================================================
    // HISTORY MANAGEMENT
    // ====================================================================================

    #[tokio::test]
    async fn test_deleting_tool_call_entry_is_flagged_as_orphan() {
        let model = ScriptedModel::new("gpt-4o-mini")
            .then(tool_calls(vec![call("call-1", "dump_part_history", json!({}))]))
            .then(text("Nothing yet."))
            .then(text("Sure."));
        let mut orch = orchestrator(model.clone(), RecordingPrompt::default());

        orch.send_user_message("what is there?").await;
        let assistant_id = orch.messages().messages()[1].id;
        assert!(orch.delete_message(assistant_id));

        let mut rx = orch.subscribe();
        orch.send_user_message("thanks").await;

        let orphan = drain(&mut rx)
            .into_iter()
            .find(|e| e.event_type == EVENT_ORPHAN_TOOL_MESSAGES)
            .expect("orphan event");
        assert_eq!(
            orphan.payload["issues"],
            json!([{"index": 3, "tool_call_id": "call-1"}])
        );
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_reset_and_delete_emit_events() {
        let model = ScriptedModel::new("gpt-4o-mini").then(text("Hello!"));
        let mut orch = orchestrator(model, RecordingPrompt::default());
        orch.send_user_message("hi").await;
        let mut rx = orch.subscribe();

        assert!(orch.delete_message(1));
        assert!(!orch.delete_message(1));
        orch.reset_conversation();

        let types: Vec<String> = drain(&mut rx).into_iter().map(|e| e.event_type).collect();
        assert_eq!(types[0], EVENT_MESSAGE_DELETED);
        assert_eq!(types[1], EVENT_CONVERSATION_RESET);
        let entries = orch.messages().messages();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[0].text(), RESET_WELCOME_TEXT);
    }

    // ====================================================================================
    // REQUEST DIAGNOSTICS
    // ====================================================================================

    #[test]
    fn test_orphan_scan_matches_each_call_once() {
        let messages = vec![
            ChatMessage::text(ChatRole::User, "hi"),
            ChatMessage::assistant_tool_calls("", vec![call("a", "P_CU", json!({}))]),
            ChatMessage::tool_result("a", "{}"),
            ChatMessage::tool_result("a", "{}"),
            ChatMessage::tool_result("", "{}"),
        ];

        let orphans = find_orphan_tool_messages(&messages);

        let found: Vec<(usize, Option<&str>)> = orphans
            .iter()
            .map(|o| (o.index, o.tool_call_id.as_deref()))
            .collect();
        assert_eq!(found, vec![(3, Some("a")), (4, None)]);
    }

    #[test]
    fn test_preview_text_truncates_on_char_boundary() {
        assert_eq!(preview_text("short"), "short");
        let long = "é".repeat(300);
        let preview = preview_text(&long);
        assert_eq!(preview.chars().count(), 243);
        assert!(preview.ends_with("é..."));
    }
}
