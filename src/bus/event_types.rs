//! Event category and type constants.

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub const CATEGORY_CONVERSATION: &str = "conversation";
pub const CATEGORY_TOOL: &str = "tool";
pub const CATEGORY_AGENT: &str = "agent";

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const EVENT_MESSAGE_APPENDED: &str = "conversation.message_appended";
pub const EVENT_MESSAGE_DELETED: &str = "conversation.message_deleted";
pub const EVENT_CONVERSATION_RESET: &str = "conversation.reset";

pub const EVENT_TOOL_CALL_STARTED: &str = "tool.call_started";
pub const EVENT_TOOL_CALL_FINISHED: &str = "tool.call_finished";
pub const EVENT_TOOL_CALL_FAILED: &str = "tool.call_failed";

pub const EVENT_AGENT_NOTICE: &str = "agent.notice";
pub const EVENT_ORPHAN_TOOL_MESSAGES: &str = "agent.orphan_tool_messages";
