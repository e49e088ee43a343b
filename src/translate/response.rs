use uuid::Uuid;

use super::anthropic_types::{MessagesResponse, ResponseContentBlock, StopReason, Usage};
use super::classify::ToolInvocation;

/// What the upstream produced, once provider errors have been ruled out.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    ToolCalls(Vec<ToolInvocation>),
    Text(String),
}

/// Build the Anthropic response envelope. `model` is what the client
/// originally asked for.
pub fn openai_to_anthropic(reply: Reply, model: &str, usage: Usage) -> MessagesResponse {
    let (content, stop_reason) = match reply {
        Reply::ToolCalls(calls) => (
            calls
                .into_iter()
                .map(|call| ResponseContentBlock::ToolUse {
                    id: call.id.unwrap_or_else(|| generate_id("toolu_")),
                    name: call.name,
                    input: call.input,
                })
                .collect(),
            StopReason::ToolUse,
        ),
        // Always one text block, even when empty.
        Reply::Text(text) => (vec![ResponseContentBlock::Text { text }], StopReason::EndTurn),
    };

    MessagesResponse {
        id: generate_id("msg_"),
        response_type: "message".to_string(),
        role: "assistant".to_string(),
        content,
        model: model.to_string(),
        stop_reason,
        stop_sequence: None,
        usage,
    }
}

fn generate_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &uuid[..12])
}
