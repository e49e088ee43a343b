//! Translate Anthropic Messages API requests into chat-completion payloads.
//!
//! A single Anthropic message can expand into several outbound messages: the
//! text and tool calls of a block list fold into one message, and every
//! `tool_result` block becomes its own `tool`-role message after it.

use serde_json::Value;

use super::anthropic_types::{ContentBlock, Message, MessageContent, MessagesRequest, Tool};
use super::openai_types::{
    ChatCompletionRequest, ChatFunction, ChatMessage, ChatTool, ChatToolCall,
    ChatToolCallFunction, ToolBinding,
};
use crate::providers::{Provider, ToolConvention};

/// Server-side limits and defaults the translation needs.
#[derive(Debug, Clone, Copy)]
pub struct TranslateOptions<'a> {
    pub default_model: &'a str,
    pub max_tokens_ceiling: u64,
}

/// Translate an inbound request into the payload for `provider`.
/// Pure function: no I/O, no randomness.
pub fn anthropic_to_openai(
    req: &MessagesRequest,
    provider: Provider,
    opts: TranslateOptions<'_>,
) -> ChatCompletionRequest {
    let model = if req.model.is_empty() {
        opts.default_model.to_string()
    } else {
        req.model.clone()
    };

    let mut messages = Vec::new();
    if let Some(ref system) = req.system {
        messages.push(ChatMessage::text("system", system.as_text()));
    }
    messages.extend(translate_messages(&req.messages));

    let tooling = req.tools.as_deref().and_then(|tools| {
        translate_tools(tools, req.tool_choice.as_ref(), provider.tool_convention())
    });

    ChatCompletionRequest {
        model,
        messages,
        temperature: req.temperature,
        max_tokens: effective_max_tokens(opts.max_tokens_ceiling, req.max_tokens),
        tooling,
    }
}

/// A requested limit only applies when it is below the server ceiling.
#[must_use]
pub fn effective_max_tokens(ceiling: u64, requested: Option<u64>) -> u64 {
    requested.map_or(ceiling, |r| r.min(ceiling))
}

pub fn translate_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages.iter().flat_map(translate_message).collect()
}

fn translate_message(msg: &Message) -> Vec<ChatMessage> {
    let role = msg.role.as_str();
    let blocks = match msg.content {
        MessageContent::Text(ref text) => return vec![ChatMessage::text(role, text.as_str())],
        MessageContent::Blocks(ref blocks) => blocks,
    };

    let mut text = String::new();
    let mut tool_calls: Vec<ChatToolCall> = Vec::new();
    let mut tool_results: Vec<ChatMessage> = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ChatToolCall {
                    id: id.clone(),
                    call_type: "function".to_string(),
                    function: ChatToolCallFunction {
                        name: name.clone(),
                        arguments: Value::Object(input.clone()).to_string(),
                    },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                tool_results.push(ChatMessage {
                    role: "tool".to_string(),
                    content: content.clone(),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id.clone()),
                });
            }
            ContentBlock::Unsupported => {}
        }
    }

    let mut out = Vec::with_capacity(tool_results.len() + 1);
    if !text.is_empty() || !tool_calls.is_empty() {
        out.push(ChatMessage {
            role: role.to_string(),
            content: Value::String(text),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        });
    }
    out.append(&mut tool_results);
    out
}

/// Declare `tools` in the provider's convention. The caller's tool-choice
/// directive is passed through untouched; without one the model decides.
pub fn translate_tools(
    tools: &[Tool],
    tool_choice: Option<&Value>,
    convention: ToolConvention,
) -> Option<ToolBinding> {
    if tools.is_empty() {
        return None;
    }

    let choice = tool_choice
        .cloned()
        .unwrap_or_else(|| Value::String("auto".to_string()));
    let functions = tools.iter().map(|t| ChatFunction {
        name: t.name.clone(),
        description: t.description.clone(),
        parameters: t.input_schema.clone(),
    });

    Some(match convention {
        ToolConvention::Legacy => ToolBinding::Legacy {
            functions: functions.collect(),
            function_call: choice,
        },
        ToolConvention::Modern => ToolBinding::Modern {
            tools: functions
                .map(|function| ChatTool {
                    tool_type: "function".to_string(),
                    function,
                })
                .collect(),
            tool_choice: choice,
        },
    })
}
