//! Classify a raw chat-completion response.
//!
//! Providers disagree on how tool calls come back: modern servers send a
//! `tool_calls` array, older ones a single `function_call` (or `tool`) object,
//! and some send both while migrating. The checks below run in a fixed order
//! and the first match wins:
//!
//! 1. a top-level `error` makes the whole response a provider error,
//! 2. a non-empty `tool_calls` array,
//! 3. a legacy `function_call` / `tool` object,
//! 4. plain text.

use serde_json::{Map, Value};

use super::anthropic_types::{ToolInput, Usage};
use super::response::Reply;
use crate::providers::ToolConvention;

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    ProviderError(ProviderFault),
    ToolCalls {
        convention: ToolConvention,
        calls: Vec<ToolInvocation>,
    },
    Text(String),
}

/// Diagnostic fields of an upstream `error` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFault {
    pub code: Option<String>,
    pub error_type: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// `None` when the provider did not assign one.
    pub id: Option<String>,
    pub name: String,
    pub input: ToolInput,
}

impl Classification {
    /// Short name of the branch taken, for the debug log.
    #[must_use]
    pub fn decision(&self) -> &'static str {
        match self {
            Classification::ProviderError(_) => "provider_error",
            Classification::ToolCalls {
                convention: ToolConvention::Modern,
                ..
            } => "modern_tool_calls",
            Classification::ToolCalls {
                convention: ToolConvention::Legacy,
                ..
            } => "legacy_function_call",
            Classification::Text(_) => "text",
        }
    }

    /// Split off provider errors from replies that can be assembled.
    pub fn into_reply(self) -> Result<Reply, ProviderFault> {
        match self {
            Classification::ProviderError(fault) => Err(fault),
            Classification::ToolCalls { calls, .. } => Ok(Reply::ToolCalls(calls)),
            Classification::Text(text) => Ok(Reply::Text(text)),
        }
    }
}

pub fn classify(body: &Value) -> Classification {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Classification::ProviderError(provider_fault(err));
    }

    let message = &body["choices"][0]["message"];

    if let Some(calls) = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .filter(|calls| !calls.is_empty())
    {
        return Classification::ToolCalls {
            convention: ToolConvention::Modern,
            calls: calls.iter().map(modern_invocation).collect(),
        };
    }

    if let Some(call) = ["function_call", "tool"]
        .iter()
        .find_map(|key| message.get(*key).and_then(Value::as_object))
    {
        return Classification::ToolCalls {
            convention: ToolConvention::Legacy,
            calls: vec![legacy_invocation(call)],
        };
    }

    Classification::Text(
        message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    )
}

/// Token counts from `usage`; anything missing or non-numeric counts as zero.
pub fn usage(body: &Value) -> Usage {
    let usage = &body["usage"];
    Usage {
        input_tokens: token_count(&usage["prompt_tokens"]),
        output_tokens: token_count(&usage["completion_tokens"]),
    }
}

/// Decode string-encoded tool arguments. Anything that is not a JSON object
/// yields an empty input rather than failing the response.
pub fn decode_arguments(arguments: &Value) -> ToolInput {
    match arguments {
        Value::Object(map) => map.clone(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => ToolInput::new(),
        },
        _ => ToolInput::new(),
    }
}

fn provider_fault(err: &Value) -> ProviderFault {
    let Some(obj) = err.as_object() else {
        return ProviderFault {
            code: None,
            error_type: None,
            message: scalar_text(err),
        };
    };

    ProviderFault {
        code: obj.get("code").filter(|v| !v.is_null()).map(scalar_text),
        error_type: obj.get("type").filter(|v| !v.is_null()).map(scalar_text),
        message: obj
            .get("message")
            .map_or_else(|| err.to_string(), scalar_text),
    }
}

fn modern_invocation(call: &Value) -> ToolInvocation {
    let function = &call["function"];
    ToolInvocation {
        id: call
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        name: function["name"].as_str().unwrap_or_default().to_string(),
        input: decode_arguments(&function["arguments"]),
    }
}

// Legacy calls sometimes nest the function like a modern entry does.
fn legacy_invocation(call: &Map<String, Value>) -> ToolInvocation {
    let function = call
        .get("function")
        .and_then(Value::as_object)
        .unwrap_or(call);
    ToolInvocation {
        id: call
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        name: function
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        input: function
            .get("arguments")
            .map(decode_arguments)
            .unwrap_or_default(),
    }
}

fn token_count(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .unwrap_or(0)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
