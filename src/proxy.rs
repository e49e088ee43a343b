//! End-to-end handling of one `/v1/messages` call.
//!
//! Each call moves through the stages of [`Stage`] exactly once. A body that
//! does not decode stops before translation and is never audited; anything
//! that fails after the upstream call has been attempted is still audited.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::audit::AuditRecord;
use crate::error::{BridgeError, Result};
use crate::server::AppState;
use crate::translate::anthropic_types::{MessagesRequest, MessagesResponse};
use crate::translate::classify::{self, classify};
use crate::translate::request::{anthropic_to_openai, TranslateOptions};
use crate::translate::response::openai_to_anthropic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Translated,
    Dispatched,
    Classified,
    Assembled,
    Logged,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Translated => "translated",
            Stage::Dispatched => "dispatched",
            Stage::Classified => "classified",
            Stage::Assembled => "assembled",
            Stage::Logged => "logged",
        };
        f.write_str(name)
    }
}

/// Translate `body`, forward it upstream and build the Anthropic response.
///
/// Once translated, the upstream exchange and its audit record run on their
/// own task. Dropping the returned future (a client disconnect) abandons
/// only the reply; the upstream call still completes and is still audited.
pub async fn proxy_messages(state: Arc<AppState>, body: &[u8]) -> Result<MessagesResponse> {
    debug!(stage = %Stage::Received, bytes = body.len());

    let req: MessagesRequest =
        serde_json::from_slice(body).map_err(|e| BridgeError::bad_request(e.to_string()))?;

    let payload = anthropic_to_openai(
        &req,
        state.provider,
        TranslateOptions {
            default_model: &state.config.model,
            max_tokens_ceiling: state.config.max_tokens,
        },
    );
    let payload_json = serde_json::to_vec(&payload)?;

    info!(
        provider = %state.provider,
        model = %payload.model,
        messages = payload.messages.len(),
        max_tokens = payload.max_tokens,
        "POST {}",
        state.upstream.endpoint()
    );
    debug!(stage = %Stage::Translated);
    if state.config.debug {
        debug!(payload = %String::from_utf8_lossy(&payload_json), "Outbound payload");
    }

    let mut record = AuditRecord::new(
        state.upstream.base_url(),
        state.upstream.endpoint(),
        payload.model.as_str(),
        String::from_utf8_lossy(&payload_json).into_owned(),
    );
    let model = payload.model;

    let dispatch = tokio::spawn(async move {
        let result = exchange(&state, Bytes::from(payload_json), &model, &mut record).await;
        if let Err(ref e) = result {
            record.error_message = e.to_string();
        }

        // Detached: the caller's response never waits on the audit store.
        drop(state.audit.submit(record));
        debug!(stage = %Stage::Logged);

        result
    });

    dispatch.await?
}

async fn exchange(
    state: &AppState,
    payload: Bytes,
    model: &str,
    record: &mut AuditRecord,
) -> Result<MessagesResponse> {
    let reply = state.upstream.send(payload).await?;
    record.status_code = reply.status;
    record.response = String::from_utf8_lossy(&reply.body).into_owned();

    debug!(stage = %Stage::Dispatched, status = reply.status, body_len = reply.body.len());
    if state.config.debug {
        debug!(body = %record.response, "Upstream response");
    }

    let body: serde_json::Value = serde_json::from_slice(&reply.body).map_err(|e| {
        BridgeError::malformed_upstream(format!(
            "status {}: {}: {}",
            reply.status,
            e,
            truncate(&record.response, 300)
        ))
    })?;

    let usage = classify::usage(&body);
    record.prompt_tokens = usage.input_tokens;
    record.completion_tokens = usage.output_tokens;

    let classification = classify(&body);
    debug!(stage = %Stage::Classified, decision = classification.decision());

    let reply_content = classification.into_reply().map_err(|fault| {
        error!(
            code = ?fault.code,
            error_type = ?fault.error_type,
            upstream_message = %fault.message,
            "Upstream API error"
        );
        BridgeError::Provider {
            code: fault.code,
            error_type: fault.error_type,
            message: fault.message,
        }
    })?;

    // A failing status without an `error` object is still a failure.
    if !(200..300).contains(&reply.status) {
        error!(status = reply.status, "Upstream returned an error status");
        return Err(BridgeError::Provider {
            code: Some(reply.status.to_string()),
            error_type: None,
            message: format!(
                "upstream returned status {}: {}",
                reply.status,
                truncate(&record.response, 300)
            ),
        });
    }

    let response = openai_to_anthropic(reply_content, model, usage);
    debug!(stage = %Stage::Assembled, stop_reason = ?response.stop_reason);

    info!(
        "Completed: in={} out={} tokens",
        response.usage.input_tokens, response.usage.output_tokens
    );

    Ok(response)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
