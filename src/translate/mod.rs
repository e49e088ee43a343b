//! API translation between the Anthropic and chat-completion formats.
//!
//! The core of the bridge: converts requests, classifies upstream responses,
//! and assembles Anthropic responses. All functions here are pure (no I/O).

pub mod anthropic_types;
pub mod classify;
pub mod openai_types;
pub mod request;
pub mod response;
