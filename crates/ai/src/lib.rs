//! AI fallback for messages the rule table does not recognise.
//!
//! Blocking HTTP. The reply is untrusted: [`parse_reply`] validates it into a
//! [`mcfdesk_recon::Reply`] before anything can act on it.

mod client;
mod prompt;

pub use client::{AskError, Assistant, GEMINI_API_BASE, OPENAI_API_BASE};
pub use prompt::{build_prompt, build_system_prompt, parse_reply, SAMPLE_LIMIT};
