//! Caption enrichment through an OpenAI-compatible chat-completions API.

pub mod client;
pub mod error;
pub mod prompt;

pub use client::OpenAiGateway;
pub use error::AiError;
pub use prompt::{build_prompt, extract_json_object, parse_reply};
