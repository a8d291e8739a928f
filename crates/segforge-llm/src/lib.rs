//! LLM Adapters: black-box text and multimodal chat calls consumed by the
//! Job Engine's handlers (`full_script`, `segment_generate`, `analyze`).
//!
//! The wire format and model identity are out of scope for this crate —
//! `LlmClient` is a contract (`text_chat`/`image_chat`), not a specific
//! vendor SDK. `HttpLlmClient` is one conforming implementation; tests and
//! handler unit tests may substitute any other `LlmClient`.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpLlmClient, LlmClient, LlmClientConfig};
pub use error::{LlmError, LlmResult};
