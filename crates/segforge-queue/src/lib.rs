//! Pipeline state machine: pure next-action derivation over project/segment
//! state, plus the tolerant JSON extraction the Job Engine uses to parse
//! segment-generation replies. No I/O, no queue transport — the actual job
//! queue is the `jobs` table in `segforge-db`, consumed by
//! `segforge-worker`'s poll loop.

pub mod error;
pub mod json;
pub mod statemachine;

pub use error::QueueError;
pub use json::extract_json;
pub use statemachine::{derive_next_action, has_running_job};
