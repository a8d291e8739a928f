//! Error type for the state machine's tolerant JSON extraction.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no JSON object could be extracted from model output")]
    NoJsonFound,
}
