//! Project filesystem layout and the canon context store.
//!
//! This crate replaces the teacher's Cloudflare R2 client: the production
//! pipeline's durable artifacts (scripts, segment text exports, last frames,
//! the final assembly) live on a local filesystem tree rather than an object
//! store, per SPEC_FULL.md §4.1.

pub mod canon;
pub mod error;
pub mod layout;

pub use canon::{
    append, before_index, canon_recent, compact_description, extract_marker_line, parse_idx,
    replace_by_index, CANON_SUMMARY_MARKER, MUSIC_STATE_MARKER,
};
pub use error::{StorageError, StorageResult};
pub use layout::ProjectLayout;
