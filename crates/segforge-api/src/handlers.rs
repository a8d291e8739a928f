//! Request handlers, grouped by the resource they serve.

pub mod auth;
pub mod full_script;
pub mod health;
pub mod jobs;
pub mod projects;
pub mod segments;

pub(crate) mod dto;
