//! The relational Data Store: a single sqlite database accessed through
//! sqlx, migrated at startup, and wrapped in one repository module per
//! entity. Replaces the teacher's empty `vclip-firestore` stub — there is
//! no document database in this design, just sqlite behind a connection
//! pool shared by the HTTP surface and the job engine.

pub mod credentials;
pub mod error;
pub mod invites;
pub mod jobs;
pub mod otp;
pub mod pool;
pub mod projects;
pub mod ratelimit;
mod row;
pub mod segments;
pub mod sessions;

pub use error::{DbError, DbResult};
pub use pool::connect;

#[cfg(any(test, feature = "test-util"))]
pub use pool::connect_in_memory;
