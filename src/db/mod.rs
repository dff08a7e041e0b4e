//! Database module: entity models and SQL repositories.
//!
//! Split into two submodules:
//! - `model`: view models returned by repository queries.
//! - `repo`: SQL-only functions that map rows into those models.
//!
//! External modules import from `pawmeet_jobs::db` — the repository API and
//! the view models the engine consumes are re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{DueEmailJob, ReengagementCandidate};
