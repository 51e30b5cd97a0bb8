//! Escapade — PostgreSQL stores.
//!
//! Implements the story graph and player progress contracts from
//! `escapade-core` on top of `sqlx`. The schema lives in the workspace
//! `migrations/` directory.

pub mod pg_progress_repository;
pub mod pg_story_graph_repository;
pub mod schema;

use escapade_core::error::EngineError;

pub use pg_progress_repository::PgProgressRepository;
pub use pg_story_graph_repository::PgStoryGraphRepository;

/// Maps a driver error onto the engine taxonomy.
pub(crate) fn infrastructure(err: &sqlx::Error) -> EngineError {
    EngineError::Infrastructure(err.to_string())
}

/// Returns `true` if the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
