//! Engine error taxonomy.

use thiserror::Error;
use uuid::Uuid;

/// Every failure the conversation engine and its stores can report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No project matches the requested slug or id.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// A scene referenced by progress or by an edge does not exist.
    #[error("scene not found: {0}")]
    SceneNotFound(Uuid),

    /// The sender has no progress and did not send a join or restart command.
    #[error("no active session for {phone_number}")]
    NoActiveSession {
        /// The sender that has no progress.
        phone_number: String,
    },

    /// The sender already plays another project.
    #[error("{phone_number} already has progress in project {active_project_id}, cannot start {requested_project_id}")]
    SessionConflict {
        /// The sender.
        phone_number: String,
        /// The project the sender is currently playing.
        active_project_id: Uuid,
        /// The project the sender asked for.
        requested_project_id: Uuid,
    },

    /// A stored scene carries a type outside the closed set.
    #[error("invalid scene type {scene_type:?} on scene {scene_id}")]
    InvalidSceneType {
        /// The offending scene.
        scene_id: Uuid,
        /// The raw type value.
        scene_type: String,
    },

    /// A scene references media whose extension is not allowed.
    #[error("unsupported media format: {0}")]
    UnsupportedMediaFormat(String),

    /// The outbound reply could not be produced.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Optimistic concurrency conflict on a progress record.
    #[error("concurrency conflict on progress {progress_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The progress record that had the conflict.
        progress_id: Uuid,
        /// The version the writer loaded.
        expected: i64,
        /// The version found in the store, `-1` if the record is gone.
        actual: i64,
    },

    /// A progress record for the (phone, project) pair already exists.
    #[error("progress already exists for {phone_number} in project {project_id}")]
    ProgressAlreadyExists {
        /// The sender.
        phone_number: String,
        /// The project.
        project_id: Uuid,
    },

    /// The inbound request is unusable (for example, no sender).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl EngineError {
    /// Returns `true` for errors caused by broken story data rather than by
    /// the player or the infrastructure.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::SceneNotFound(_) | Self::InvalidSceneType { .. } | Self::UnsupportedMediaFormat(_)
        )
    }

    /// Returns `true` when re-running the request against fresh state may
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::ProgressAlreadyExists { .. }
        )
    }
}
