//! Store contracts consumed by the conversation engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Choice, PlayerProgress, Project, Scene};

/// Read-only access to the authored story graph.
#[async_trait]
pub trait StoryGraphRepository: Send + Sync {
    /// Load a scene.
    ///
    /// Returns `EngineError::SceneNotFound` if the scene does not exist.
    async fn get_scene(&self, scene_id: Uuid) -> Result<Scene, EngineError>;

    /// Load a project by id.
    ///
    /// Returns `EngineError::ProjectNotFound` if the project does not exist.
    async fn get_project(&self, project_id: Uuid) -> Result<Project, EngineError>;

    /// Load a project by its join slug.
    ///
    /// Returns `EngineError::ProjectNotFound` if no project has the slug.
    async fn get_project_by_slug(&self, slug: &str) -> Result<Project, EngineError>;

    /// Choices of a scene in ascending `order`.
    async fn get_choices(&self, scene_id: Uuid) -> Result<Vec<Choice>, EngineError>;
}

/// Mutable player progress, one record per (phone number, project).
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Progress of `phone_number` in `project_id`, with collected items.
    async fn find(
        &self,
        phone_number: &str,
        project_id: Uuid,
    ) -> Result<Option<PlayerProgress>, EngineError>;

    /// The most recently active progress of `phone_number` in any project.
    async fn find_active(&self, phone_number: &str) -> Result<Option<PlayerProgress>, EngineError>;

    /// Insert a new record. Creations for one phone number are serialized
    /// so a sender never holds progress in two projects.
    ///
    /// Returns `EngineError::ProgressAlreadyExists` if the (phone, project)
    /// pair is taken and `EngineError::SessionConflict` if the phone number
    /// has progress in another project.
    async fn create(&self, progress: &PlayerProgress) -> Result<(), EngineError>;

    /// Persist scene, attempts, interaction time and any new collected items
    /// in one transaction. `progress.version` is the version the caller
    /// loaded; the new version is returned.
    ///
    /// Returns `EngineError::ConcurrencyConflict` if the stored version moved
    /// or the record was deleted.
    async fn save(&self, progress: &PlayerProgress) -> Result<i64, EngineError>;

    /// Delete a record and its collected items. Deleting a missing record is
    /// not an error.
    async fn delete(&self, progress_id: Uuid) -> Result<(), EngineError>;

    /// Add an item to a collection outside of a turn. Returns `false` when
    /// the item was already collected.
    ///
    /// The engine grants items through [`save`](Self::save), which commits
    /// the grant together with the scene move.
    async fn attach_item(
        &self,
        progress_id: Uuid,
        item_id: Uuid,
        collected_at: DateTime<Utc>,
    ) -> Result<bool, EngineError>;
}
