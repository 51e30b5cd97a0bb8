//! Query handlers for the conversation engine.
//!
//! Read-only views over player progress, used by operators to inspect where
//! a player is stuck.

use chrono::{DateTime, Utc};
use escapade_core::error::EngineError;
use escapade_core::model::CollectedItem;
use escapade_core::repository::{ProgressRepository, StoryGraphRepository};
use serde::Serialize;
use uuid::Uuid;

/// Read-only view of a player's progress in one project.
#[derive(Debug, Serialize)]
pub struct ProgressView {
    /// The progress identifier.
    pub progress_id: Uuid,
    /// The player.
    pub phone_number: String,
    /// The project being played.
    pub project_id: Uuid,
    /// The current scene.
    pub current_scene_id: Uuid,
    /// Author-facing title of the current scene.
    pub current_scene_title: String,
    /// Type of the current scene.
    pub current_scene_type: &'static str,
    /// Puzzle attempts left.
    pub attempts_remaining: u32,
    /// Items in collection order.
    pub collected_items: Vec<CollectedItem>,
    /// Time of the last inbound message.
    pub last_interaction_at: DateTime<Utc>,
    /// Optimistic concurrency token.
    pub version: i64,
}

/// Retrieves the progress of `phone_number` in `project_id`.
///
/// # Errors
///
/// Returns `EngineError::NoActiveSession` if the player has no progress in
/// the project and `EngineError::SceneNotFound` if it points at a missing
/// scene.
pub async fn get_progress(
    phone_number: &str,
    project_id: Uuid,
    progress_repo: &dyn ProgressRepository,
    graph: &dyn StoryGraphRepository,
) -> Result<ProgressView, EngineError> {
    let progress = progress_repo
        .find(phone_number, project_id)
        .await?
        .ok_or_else(|| EngineError::NoActiveSession {
            phone_number: phone_number.to_owned(),
        })?;
    let scene = graph.get_scene(progress.current_scene_id).await?;
    Ok(ProgressView {
        progress_id: progress.id,
        phone_number: progress.phone_number,
        project_id: progress.project_id,
        current_scene_id: progress.current_scene_id,
        current_scene_title: scene.title,
        current_scene_type: scene.kind.type_name(),
        attempts_remaining: progress.attempts_remaining,
        collected_items: progress.collected_items,
        last_interaction_at: progress.last_interaction_at,
        version: progress.version,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use escapade_core::error::EngineError;
    use escapade_core::model::PlayerProgress;
    use escapade_core::repository::StoryGraphRepository;
    use escapade_test_support::{
        InMemoryProgressRepository, StoryBuilder, item_id, project_id, scene_id,
    };
    use uuid::Uuid;

    use crate::application::query_handlers::get_progress;

    #[tokio::test]
    async fn test_get_progress_returns_view_with_scene_details() {
        // Arrange
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let graph = StoryBuilder::new("demo")
            .investigation("hall", "Hall", &[])
            .build();
        let hall = graph.get_scene(scene_id("hall")).await.unwrap();
        let mut progress = PlayerProgress::start(Uuid::new_v4(), "+39", project_id("demo"), &hall, now);
        progress.collect_item(item_id("key"), now);
        let repo = InMemoryProgressRepository::with_progress(vec![progress.clone()]);

        // Act
        let view = get_progress("+39", project_id("demo"), &repo, &graph)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.progress_id, progress.id);
        assert_eq!(view.current_scene_title, "hall");
        assert_eq!(view.current_scene_type, "investigation");
        assert_eq!(view.attempts_remaining, 3);
        assert_eq!(view.collected_items.len(), 1);
        assert_eq!(view.version, 0);
    }

    #[tokio::test]
    async fn test_get_progress_returns_no_active_session_when_absent() {
        // Arrange
        let graph = StoryBuilder::new("demo").final_scene("end", "End").build();
        let repo = InMemoryProgressRepository::new();

        // Act
        let result = get_progress("+39", project_id("demo"), &repo, &graph).await;

        // Assert
        match result {
            Err(EngineError::NoActiveSession { phone_number }) => assert_eq!(phone_number, "+39"),
            other => panic!("expected NoActiveSession, got {other:?}"),
        }
    }
}
