//! `PostgreSQL` implementation of the `StoryGraphRepository` trait.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use escapade_core::error::EngineError;
use escapade_core::model::{Choice, Project, Puzzle, Scene, SceneKind, SceneMedia};
use escapade_core::repository::StoryGraphRepository;

use crate::infrastructure;
use crate::schema::{CHOICE_COLUMNS, PROJECT_COLUMNS, SCENE_COLUMNS};

/// PostgreSQL-backed, read-only story graph.
#[derive(Debug, Clone)]
pub struct PgStoryGraphRepository {
    pool: PgPool,
}

impl PgStoryGraphRepository {
    /// Creates a new `PgStoryGraphRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SceneRow {
    id: Uuid,
    project_id: Uuid,
    title: String,
    #[sqlx(rename = "type")]
    scene_type: String,
    entry_message: String,
    media_gif: Option<String>,
    media_audio: Option<String>,
    puzzle_question: Option<String>,
    correct_answer: Option<String>,
    success_message: Option<String>,
    failure_message: Option<String>,
    max_attempts: Option<i32>,
    item_id: Option<Uuid>,
    character_id: Option<Uuid>,
    next_scene_id: Option<Uuid>,
    order: i32,
}

impl TryFrom<SceneRow> for Scene {
    type Error = EngineError;

    fn try_from(row: SceneRow) -> Result<Self, Self::Error> {
        let kind = match row.scene_type.trim().to_ascii_lowercase().as_str() {
            "intro" => SceneKind::Intro {
                next_scene_id: row.next_scene_id,
            },
            "investigation" => SceneKind::Investigation,
            "puzzle" => SceneKind::Puzzle(Puzzle {
                question: row.puzzle_question.unwrap_or_default(),
                correct_answer: row.correct_answer.unwrap_or_default(),
                success_message: row.success_message.unwrap_or_default(),
                failure_message: row.failure_message.unwrap_or_default(),
                // Negative limits fall back to the default.
                max_attempts: row.max_attempts.and_then(|n| u32::try_from(n).ok()),
                item_id: row.item_id,
                next_scene_id: row.next_scene_id,
            }),
            "final" => SceneKind::Final,
            _ => {
                return Err(EngineError::InvalidSceneType {
                    scene_id: row.id,
                    scene_type: row.scene_type,
                });
            }
        };
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            entry_message: row.entry_message,
            media: SceneMedia {
                gif: row.media_gif,
                audio: row.media_audio,
            },
            character_id: row.character_id,
            order: row.order,
            kind,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    slug: String,
    initial_scene_id: Option<Uuid>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = EngineError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let Some(initial_scene_id) = row.initial_scene_id else {
            warn!(project = %row.slug, "project has no initial scene");
            return Err(EngineError::ProjectNotFound(row.slug));
        };
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            initial_scene_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChoiceRow {
    id: Uuid,
    scene_id: Uuid,
    label: String,
    target_scene_id: Uuid,
    order: i32,
}

impl From<ChoiceRow> for Choice {
    fn from(row: ChoiceRow) -> Self {
        Self {
            id: row.id,
            scene_id: row.scene_id,
            label: row.label,
            target_scene_id: row.target_scene_id,
            order: row.order,
        }
    }
}

#[async_trait]
impl StoryGraphRepository for PgStoryGraphRepository {
    async fn get_scene(&self, scene_id: Uuid) -> Result<Scene, EngineError> {
        let row: Option<SceneRow> =
            sqlx::query_as(&format!("SELECT {SCENE_COLUMNS} FROM scenes WHERE id = $1"))
                .bind(scene_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| infrastructure(&e))?;
        row.ok_or(EngineError::SceneNotFound(scene_id))?.try_into()
    }

    async fn get_project(&self, project_id: Uuid) -> Result<Project, EngineError> {
        let row: Option<ProjectRow> =
            sqlx::query_as(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"))
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| infrastructure(&e))?;
        row.ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))?
            .try_into()
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Project, EngineError> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE lower(slug) = lower($1)"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        row.ok_or_else(|| EngineError::ProjectNotFound(slug.to_owned()))?
            .try_into()
    }

    async fn get_choices(&self, scene_id: Uuid) -> Result<Vec<Choice>, EngineError> {
        let rows: Vec<ChoiceRow> = sqlx::query_as(&format!(
            r#"SELECT {CHOICE_COLUMNS} FROM choices WHERE scene_id = $1 ORDER BY "order", id"#
        ))
        .bind(scene_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        Ok(rows.into_iter().map(Choice::from).collect())
    }
}
