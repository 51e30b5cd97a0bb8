//! Session resolution: which progress record an inbound message belongs to.
//!
//! A sender plays one project at a time. Progress is created by a join
//! command or the restart sentinel and is never replaced implicitly. The
//! arrival at the initial scene is rendered before anything is written.

use escapade_core::error::EngineError;
use escapade_core::model::{PlayerProgress, Project};
use escapade_reply::ReplyPart;
use tracing::info;
use uuid::Uuid;

use crate::application::context::EngineContext;
use crate::domain::handlers::arrival_blocks;

/// A record created at a project's initial scene, with its rendered arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// The stored record.
    pub progress: PlayerProgress,
    /// Reply parts for the initial scene.
    pub arrival: Vec<ReplyPart>,
}

/// Outcome of resolving a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A fresh record was created at the project's initial scene.
    Started(NewSession),
    /// A join named the project the sender is already playing.
    Resumed(PlayerProgress),
    /// The message belongs to the current scene of existing progress.
    Continuing(PlayerProgress),
}

impl Resolution {
    /// Returns `true` when the record was created by this message.
    #[must_use]
    pub fn is_new_session(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// Consumes the resolution, returning the record.
    #[must_use]
    pub fn into_progress(self) -> PlayerProgress {
        match self {
            Self::Started(session) => session.progress,
            Self::Resumed(p) | Self::Continuing(p) => p,
        }
    }
}

/// Returns the project slug of a `join <slug>` command.
#[must_use]
pub fn parse_join(text: &str) -> Option<String> {
    let (keyword, slug) = text.trim().split_once(char::is_whitespace)?;
    let slug = slug.trim();
    (keyword.eq_ignore_ascii_case("join") && !slug.is_empty()).then(|| slug.to_lowercase())
}

/// Maps a sender and their message to a progress record.
///
/// # Errors
///
/// Returns `EngineError::NoActiveSession` when the sender has no progress
/// and sent neither a join nor the restart sentinel, and the errors of
/// [`restart_session`] and the join path (`ProjectNotFound`,
/// `SessionConflict`, `ProgressAlreadyExists`).
pub async fn resolve_session(
    phone_number: &str,
    inbound: &str,
    explicit_project_id: Option<Uuid>,
    ctx: &EngineContext<'_>,
) -> Result<Resolution, EngineError> {
    if ctx.settings.is_restart(inbound) {
        return restart_session(phone_number, explicit_project_id, ctx)
            .await
            .map(Resolution::Started);
    }

    if let Some(slug) = parse_join(inbound) {
        return join_session(phone_number, &slug, ctx).await;
    }

    let existing = match explicit_project_id {
        Some(project_id) => ctx.progress.find(phone_number, project_id).await?,
        None => ctx.progress.find_active(phone_number).await?,
    };
    existing
        .map(Resolution::Continuing)
        .ok_or_else(|| EngineError::NoActiveSession {
            phone_number: phone_number.to_owned(),
        })
}

/// Deletes any progress of the sender in the target project and creates a
/// fresh record at its initial scene. The target is `project_id`, else the
/// project the sender is playing, else the configured default project.
/// Nothing is deleted when the initial scene fails to render.
///
/// # Errors
///
/// Returns `EngineError::ProjectNotFound` if no target project exists,
/// `EngineError::SessionConflict` if the sender plays another project,
/// render errors of the initial scene and
/// `EngineError::ProgressAlreadyExists` if a concurrent delivery created the
/// record first.
pub async fn restart_session(
    phone_number: &str,
    project_id: Option<Uuid>,
    ctx: &EngineContext<'_>,
) -> Result<NewSession, EngineError> {
    let active = ctx.progress.find_active(phone_number).await?;
    let project = match (project_id, &active) {
        (Some(id), _) => ctx.graph.get_project(id).await?,
        (None, Some(active)) => ctx.graph.get_project(active.project_id).await?,
        (None, None) => default_project(ctx).await?,
    };

    if let Some(active) = active.filter(|a| a.project_id != project.id) {
        return Err(conflict(phone_number, &active, &project));
    }

    let session = prepare_start(phone_number, &project, ctx).await?;
    if let Some(previous) = ctx.progress.find(phone_number, project.id).await? {
        ctx.progress.delete(previous.id).await?;
        info!(
            phone_number,
            project = %project.slug,
            progress_id = %previous.id,
            "progress reset"
        );
    }

    commit_start(session, &project, ctx).await
}

async fn join_session(
    phone_number: &str,
    slug: &str,
    ctx: &EngineContext<'_>,
) -> Result<Resolution, EngineError> {
    let project = ctx.graph.get_project_by_slug(slug).await?;

    if let Some(existing) = ctx.progress.find(phone_number, project.id).await? {
        return Ok(Resolution::Resumed(existing));
    }
    if let Some(active) = ctx.progress.find_active(phone_number).await? {
        return Err(conflict(phone_number, &active, &project));
    }

    let session = prepare_start(phone_number, &project, ctx).await?;
    commit_start(session, &project, ctx)
        .await
        .map(Resolution::Started)
}

async fn default_project(ctx: &EngineContext<'_>) -> Result<Project, EngineError> {
    match &ctx.settings.default_project_slug {
        Some(slug) => ctx.graph.get_project_by_slug(slug).await,
        None => Err(EngineError::ProjectNotFound(
            "no project given and no default project configured".to_owned(),
        )),
    }
}

/// Builds the record and renders the initial scene without writing.
async fn prepare_start(
    phone_number: &str,
    project: &Project,
    ctx: &EngineContext<'_>,
) -> Result<NewSession, EngineError> {
    let initial = ctx.graph.get_scene(project.initial_scene_id).await?;
    let blocks = arrival_blocks(&initial, ctx.graph, ctx.settings).await?;
    let arrival = ctx.renderer.render(&blocks)?;
    let progress = PlayerProgress::start(
        Uuid::new_v4(),
        phone_number,
        project.id,
        &initial,
        ctx.clock.now(),
    );
    Ok(NewSession { progress, arrival })
}

async fn commit_start(
    session: NewSession,
    project: &Project,
    ctx: &EngineContext<'_>,
) -> Result<NewSession, EngineError> {
    ctx.progress.create(&session.progress).await?;
    info!(
        phone_number = %session.progress.phone_number,
        project = %project.slug,
        progress_id = %session.progress.id,
        "session started"
    );
    Ok(session)
}

fn conflict(phone_number: &str, active: &PlayerProgress, requested: &Project) -> EngineError {
    EngineError::SessionConflict {
        phone_number: phone_number.to_owned(),
        active_project_id: active.project_id,
        requested_project_id: requested.id,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use escapade_core::model::DEFAULT_ATTEMPTS;
    use escapade_core::repository::ProgressRepository;
    use escapade_reply::ReplyRenderer;
    use escapade_test_support::{
        FixedClock, InMemoryProgressRepository, StoryBuilder, project_id, scene_id,
    };
    use url::Url;

    use super::*;
    use crate::domain::settings::EngineSettings;

    const PHONE: &str = "whatsapp:+393331234567";

    struct Fixture {
        graph: escapade_test_support::StoryGraph,
        store: InMemoryProgressRepository,
        clock: FixedClock,
        renderer: ReplyRenderer,
        settings: EngineSettings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: StoryBuilder::new("demo")
                    .intro("s1", "Hello", Some("s2"))
                    .final_scene("s2", "Bye")
                    .project("crypt")
                    .final_scene("c1", "Crypt")
                    .build(),
                store: InMemoryProgressRepository::new(),
                clock: FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()),
                renderer: ReplyRenderer::new(Url::parse("https://play.example.com").unwrap()),
                settings: EngineSettings {
                    default_project_slug: Some("demo".to_owned()),
                    ..EngineSettings::default()
                },
            }
        }

        fn ctx(&self) -> EngineContext<'_> {
            EngineContext {
                graph: &self.graph,
                progress: &self.store,
                clock: &self.clock,
                renderer: &self.renderer,
                settings: &self.settings,
            }
        }

        async fn resolve(&self, inbound: &str) -> Result<Resolution, EngineError> {
            resolve_session(PHONE, inbound, None, &self.ctx()).await
        }
    }

    #[test]
    fn test_parse_join_lowercases_slug_and_ignores_keyword_case() {
        assert_eq!(parse_join("JOIN  Demo "), Some("demo".to_owned()));
        assert_eq!(parse_join("join"), None);
        assert_eq!(parse_join("joined demo"), None);
    }

    #[tokio::test]
    async fn test_join_creates_progress_at_initial_scene() {
        // Arrange
        let fx = Fixture::new();

        // Act
        let resolution = fx.resolve("join demo").await.unwrap();

        // Assert
        assert!(resolution.is_new_session());
        let records = fx.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].project_id, project_id("demo"));
        assert_eq!(records[0].current_scene_id, scene_id("s1"));
        assert_eq!(records[0].attempts_remaining, DEFAULT_ATTEMPTS);
        assert!(records[0].collected_items.is_empty());
        assert_eq!(records[0].last_interaction_at, fx.clock.0);
    }

    #[tokio::test]
    async fn test_join_same_project_resumes_without_new_row() {
        let fx = Fixture::new();
        fx.resolve("join demo").await.unwrap();

        let resolution = fx.resolve("join DEMO").await.unwrap();

        assert!(matches!(resolution, Resolution::Resumed(_)));
        assert_eq!(fx.store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_join_other_project_is_a_conflict() {
        // Arrange
        let fx = Fixture::new();
        fx.resolve("join demo").await.unwrap();

        // Act
        let result = fx.resolve("join crypt").await;

        // Assert
        match result {
            Err(EngineError::SessionConflict {
                active_project_id,
                requested_project_id,
                ..
            }) => {
                assert_eq!(active_project_id, project_id("demo"));
                assert_eq!(requested_project_id, project_id("crypt"));
            }
            other => panic!("expected SessionConflict, got {other:?}"),
        }
        assert_eq!(fx.store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_join_unknown_slug_is_project_not_found() {
        let fx = Fixture::new();

        assert!(matches!(
            fx.resolve("join attic").await,
            Err(EngineError::ProjectNotFound(slug)) if slug == "attic"
        ));
    }

    #[tokio::test]
    async fn test_unknown_sender_without_command_has_no_session() {
        let fx = Fixture::new();

        match fx.resolve("hello").await {
            Err(EngineError::NoActiveSession { phone_number }) => assert_eq!(phone_number, PHONE),
            other => panic!("expected NoActiveSession, got {other:?}"),
        }
        assert!(fx.store.records().is_empty());
    }

    #[tokio::test]
    async fn test_restart_twice_keeps_a_single_reset_row() {
        // Arrange
        let fx = Fixture::new();
        let restart = fx.settings.restart_phrase.clone();

        // Act
        let first = fx.resolve(&restart).await.unwrap().into_progress();
        let mut moved = first.clone();
        moved.current_scene_id = scene_id("s2");
        fx.store.save(&moved).await.unwrap();
        let second = fx.resolve(&restart).await.unwrap().into_progress();

        // Assert
        let records = fx.store.records();
        assert_eq!(records.len(), 1);
        assert_ne!(first.id, second.id);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[0].current_scene_id, scene_id("s1"));
    }

    #[tokio::test]
    async fn test_restart_without_default_or_progress_is_project_not_found() {
        let mut fx = Fixture::new();
        fx.settings.default_project_slug = None;
        let restart = fx.settings.restart_phrase.clone();

        assert!(matches!(
            fx.resolve(&restart).await,
            Err(EngineError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_restart_into_another_project_is_a_conflict() {
        let fx = Fixture::new();
        fx.resolve("join crypt").await.unwrap();

        let result = restart_session(PHONE, Some(project_id("demo")), &fx.ctx()).await;

        assert!(matches!(result, Err(EngineError::SessionConflict { .. })));
    }

    #[tokio::test]
    async fn test_restart_targets_the_active_project() {
        let fx = Fixture::new();
        fx.resolve("join crypt").await.unwrap();
        let restart = fx.settings.restart_phrase.clone();

        let progress = fx.resolve(&restart).await.unwrap().into_progress();

        assert_eq!(progress.project_id, project_id("crypt"));
        assert_eq!(progress.current_scene_id, scene_id("c1"));
    }

    #[tokio::test]
    async fn test_explicit_project_filters_existing_progress() {
        // Arrange
        let fx = Fixture::new();
        fx.resolve("join demo").await.unwrap();

        // Act
        let other = resolve_session(PHONE, "hi", Some(project_id("crypt")), &fx.ctx()).await;
        let same = resolve_session(PHONE, "hi", Some(project_id("demo")), &fx.ctx()).await;

        // Assert
        assert!(matches!(other, Err(EngineError::NoActiveSession { .. })));
        assert!(matches!(same, Ok(Resolution::Continuing(_))));
    }
}
