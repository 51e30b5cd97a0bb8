//! Intro scenes: narrative text advanced by a continue trigger.

use escapade_core::error::EngineError;
use escapade_reply::ContentBlock;
use escapade_reply::sanitize::plain_text;
use tracing::debug;
use uuid::Uuid;

use super::{SceneContext, SceneOutcome, advance_to, scene_blocks};
use crate::domain::settings::CONTINUE_KEYWORD;

/// Advances on `"1"` or on the entry message typed back without markup.
/// Without a next scene the player gets the completion message and stays.
pub(super) async fn handle(
    ctx: &SceneContext<'_>,
    next_scene_id: Option<Uuid>,
    inbound: &str,
) -> Result<SceneOutcome, EngineError> {
    if !is_trigger(inbound, &ctx.scene.entry_message) {
        let mut blocks = scene_blocks(ctx.scene);
        blocks.push(ContentBlock::text(
            ctx.settings.messages.continue_prompt.as_str(),
        ));
        return Ok(SceneOutcome::stay(blocks));
    }

    match next_scene_id {
        Some(next) => {
            debug!(scene_id = %ctx.scene.id, %next, "intro continued");
            advance_to(ctx, next).await
        }
        None => Ok(SceneOutcome::stay(vec![ContentBlock::text(
            ctx.settings.messages.completion.as_str(),
        )])),
    }
}

fn is_trigger(inbound: &str, entry_message: &str) -> bool {
    let typed = inbound.trim();
    if typed == CONTINUE_KEYWORD {
        return true;
    }
    let typed = plain_text(typed);
    !typed.is_empty() && typed == plain_text(entry_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handlers::handle_scene;
    use crate::domain::handlers::test_support::progress_at;
    use crate::domain::settings::EngineSettings;
    use escapade_core::model::SceneKind;
    use escapade_core::repository::StoryGraphRepository;
    use escapade_test_support::{StoryBuilder, scene_id};

    fn story() -> impl StoryGraphRepository {
        StoryBuilder::new("demo")
            .intro("s1", "<p>Hello</p>", Some("s2"))
            .investigation("s2", "<p>Hall</p>", &[("Left", "s3")])
            .intro("s3", "<p>The end of chapter one.</p>", None)
            .build()
    }

    async fn send(graph: &dyn StoryGraphRepository, key: &str, inbound: &str) -> SceneOutcome {
        let scene = graph.get_scene(scene_id(key)).await.unwrap();
        let progress = progress_at(&scene);
        let settings = EngineSettings::default();
        let ctx = SceneContext {
            progress: &progress,
            scene: &scene,
            graph,
            settings: &settings,
        };
        handle_scene(&ctx, inbound).await.unwrap()
    }

    #[tokio::test]
    async fn test_numeral_one_advances_and_chains_destination_menu() {
        // Arrange
        let graph = story();

        // Act
        let outcome = send(&graph, "s1", " 1 ").await;

        // Assert
        assert_eq!(outcome.mutation.move_to, Some(scene_id("s2")));
        assert_eq!(outcome.mutation.attempts_remaining, None);
        assert_eq!(
            outcome.blocks,
            vec![
                ContentBlock::text("<p>Hall</p>"),
                ContentBlock::text("<b>Available options:</b><br>1. Left"),
            ]
        );
    }

    #[tokio::test]
    async fn test_entry_message_typed_back_advances() {
        let graph = story();

        let outcome = send(&graph, "s1", "Hello").await;

        assert_eq!(outcome.mutation.move_to, Some(scene_id("s2")));
    }

    #[tokio::test]
    async fn test_other_text_repeats_scene_with_continue_prompt() {
        // Arrange
        let graph = story();

        // Act
        let outcome = send(&graph, "s1", "hello?").await;

        // Assert
        assert!(outcome.mutation.is_empty());
        assert_eq!(
            outcome.blocks,
            vec![
                ContentBlock::text("<p>Hello</p>"),
                ContentBlock::text(EngineSettings::default().messages.continue_prompt.as_str()),
            ]
        );
    }

    #[tokio::test]
    async fn test_trigger_without_next_scene_is_a_soft_end() {
        let graph = story();

        let outcome = send(&graph, "s3", "1").await;

        assert!(outcome.mutation.is_empty());
        assert_eq!(
            outcome.blocks,
            vec![ContentBlock::text(EngineSettings::default().messages.completion.as_str())]
        );
    }

    #[tokio::test]
    async fn test_dangling_next_scene_is_scene_not_found() {
        // Arrange
        let graph = StoryBuilder::new("demo")
            .scene(
                "s1",
                "Hello",
                SceneKind::Intro {
                    next_scene_id: Some(scene_id("missing")),
                },
            )
            .build();
        let scene = graph.get_scene(scene_id("s1")).await.unwrap();
        let progress = progress_at(&scene);
        let settings = EngineSettings::default();
        let ctx = SceneContext {
            progress: &progress,
            scene: &scene,
            graph: &graph,
            settings: &settings,
        };

        // Act
        let result = handle_scene(&ctx, "1").await;

        // Assert
        match result {
            Err(EngineError::SceneNotFound(id)) => assert_eq!(id, scene_id("missing")),
            other => panic!("expected SceneNotFound, got {other:?}"),
        }
    }
}
