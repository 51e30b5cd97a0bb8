//! Final scenes: terminal, re-rendered on every message.

use super::{SceneContext, SceneOutcome, scene_blocks};

pub(super) fn handle(ctx: &SceneContext<'_>) -> SceneOutcome {
    SceneOutcome::stay(scene_blocks(ctx.scene))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handlers::handle_scene;
    use crate::domain::handlers::test_support::progress_at;
    use crate::domain::settings::EngineSettings;
    use escapade_core::repository::StoryGraphRepository;
    use escapade_reply::ContentBlock;
    use escapade_test_support::{StoryBuilder, scene_id};

    #[tokio::test]
    async fn test_final_scene_repeats_itself_without_mutation() {
        // Arrange
        let graph = StoryBuilder::new("demo")
            .final_scene("exit", "<p>You escaped.</p>")
            .media("exit", Some("exit.mp4"), Some("fanfare.ogg"))
            .build();
        let scene = graph.get_scene(scene_id("exit")).await.unwrap();
        let progress = progress_at(&scene);
        let settings = EngineSettings::default();
        let ctx = SceneContext {
            progress: &progress,
            scene: &scene,
            graph: &graph,
            settings: &settings,
        };

        // Act
        let first = handle_scene(&ctx, "1").await.unwrap();
        let second = handle_scene(&ctx, "anything").await.unwrap();

        // Assert
        assert!(first.mutation.is_empty());
        assert_eq!(first, second);
        assert_eq!(
            first.blocks,
            vec![
                ContentBlock::text("<p>You escaped.</p>"),
                ContentBlock::visual("exit.mp4"),
                ContentBlock::audio("fanfare.ogg"),
            ]
        );
    }
}
