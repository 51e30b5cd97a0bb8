//! Scene type handlers.
//!
//! Each handler maps (progress, scene, inbound text) to a [`SceneOutcome`]:
//! the mutation to apply to the progress record and the ordered content to
//! send back. Handlers only read the story graph; the engine persists the
//! mutation.

pub mod final_scene;
pub mod intro;
pub mod investigation;
pub mod puzzle;

use escapade_core::error::EngineError;
use escapade_core::model::{Choice, PlayerProgress, ProgressMutation, Scene, SceneKind};
use escapade_core::repository::StoryGraphRepository;
use escapade_reply::ContentBlock;
use uuid::Uuid;

use crate::domain::settings::{ChainingPolicy, EngineSettings};

/// What a handler reads.
pub struct SceneContext<'a> {
    /// Progress as loaded for this delivery.
    pub progress: &'a PlayerProgress,
    /// The scene `progress` points at.
    pub scene: &'a Scene,
    /// Story graph for destinations and menus.
    pub graph: &'a dyn StoryGraphRepository,
    /// Policy and copy.
    pub settings: &'a EngineSettings,
}

/// What a handler produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneOutcome {
    /// Changes to apply to the progress record.
    pub mutation: ProgressMutation,
    /// Reply content in send order.
    pub blocks: Vec<ContentBlock>,
}

impl SceneOutcome {
    /// Reply without any state change.
    #[must_use]
    pub fn stay(blocks: Vec<ContentBlock>) -> Self {
        Self {
            mutation: ProgressMutation::none(),
            blocks,
        }
    }
}

/// Dispatches to the handler of the scene's type.
///
/// # Errors
///
/// Returns `EngineError::SceneNotFound` if an edge points at a missing scene
/// and propagates story graph failures.
pub async fn handle_scene(
    ctx: &SceneContext<'_>,
    inbound: &str,
) -> Result<SceneOutcome, EngineError> {
    match &ctx.scene.kind {
        SceneKind::Intro { next_scene_id } => intro::handle(ctx, *next_scene_id, inbound).await,
        SceneKind::Investigation => investigation::handle(ctx, inbound).await,
        SceneKind::Puzzle(puzzle) => puzzle::handle(ctx, puzzle, inbound).await,
        SceneKind::Final => Ok(final_scene::handle(ctx)),
    }
}

/// Entry message, then GIF, then audio.
#[must_use]
pub fn scene_blocks(scene: &Scene) -> Vec<ContentBlock> {
    let mut blocks = vec![ContentBlock::text(scene.entry_message.as_str())];
    if let Some(gif) = &scene.media.gif {
        blocks.push(ContentBlock::visual(gif.as_str()));
    }
    if let Some(audio) = &scene.media.audio {
        blocks.push(ContentBlock::audio(audio.as_str()));
    }
    blocks
}

/// Numbered choice menu, `None` when there is nothing to choose.
#[must_use]
pub fn menu_block(choices: &[Choice], settings: &EngineSettings) -> Option<ContentBlock> {
    if choices.is_empty() {
        return None;
    }
    let lines: Vec<String> = choices
        .iter()
        .enumerate()
        .map(|(index, choice)| format!("{}. {}", index + 1, choice.label))
        .collect();
    Some(ContentBlock::text(format!(
        "{}<br>{}",
        settings.messages.menu_header,
        lines.join("<br>")
    )))
}

/// Everything rendered for a scene the player has just arrived in.
///
/// # Errors
///
/// Propagates story graph failures while loading an investigation menu.
pub async fn arrival_blocks(
    scene: &Scene,
    graph: &dyn StoryGraphRepository,
    settings: &EngineSettings,
) -> Result<Vec<ContentBlock>, EngineError> {
    let mut blocks = scene_blocks(scene);
    if settings.chaining == ChainingPolicy::EntryOnly {
        return Ok(blocks);
    }
    match &scene.kind {
        SceneKind::Investigation => {
            let choices = graph.get_choices(scene.id).await?;
            blocks.extend(menu_block(&choices, settings));
        }
        SceneKind::Puzzle(puzzle) => blocks.push(ContentBlock::text(puzzle.question.as_str())),
        SceneKind::Intro { .. } => {
            blocks.push(ContentBlock::text(settings.messages.continue_prompt.as_str()));
        }
        SceneKind::Final => {}
    }
    Ok(blocks)
}

/// Moves to `destination` and renders its arrival.
async fn advance_to(
    ctx: &SceneContext<'_>,
    destination: Uuid,
) -> Result<SceneOutcome, EngineError> {
    let scene = ctx.graph.get_scene(destination).await?;
    let blocks = arrival_blocks(&scene, ctx.graph, ctx.settings).await?;
    Ok(SceneOutcome {
        mutation: ProgressMutation::arrive_at(&scene),
        blocks,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use escapade_core::model::SceneMedia;
    use escapade_test_support::{StoryBuilder, puzzle, scene_id};

    async fn arrive(
        graph: &dyn StoryGraphRepository,
        settings: &EngineSettings,
        key: &str,
    ) -> Vec<ContentBlock> {
        let scene = graph.get_scene(scene_id(key)).await.unwrap();
        arrival_blocks(&scene, graph, settings).await.unwrap()
    }

    #[test]
    fn test_scene_blocks_order_text_gif_audio() {
        // Arrange
        let scene = Scene {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Gate".to_owned(),
            entry_message: "<p>Gate</p>".to_owned(),
            media: SceneMedia {
                gif: Some("gate.gif".to_owned()),
                audio: Some("gate.mp3".to_owned()),
            },
            character_id: None,
            order: 1,
            kind: SceneKind::Final,
        };

        // Act
        let blocks = scene_blocks(&scene);

        // Assert
        assert_eq!(
            blocks,
            vec![
                ContentBlock::text("<p>Gate</p>"),
                ContentBlock::visual("gate.gif"),
                ContentBlock::audio("gate.mp3"),
            ]
        );
    }

    #[tokio::test]
    async fn test_arrival_chains_one_level_per_destination_kind() {
        // Arrange
        let graph = StoryBuilder::new("demo")
            .intro("s1", "Hello", Some("s2"))
            .investigation("s2", "Hall", &[("Left", "s3"), ("Right", "s4")])
            .puzzle("s3", "Drawer", puzzle("Which year?", "1887"))
            .final_scene("s4", "Free")
            .build();
        let settings = EngineSettings::default();

        // Act
        let intro = arrive(&graph, &settings, "s1").await;
        let hall = arrive(&graph, &settings, "s2").await;
        let drawer = arrive(&graph, &settings, "s3").await;
        let exit = arrive(&graph, &settings, "s4").await;

        // Assert
        assert_eq!(
            intro[1],
            ContentBlock::text(settings.messages.continue_prompt.as_str())
        );
        assert_eq!(
            hall[1],
            ContentBlock::text("<b>Available options:</b><br>1. Left<br>2. Right")
        );
        assert_eq!(drawer[1], ContentBlock::text("Which year?"));
        assert_eq!(exit, vec![ContentBlock::text("Free")]);
    }

    #[tokio::test]
    async fn test_entry_only_policy_skips_follow_up() {
        let graph = StoryBuilder::new("demo")
            .investigation("s2", "Hall", &[("Left", "s2")])
            .build();
        let settings = EngineSettings {
            chaining: ChainingPolicy::EntryOnly,
            ..EngineSettings::default()
        };
        let hall = graph.get_scene(scene_id("s2")).await.unwrap();

        let blocks = arrival_blocks(&hall, &graph, &settings).await.unwrap();

        assert_eq!(blocks, vec![ContentBlock::text("Hall")]);
    }

    #[test]
    fn test_menu_block_is_omitted_without_choices() {
        assert!(menu_block(&[], &EngineSettings::default()).is_none());
    }
}
