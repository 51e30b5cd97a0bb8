//! Investigation scenes: the player picks one of the authored choices.

use escapade_core::error::EngineError;
use escapade_core::model::Choice;
use tracing::debug;

use super::{SceneContext, SceneOutcome, advance_to, menu_block, scene_blocks};

/// Follows the choice selected by 1-based numeral or by exact label. Any
/// other input re-renders the scene with its numbered menu.
pub(super) async fn handle(
    ctx: &SceneContext<'_>,
    inbound: &str,
) -> Result<SceneOutcome, EngineError> {
    let choices = ctx.graph.get_choices(ctx.scene.id).await?;

    if let Some(choice) = select(&choices, inbound) {
        debug!(scene_id = %ctx.scene.id, choice = %choice.label, "choice selected");
        return advance_to(ctx, choice.target_scene_id).await;
    }

    let mut blocks = scene_blocks(ctx.scene);
    blocks.extend(menu_block(&choices, ctx.settings));
    Ok(SceneOutcome::stay(blocks))
}

fn select<'c>(choices: &'c [Choice], inbound: &str) -> Option<&'c Choice> {
    let typed = inbound.trim();
    if typed.is_empty() {
        return None;
    }
    if typed.bytes().all(|b| b.is_ascii_digit()) {
        return typed
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| choices.get(index));
    }
    choices.iter().find(|choice| choice.label.trim() == typed)
}
