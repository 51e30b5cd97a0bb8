//! Puzzle scenes: one question, one correct answer, limited attempts.

use escapade_core::error::EngineError;
use escapade_core::model::{ProgressMutation, Puzzle};
use escapade_reply::ContentBlock;
use tracing::{debug, info};

use super::{SceneContext, SceneOutcome, advance_to};

/// Compares the trimmed answer case-insensitively. A match grants the reward
/// and advances; a miss spends one attempt, never going below zero.
pub(super) async fn handle(
    ctx: &SceneContext<'_>,
    puzzle: &Puzzle,
    inbound: &str,
) -> Result<SceneOutcome, EngineError> {
    if is_correct(puzzle, inbound) {
        info!(scene_id = %ctx.scene.id, item_id = ?puzzle.item_id, "puzzle solved");
        let mut blocks = vec![ContentBlock::text(puzzle.success_message.as_str())];
        let mut mutation = ProgressMutation {
            grant_item: puzzle.item_id,
            ..ProgressMutation::none()
        };
        if let Some(next) = puzzle.next_scene_id {
            let arrival = advance_to(ctx, next).await?;
            mutation.move_to = arrival.mutation.move_to;
            mutation.attempts_remaining = arrival.mutation.attempts_remaining;
            blocks.extend(arrival.blocks);
        }
        return Ok(SceneOutcome { mutation, blocks });
    }

    let remaining = ctx.progress.attempts_remaining.saturating_sub(1);
    debug!(scene_id = %ctx.scene.id, remaining, "wrong answer");
    let blocks = if remaining == 0 {
        vec![ContentBlock::text(puzzle.failure_message.as_str())]
    } else {
        vec![
            ContentBlock::text(ctx.settings.messages.wrong_answer(remaining)),
            ContentBlock::text(puzzle.question.as_str()),
        ]
    };
    Ok(SceneOutcome {
        mutation: ProgressMutation {
            attempts_remaining: Some(remaining),
            ..ProgressMutation::none()
        },
        blocks,
    })
}

fn is_correct(puzzle: &Puzzle, inbound: &str) -> bool {
    inbound.trim().to_lowercase() == puzzle.correct_answer.trim().to_lowercase()
}
