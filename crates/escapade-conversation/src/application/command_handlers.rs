//! Command handlers for the conversation engine.
//!
//! Each delivery resolves the sender's session, dispatches the inbound text
//! to the handler of the current scene, renders the reply and persists the
//! mutation with an optimistic version check. Write races re-run the whole
//! turn against fresh state. Every failure is turned into a well-formed
//! reply document so the gateway always gets something to send.

use escapade_core::error::EngineError;
use escapade_core::model::{PlayerProgress, ProgressMutation};
use escapade_reply::{ContentBlock, ReplyPart, write_reply};
use tracing::{error, info, instrument, warn};

use crate::application::context::EngineContext;
use crate::application::session_resolver::{Resolution, resolve_session, restart_session};
use crate::domain::commands::{HandleInboundMessage, SendInitialMessage};
use crate::domain::handlers::{SceneContext, arrival_blocks, handle_scene};
use crate::domain::settings::Messages;

/// Times a turn is run before a write race is reported to the player.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Document sent when even the error reply cannot be rendered.
pub const FALLBACK_REPLY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
    <Response><Message><Body>Something went wrong. Please try again later.</Body></Message></Response>";

/// Result of one processed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Progress as stored after the turn.
    pub progress: PlayerProgress,
    /// Whether the turn created the progress record.
    pub new_session: bool,
    /// Rendered reply parts in send order.
    pub parts: Vec<ReplyPart>,
}

/// Processes an inbound message and returns the reply document. Never fails:
/// errors are logged and answered with a short message.
#[instrument(
    skip_all,
    fields(
        correlation_id = %command.correlation_id,
        phone_number = %command.phone_number,
        message_sid = ?command.message_sid,
    )
)]
pub async fn handle_inbound_message(
    command: &HandleInboundMessage,
    ctx: &EngineContext<'_>,
) -> String {
    let result = process_inbound_message(command, ctx).await;
    into_document(result, ctx)
}

/// Restarts a player out of band and returns the reply document. Never
/// fails: errors are logged and answered with a short message.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, phone_number = %command.phone_number)
)]
pub async fn handle_send_initial_message(
    command: &SendInitialMessage,
    ctx: &EngineContext<'_>,
) -> String {
    let result = process_initial_message(command, ctx).await;
    into_document(result, ctx)
}

/// Processes an inbound message.
///
/// # Errors
///
/// Returns `EngineError::InvalidRequest` if the sender is blank, any
/// resolution or handler error, and `ConcurrencyConflict` /
/// `ProgressAlreadyExists` if the write race persisted for
/// [`MAX_WRITE_ATTEMPTS`] runs.
pub async fn process_inbound_message(
    command: &HandleInboundMessage,
    ctx: &EngineContext<'_>,
) -> Result<ConversationTurn, EngineError> {
    require_sender(&command.phone_number)?;
    let mut attempt = 1;
    loop {
        match run_inbound_turn(command, ctx).await {
            Err(e) if e.is_retryable() && attempt < MAX_WRITE_ATTEMPTS => {
                warn!(attempt, error = %e, "write race, retrying turn");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Restarts a player at the initial scene of the requested project and
/// renders its arrival.
///
/// # Errors
///
/// Returns `EngineError::InvalidRequest` if the phone number is blank and
/// the errors of [`restart_session`].
pub async fn process_initial_message(
    command: &SendInitialMessage,
    ctx: &EngineContext<'_>,
) -> Result<ConversationTurn, EngineError> {
    require_sender(&command.phone_number)?;
    let mut attempt = 1;
    loop {
        match run_initial_turn(command, ctx).await {
            Err(e) if e.is_retryable() && attempt < MAX_WRITE_ATTEMPTS => {
                warn!(attempt, error = %e, "write race, retrying restart");
                attempt += 1;
            }
            result => return result,
        }
    }
}

async fn run_initial_turn(
    command: &SendInitialMessage,
    ctx: &EngineContext<'_>,
) -> Result<ConversationTurn, EngineError> {
    let session = restart_session(&command.phone_number, command.project_id, ctx).await?;
    Ok(ConversationTurn {
        progress: session.progress,
        new_session: true,
        parts: session.arrival,
    })
}

async fn run_inbound_turn(
    command: &HandleInboundMessage,
    ctx: &EngineContext<'_>,
) -> Result<ConversationTurn, EngineError> {
    let resolution = resolve_session(
        &command.phone_number,
        &command.body,
        command.project_id,
        ctx,
    )
    .await?;

    match resolution {
        Resolution::Started(session) => Ok(ConversationTurn {
            progress: session.progress,
            new_session: true,
            parts: session.arrival,
        }),
        Resolution::Resumed(progress) => {
            let parts = render_arrival(&progress, ctx).await?;
            let progress = persist(progress, &ProgressMutation::none(), ctx).await?;
            Ok(ConversationTurn {
                progress,
                new_session: false,
                parts,
            })
        }
        Resolution::Continuing(progress) => {
            let scene = ctx.graph.get_scene(progress.current_scene_id).await?;
            let outcome = handle_scene(
                &SceneContext {
                    progress: &progress,
                    scene: &scene,
                    graph: ctx.graph,
                    settings: ctx.settings,
                },
                &command.body,
            )
            .await?;
            let parts = ctx.renderer.render(&outcome.blocks)?;
            let progress = persist(progress, &outcome.mutation, ctx).await?;
            if outcome.mutation.move_to.is_some_and(|to| to != scene.id) {
                info!(
                    from = %scene.id,
                    to = %progress.current_scene_id,
                    "scene transition"
                );
            }
            Ok(ConversationTurn {
                progress,
                new_session: false,
                parts,
            })
        }
    }
}

async fn render_arrival(
    progress: &PlayerProgress,
    ctx: &EngineContext<'_>,
) -> Result<Vec<ReplyPart>, EngineError> {
    let scene = ctx.graph.get_scene(progress.current_scene_id).await?;
    let blocks = arrival_blocks(&scene, ctx.graph, ctx.settings).await?;
    ctx.renderer.render(&blocks)
}

async fn persist(
    mut progress: PlayerProgress,
    mutation: &ProgressMutation,
    ctx: &EngineContext<'_>,
) -> Result<PlayerProgress, EngineError> {
    progress.apply(mutation, ctx.clock.now());
    progress.version = ctx.progress.save(&progress).await?;
    Ok(progress)
}

fn require_sender(phone_number: &str) -> Result<(), EngineError> {
    if phone_number.trim().is_empty() {
        return Err(EngineError::InvalidRequest("missing sender".to_owned()));
    }
    Ok(())
}

fn into_document(result: Result<ConversationTurn, EngineError>, ctx: &EngineContext<'_>) -> String {
    match result.and_then(|turn| write_reply(&turn.parts)) {
        Ok(document) => document,
        Err(e) => error_document(&e, ctx),
    }
}

/// Logs `error` and renders the short message the player gets for it.
#[must_use]
pub fn error_document(error: &EngineError, ctx: &EngineContext<'_>) -> String {
    if error.is_integrity_violation() {
        error!(error = %error, "story data integrity violation");
    } else if matches!(
        error,
        EngineError::Infrastructure(_) | EngineError::TransportError(_)
    ) {
        error!(error = %error, "turn failed");
    } else {
        warn!(error = %error, "turn rejected");
    }

    let message = error_message(error, &ctx.settings.messages);
    ctx.renderer
        .render_document(&[ContentBlock::text(message)])
        .unwrap_or_else(|_| FALLBACK_REPLY.to_owned())
}

/// Player-facing text for an engine error.
#[must_use]
pub fn error_message<'m>(error: &EngineError, messages: &'m Messages) -> &'m str {
    match error {
        EngineError::NoActiveSession { .. } => &messages.join_instructions,
        EngineError::ProjectNotFound(_) => &messages.project_not_found,
        EngineError::SessionConflict { .. } => &messages.session_conflict,
        EngineError::SceneNotFound(_)
        | EngineError::InvalidSceneType { .. }
        | EngineError::UnsupportedMediaFormat(_) => &messages.configuration_error,
        EngineError::ConcurrencyConflict { .. } | EngineError::ProgressAlreadyExists { .. } => {
            &messages.busy
        }
        EngineError::InvalidRequest(_) => &messages.missing_sender,
        EngineError::TransportError(_) | EngineError::Infrastructure(_) => &messages.generic_error,
    }
}

/// The document behind the gateway's "click to start" link: the restart
/// sentinel as a single message.
#[must_use]
pub fn welcome_document(ctx: &EngineContext<'_>) -> String {
    ctx.renderer
        .render_document(&[ContentBlock::text(ctx.settings.restart_phrase.as_str())])
        .unwrap_or_else(|_| FALLBACK_REPLY.to_owned())
}
