//! Out-of-band trigger that (re)starts a player and returns the first reply.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use escapade_conversation::application::command_handlers::{
    error_document, handle_send_initial_message,
};
use escapade_conversation::domain::commands::SendInitialMessage;
use escapade_core::command::Command;
use escapade_core::error::EngineError;
use serde::Deserialize;
use tracing::{Span, field, info, instrument};
use uuid::Uuid;

use crate::routes::XmlReply;
use crate::state::AppState;

/// Request body for POST /initial-message.
#[derive(Debug, Deserialize)]
pub struct InitialMessageRequest {
    /// The player to restart.
    pub phone_number: String,
    /// Project to start; falls back to the active or default project.
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

/// POST /initial-message
///
/// A body that is not the expected JSON is answered with the same XML
/// shape as any other failure.
#[instrument(skip_all, fields(phone_number = field::Empty, project_id = field::Empty))]
async fn send_initial_message(
    State(state): State<AppState>,
    request: Result<Json<InitialMessageRequest>, JsonRejection>,
) -> XmlReply {
    let ctx = state.engine();
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let e = EngineError::InvalidRequest(rejection.body_text());
            return XmlReply(error_document(&e, &ctx));
        }
    };
    let span = Span::current();
    span.record("phone_number", request.phone_number.as_str());
    if let Some(project_id) = request.project_id {
        span.record("project_id", field::display(project_id));
    }

    let command = SendInitialMessage {
        correlation_id: Uuid::new_v4(),
        phone_number: request.phone_number,
        project_id: request.project_id,
    };

    info!(
        correlation_id = %command.correlation_id(),
        command = command.command_type(),
        "handling command"
    );

    XmlReply(handle_send_initial_message(&command, &ctx).await)
}

/// Returns the router for the initial message trigger.
pub fn router() -> Router<AppState> {
    Router::new().route("/initial-message", post(send_initial_message))
}
