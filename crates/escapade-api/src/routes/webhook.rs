//! Messaging gateway webhook.
//!
//! The gateway posts every inbound message as a form and reads the XML
//! document in the response. Engine failures are answered with a short
//! message, never with an HTTP error.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::routing::{get, post};
use axum::Router;
use escapade_conversation::application::command_handlers::{
    error_document, handle_inbound_message, welcome_document,
};
use escapade_conversation::domain::commands::HandleInboundMessage;
use escapade_core::command::Command;
use escapade_core::error::EngineError;
use serde::Deserialize;
use tracing::{Span, field, info, instrument};
use uuid::Uuid;

use crate::routes::XmlReply;
use crate::state::AppState;

/// Form fields posted by the gateway.
#[derive(Debug, Deserialize)]
pub struct InboundMessageForm {
    /// Sender, e.g. `whatsapp:+393331234567`.
    #[serde(rename = "From", default)]
    pub from: String,
    /// Message text.
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Project to join, set by the gateway's per-project number.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Gateway message id, logged only.
    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,
}

/// Parses the optional `project_id` field. Blank values count as absent.
fn parse_project_id(raw: Option<&str>) -> Result<Option<Uuid>, EngineError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| EngineError::ProjectNotFound(value.to_owned())),
        None => Ok(None),
    }
}

/// POST /webhooks/whatsapp
#[instrument(
    skip_all,
    fields(phone_number = field::Empty, message_sid = field::Empty)
)]
async fn receive_message(
    State(state): State<AppState>,
    form: Result<Form<InboundMessageForm>, FormRejection>,
) -> XmlReply {
    let ctx = state.engine();
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            let e = EngineError::InvalidRequest(rejection.body_text());
            return XmlReply(error_document(&e, &ctx));
        }
    };
    let span = Span::current();
    span.record("phone_number", form.from.as_str());
    if let Some(sid) = &form.message_sid {
        span.record("message_sid", sid.as_str());
    }

    let project_id = match parse_project_id(form.project_id.as_deref()) {
        Ok(project_id) => project_id,
        Err(e) => return XmlReply(error_document(&e, &ctx)),
    };

    let command = HandleInboundMessage {
        correlation_id: Uuid::new_v4(),
        phone_number: form.from,
        body: form.body,
        project_id,
        message_sid: form.message_sid,
    };

    info!(
        correlation_id = %command.correlation_id(),
        command = command.command_type(),
        "handling command"
    );

    XmlReply(handle_inbound_message(&command, &ctx).await)
}

/// GET /webhooks/whatsapp/welcome
async fn welcome(State(state): State<AppState>) -> XmlReply {
    XmlReply(welcome_document(&state.engine()))
}

/// Returns the webhook router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/whatsapp", post(receive_message))
        .route("/webhooks/whatsapp/welcome", get(welcome))
}
