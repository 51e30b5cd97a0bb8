//! Commands for the conversation engine.

use escapade_core::command::Command;
use uuid::Uuid;

/// One inbound message delivered by the messaging gateway.
#[derive(Debug, Clone)]
pub struct HandleInboundMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Sender identifier in the gateway's format.
    pub phone_number: String,
    /// Raw message text.
    pub body: String,
    /// Project context selected by the gateway, if any.
    pub project_id: Option<Uuid>,
    /// Gateway message id, logged only.
    pub message_sid: Option<String>,
}

impl Command for HandleInboundMessage {
    fn command_type(&self) -> &'static str {
        "conversation.handle_inbound_message"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Out-of-band request to (re)start a player at a project's initial scene.
#[derive(Debug, Clone)]
pub struct SendInitialMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Player to start.
    pub phone_number: String,
    /// Project to start; falls back to the active or default project.
    pub project_id: Option<Uuid>,
}

impl Command for SendInitialMessage {
    fn command_type(&self) -> &'static str {
        "conversation.send_initial_message"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
