//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every request the engine handles.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable command name used in logs.
    fn command_type(&self) -> &'static str;

    /// Correlation ID that ties log lines for one delivery together.
    fn correlation_id(&self) -> Uuid;
}
