//! Session resolution, the engine entry points and read-side queries.

pub mod command_handlers;
pub mod context;
pub mod query_handlers;
pub mod session_resolver;
