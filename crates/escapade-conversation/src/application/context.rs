//! Collaborators borrowed for one engine call.

use escapade_core::clock::Clock;
use escapade_core::repository::{ProgressRepository, StoryGraphRepository};
use escapade_reply::ReplyRenderer;

use crate::domain::settings::EngineSettings;

/// Stores, clock, renderer and settings used by the engine entry points.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    /// Read-only story graph.
    pub graph: &'a dyn StoryGraphRepository,
    /// Player progress store; only the engine writes to it.
    pub progress: &'a dyn ProgressRepository,
    /// Source of interaction timestamps.
    pub clock: &'a dyn Clock,
    /// Reply renderer.
    pub renderer: &'a ReplyRenderer,
    /// Policy and copy.
    pub settings: &'a EngineSettings,
}
