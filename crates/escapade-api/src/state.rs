//! Shared application state.

use std::sync::Arc;

use escapade_conversation::application::context::EngineContext;
use escapade_conversation::domain::settings::EngineSettings;
use escapade_core::clock::Clock;
use escapade_core::repository::{ProgressRepository, StoryGraphRepository};
use escapade_reply::ReplyRenderer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Story graph, from the database or a story file.
    pub story_graph: Arc<dyn StoryGraphRepository>,
    /// Player progress store.
    pub progress_repository: Arc<dyn ProgressRepository>,
    /// Clock for interaction timestamps.
    pub clock: Arc<dyn Clock>,
    /// Reply renderer.
    pub renderer: Arc<ReplyRenderer>,
    /// Engine policy and copy.
    pub settings: Arc<EngineSettings>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        story_graph: Arc<dyn StoryGraphRepository>,
        progress_repository: Arc<dyn ProgressRepository>,
        clock: Arc<dyn Clock>,
        renderer: ReplyRenderer,
        settings: EngineSettings,
    ) -> Self {
        Self {
            story_graph,
            progress_repository,
            clock,
            renderer: Arc::new(renderer),
            settings: Arc::new(settings),
        }
    }

    /// Borrows the collaborators for one engine call.
    #[must_use]
    pub fn engine(&self) -> EngineContext<'_> {
        EngineContext {
            graph: self.story_graph.as_ref(),
            progress: self.progress_repository.as_ref(),
            clock: self.clock.as_ref(),
            renderer: &self.renderer,
            settings: &self.settings,
        }
    }
}
