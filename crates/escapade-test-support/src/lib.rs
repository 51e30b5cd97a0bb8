//! Shared test doubles and story fixtures for the Escapade conversation
//! engine.

mod clock;
mod progress;
mod story;

pub use clock::FixedClock;
pub use escapade_story::StoryGraph;
pub use progress::{
    FailingProgressRepository, InMemoryProgressRepository, InterleavingProgressRepository,
};
pub use story::{FailingStoryGraph, StoryBuilder, item_id, project_id, puzzle, scene_id};
