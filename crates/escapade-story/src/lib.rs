//! Escapade — story graph store.
//!
//! Serves a project's scene graph from memory. Graphs are either assembled
//! in code or loaded from a YAML story file exported by the authoring tool.

pub mod error;
pub mod file;
pub mod graph;

pub use error::StoryError;
pub use file::{load_story_file, parse_story};
pub use graph::StoryGraph;
