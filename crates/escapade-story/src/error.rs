//! Story loading errors.

use thiserror::Error;

/// Failures while loading or validating a story graph.
#[derive(Debug, Error)]
pub enum StoryError {
    /// The story file could not be read.
    #[error("cannot read story file: {0}")]
    Io(#[from] std::io::Error),

    /// The story file is not valid YAML for the expected shape.
    #[error("malformed story file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Two entries share a key or slug.
    #[error("duplicate {kind} {key:?}")]
    Duplicate {
        /// What was duplicated ("project", "scene", "item", "slug").
        kind: &'static str,
        /// The duplicated key.
        key: String,
    },

    /// An edge points at something that does not exist.
    #[error("{from} references missing {kind} {key:?}")]
    DanglingReference {
        /// The referencing entry.
        from: String,
        /// What kind of entry is missing.
        kind: &'static str,
        /// The missing key.
        key: String,
    },

    /// A scene type outside intro, investigation, puzzle and final.
    #[error("scene {scene:?} has unknown type {value:?}")]
    UnknownSceneType {
        /// Scene key.
        scene: String,
        /// Raw type value.
        value: String,
    },

    /// A puzzle scene is missing a required field.
    #[error("puzzle scene {scene:?} is missing {field}")]
    MissingPuzzleField {
        /// Scene key.
        scene: String,
        /// Missing field name.
        field: &'static str,
    },
}
