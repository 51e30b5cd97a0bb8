//! YAML story files.
//!
//! A story file lists items, projects and scenes under author-chosen keys.
//! Identifiers are derived from the keys with UUIDv5, so reloading the same
//! file yields the same ids and existing player progress keeps pointing at
//! valid scenes.
//!
//! ```yaml
//! items:
//!   - key: brass-key
//!     name: Brass key
//! projects:
//!   - key: manor
//!     name: The Manor
//!     slug: manor
//!     initial_scene: gate
//! scenes:
//!   - key: gate
//!     project: manor
//!     type: intro
//!     entry_message: "<p>The gate creaks open.</p>"
//!     media_gif: scenes/gate.gif
//!     next: hall
//!   - key: hall
//!     project: manor
//!     type: investigation
//!     entry_message: "<p>Two doors.</p>"
//!     choices:
//!       - label: Left door
//!         target: study
//! ```

use std::collections::HashSet;
use std::path::Path;

use escapade_core::model::{Choice, Item, Project, Puzzle, Scene, SceneKind, SceneMedia};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::StoryError;
use crate::graph::StoryGraph;

/// Namespace for ids derived from story keys.
const STORY_NAMESPACE: Uuid = Uuid::from_u128(0x6f2b_54a1_9c3e_4d8a_b0f7_1e2d_3c4b_5a69);

#[derive(Debug, Deserialize)]
struct StoryDocument {
    #[serde(default)]
    items: Vec<ItemEntry>,
    projects: Vec<ProjectEntry>,
    scenes: Vec<SceneEntry>,
}

#[derive(Debug, Deserialize)]
struct ItemEntry {
    key: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    key: String,
    name: String,
    slug: String,
    initial_scene: String,
}

#[derive(Debug, Deserialize)]
struct SceneEntry {
    key: String,
    project: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type")]
    scene_type: String,
    entry_message: String,
    media_gif: Option<String>,
    media_audio: Option<String>,
    character: Option<String>,
    order: Option<i32>,
    next: Option<String>,
    #[serde(default)]
    choices: Vec<ChoiceEntry>,
    puzzle_question: Option<String>,
    correct_answer: Option<String>,
    success_message: Option<String>,
    failure_message: Option<String>,
    max_attempts: Option<u32>,
    item: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceEntry {
    label: String,
    target: String,
    order: Option<i32>,
}

/// Derives the stable id of a keyed entry.
#[must_use]
pub fn story_id(kind: &str, key: &str) -> Uuid {
    Uuid::new_v5(&STORY_NAMESPACE, format!("{kind}/{key}").as_bytes())
}

/// Reads and validates a story file.
///
/// # Errors
///
/// Returns `StoryError` if the file cannot be read, is malformed, or
/// contains broken references.
pub fn load_story_file(path: &Path) -> Result<StoryGraph, StoryError> {
    let yaml = std::fs::read_to_string(path)?;
    let graph = parse_story(&yaml)?;
    info!(
        path = %path.display(),
        scenes = graph.scene_count(),
        "story file loaded"
    );
    Ok(graph)
}

/// Parses and validates a story document.
///
/// # Errors
///
/// Returns `StoryError` if the document is malformed or contains duplicate
/// keys or broken references.
pub fn parse_story(yaml: &str) -> Result<StoryGraph, StoryError> {
    let document: StoryDocument = serde_yaml::from_str(yaml)?;
    let mut graph = StoryGraph::new();

    let item_keys = unique_keys("item", document.items.iter().map(|i| i.key.as_str()))?;
    let scene_keys = unique_keys("scene", document.scenes.iter().map(|s| s.key.as_str()))?;
    let project_keys = unique_keys("project", document.projects.iter().map(|p| p.key.as_str()))?;
    unique_keys(
        "slug",
        document.projects.iter().map(|p| p.slug.to_lowercase()),
    )?;

    for item in document.items {
        graph.insert_item(Item {
            id: story_id("item", &item.key),
            name: item.name.unwrap_or_else(|| item.key.clone()),
            identifier: item.key,
        });
    }

    for project in document.projects {
        require(&scene_keys, &project.initial_scene, || {
            (format!("project {}", project.key), "scene")
        })?;
        graph.insert_project(Project {
            id: story_id("project", &project.key),
            name: project.name,
            slug: project.slug,
            initial_scene_id: story_id("scene", &project.initial_scene),
        });
    }

    for (position, entry) in document.scenes.into_iter().enumerate() {
        let from = format!("scene {}", entry.key);
        require(&project_keys, &entry.project, || (from.clone(), "project"))?;
        if let Some(next) = &entry.next {
            require(&scene_keys, next, || (from.clone(), "scene"))?;
        }
        for choice in &entry.choices {
            require(&scene_keys, &choice.target, || (from.clone(), "scene"))?;
        }
        if let Some(item) = &entry.item {
            require(&item_keys, item, || (from.clone(), "item"))?;
        }

        let scene_id = story_id("scene", &entry.key);
        for (index, choice) in entry.choices.iter().enumerate() {
            graph.insert_choice(Choice {
                id: story_id("choice", &format!("{}/{index}", entry.key)),
                scene_id,
                label: choice.label.clone(),
                target_scene_id: story_id("scene", &choice.target),
                order: choice.order.unwrap_or_else(|| to_order(index)),
            });
        }

        let kind = scene_kind(&entry)?;
        graph.insert_scene(Scene {
            id: scene_id,
            project_id: story_id("project", &entry.project),
            title: entry.title.unwrap_or_else(|| entry.key.clone()),
            entry_message: entry.entry_message,
            media: SceneMedia {
                gif: entry.media_gif,
                audio: entry.media_audio,
            },
            character_id: entry.character.as_deref().map(|c| story_id("character", c)),
            order: entry.order.unwrap_or_else(|| to_order(position)),
            kind,
        });
    }

    graph.validate()?;
    Ok(graph)
}

fn scene_kind(entry: &SceneEntry) -> Result<SceneKind, StoryError> {
    let next_scene_id = entry.next.as_deref().map(|n| story_id("scene", n));
    match entry.scene_type.as_str() {
        "intro" => Ok(SceneKind::Intro { next_scene_id }),
        "investigation" => Ok(SceneKind::Investigation),
        "final" => Ok(SceneKind::Final),
        "puzzle" => {
            let field = |value: &Option<String>, name: &'static str| {
                value.clone().ok_or_else(|| StoryError::MissingPuzzleField {
                    scene: entry.key.clone(),
                    field: name,
                })
            };
            Ok(SceneKind::Puzzle(Puzzle {
                question: field(&entry.puzzle_question, "puzzle_question")?,
                correct_answer: field(&entry.correct_answer, "correct_answer")?,
                success_message: field(&entry.success_message, "success_message")?,
                failure_message: field(&entry.failure_message, "failure_message")?,
                max_attempts: entry.max_attempts,
                item_id: entry.item.as_deref().map(|i| story_id("item", i)),
                next_scene_id,
            }))
        }
        other => Err(StoryError::UnknownSceneType {
            scene: entry.key.clone(),
            value: other.to_owned(),
        }),
    }
}

fn unique_keys<I, K>(kind: &'static str, keys: I) -> Result<HashSet<String>, StoryError>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut seen = HashSet::new();
    for key in keys {
        let key = key.into();
        if !seen.insert(key.clone()) {
            return Err(StoryError::Duplicate { kind, key });
        }
    }
    Ok(seen)
}

fn require(
    keys: &HashSet<String>,
    key: &str,
    context: impl FnOnce() -> (String, &'static str),
) -> Result<(), StoryError> {
    if keys.contains(key) {
        return Ok(());
    }
    let (from, kind) = context();
    Err(StoryError::DanglingReference {
        from,
        kind,
        key: key.to_owned(),
    })
}

fn to_order(index: usize) -> i32 {
    i32::try_from(index + 1).unwrap_or(i32::MAX)
}
