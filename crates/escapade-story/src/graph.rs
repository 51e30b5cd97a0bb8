//! In-memory story graph.

use std::collections::HashMap;

use async_trait::async_trait;
use escapade_core::error::EngineError;
use escapade_core::model::{Choice, Item, Project, Scene, SceneKind};
use escapade_core::repository::StoryGraphRepository;
use uuid::Uuid;

use crate::error::StoryError;

/// A read-only scene graph held in memory.
#[derive(Debug, Clone, Default)]
pub struct StoryGraph {
    projects: HashMap<Uuid, Project>,
    slugs: HashMap<String, Uuid>,
    scenes: HashMap<Uuid, Scene>,
    choices: HashMap<Uuid, Vec<Choice>>,
    items: HashMap<Uuid, Item>,
}

impl StoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a project. Slugs are matched case-insensitively.
    pub fn insert_project(&mut self, project: Project) {
        self.slugs.insert(project.slug.to_lowercase(), project.id);
        self.projects.insert(project.id, project);
    }

    /// Adds or replaces a scene.
    pub fn insert_scene(&mut self, scene: Scene) {
        self.scenes.insert(scene.id, scene);
    }

    /// Adds a choice, keeping the scene's menu sorted by `order`, then id.
    pub fn insert_choice(&mut self, choice: Choice) {
        let menu = self.choices.entry(choice.scene_id).or_default();
        menu.push(choice);
        menu.sort_by_key(|c| (c.order, c.id));
    }

    /// Adds or replaces an item.
    pub fn insert_item(&mut self, item: Item) {
        self.items.insert(item.id, item);
    }

    /// Borrow a scene without going through the async repository.
    #[must_use]
    pub fn scene(&self, scene_id: Uuid) -> Option<&Scene> {
        self.scenes.get(&scene_id)
    }

    /// Number of scenes in the graph.
    #[must_use]
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// All projects, in no particular order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Checks that every edge and reference resolves.
    ///
    /// # Errors
    ///
    /// Returns `StoryError::DanglingReference` for the first broken edge.
    pub fn validate(&self) -> Result<(), StoryError> {
        for project in self.projects.values() {
            let initial = self.scenes.get(&project.initial_scene_id);
            if initial.is_none_or(|scene| scene.project_id != project.id) {
                return Err(dangling(
                    format!("project {}", project.slug),
                    "initial scene",
                    project.initial_scene_id,
                ));
            }
        }

        for scene in self.scenes.values() {
            let from = || format!("scene {}", scene.id);
            if !self.projects.contains_key(&scene.project_id) {
                return Err(dangling(from(), "project", scene.project_id));
            }
            let next = match &scene.kind {
                SceneKind::Intro { next_scene_id } => *next_scene_id,
                SceneKind::Puzzle(puzzle) => {
                    if let Some(item_id) = puzzle.item_id {
                        if !self.items.contains_key(&item_id) {
                            return Err(dangling(from(), "item", item_id));
                        }
                    }
                    puzzle.next_scene_id
                }
                SceneKind::Investigation | SceneKind::Final => None,
            };
            if let Some(next) = next {
                if !self.scenes.contains_key(&next) {
                    return Err(dangling(from(), "scene", next));
                }
            }
        }

        for (scene_id, menu) in &self.choices {
            if !self.scenes.contains_key(scene_id) {
                return Err(dangling(
                    format!("choices of {scene_id}"),
                    "scene",
                    *scene_id,
                ));
            }
            for choice in menu {
                if !self.scenes.contains_key(&choice.target_scene_id) {
                    return Err(dangling(
                        format!("choice {:?}", choice.label),
                        "scene",
                        choice.target_scene_id,
                    ));
                }
            }
        }

        Ok(())
    }
}

fn dangling(from: String, kind: &'static str, id: Uuid) -> StoryError {
    StoryError::DanglingReference {
        from,
        kind,
        key: id.to_string(),
    }
}

#[async_trait]
impl StoryGraphRepository for StoryGraph {
    async fn get_scene(&self, scene_id: Uuid) -> Result<Scene, EngineError> {
        self.scenes
            .get(&scene_id)
            .cloned()
            .ok_or(EngineError::SceneNotFound(scene_id))
    }

    async fn get_project(&self, project_id: Uuid) -> Result<Project, EngineError> {
        self.projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Project, EngineError> {
        self.slugs
            .get(&slug.to_lowercase())
            .and_then(|id| self.projects.get(id))
            .cloned()
            .ok_or_else(|| EngineError::ProjectNotFound(slug.to_owned()))
    }

    async fn get_choices(&self, scene_id: Uuid) -> Result<Vec<Choice>, EngineError> {
        Ok(self.choices.get(&scene_id).cloned().unwrap_or_default())
    }
}
