//! Story fixtures: small scene graphs assembled in code.

use async_trait::async_trait;
use escapade_core::error::EngineError;
use escapade_core::model::{Choice, Item, Project, Puzzle, Scene, SceneKind, SceneMedia};
use escapade_core::repository::StoryGraphRepository;
use escapade_story::StoryGraph;
use escapade_story::file::story_id;
use uuid::Uuid;

/// Id of the scene with key `key`.
#[must_use]
pub fn scene_id(key: &str) -> Uuid {
    story_id("scene", key)
}

/// Id of the project with slug `slug`.
#[must_use]
pub fn project_id(slug: &str) -> Uuid {
    story_id("project", slug)
}

/// Id of the item with key `key`.
#[must_use]
pub fn item_id(key: &str) -> Uuid {
    story_id("item", key)
}

/// A puzzle with stock messages and no limit, reward or edge. Override
/// fields with struct update syntax.
#[must_use]
pub fn puzzle(question: &str, correct_answer: &str) -> Puzzle {
    Puzzle {
        question: question.to_owned(),
        correct_answer: correct_answer.to_owned(),
        success_message: "Correct!".to_owned(),
        failure_message: "Out of attempts.".to_owned(),
        max_attempts: None,
        item_id: None,
        next_scene_id: None,
    }
}

/// Builds a [`StoryGraph`] scene by scene. The first scene added to a
/// project becomes its initial scene. Edges are given as scene keys and are
/// not validated, so dangling references can be staged on purpose.
#[derive(Debug)]
pub struct StoryBuilder {
    graph: StoryGraph,
    finished: Vec<(String, Option<Uuid>)>,
    current: (String, Option<Uuid>),
    scene_count: i32,
}

impl StoryBuilder {
    /// Start a story whose first project has slug `slug`.
    #[must_use]
    pub fn new(slug: &str) -> Self {
        Self {
            graph: StoryGraph::new(),
            finished: Vec::new(),
            current: (slug.to_owned(), None),
            scene_count: 0,
        }
    }

    /// Start another project; following scenes belong to it.
    #[must_use]
    pub fn project(mut self, slug: &str) -> Self {
        let previous = std::mem::replace(&mut self.current, (slug.to_owned(), None));
        self.finished.push(previous);
        self
    }

    /// Add an item.
    #[must_use]
    pub fn item(mut self, key: &str, name: &str) -> Self {
        self.graph.insert_item(Item {
            id: item_id(key),
            identifier: key.to_owned(),
            name: name.to_owned(),
        });
        self
    }

    /// Add an intro scene.
    #[must_use]
    pub fn intro(self, key: &str, message: &str, next: Option<&str>) -> Self {
        self.scene(
            key,
            message,
            SceneKind::Intro {
                next_scene_id: next.map(scene_id),
            },
        )
    }

    /// Add an investigation scene with `(label, target key)` choices in
    /// menu order.
    #[must_use]
    pub fn investigation(mut self, key: &str, message: &str, choices: &[(&str, &str)]) -> Self {
        for (index, (label, target)) in choices.iter().enumerate() {
            self.graph.insert_choice(Choice {
                id: story_id("choice", &format!("{key}/{index}")),
                scene_id: scene_id(key),
                label: (*label).to_owned(),
                target_scene_id: scene_id(target),
                order: i32::try_from(index + 1).unwrap_or(i32::MAX),
            });
        }
        self.scene(key, message, SceneKind::Investigation)
    }

    /// Add a puzzle scene.
    #[must_use]
    pub fn puzzle(self, key: &str, message: &str, puzzle: Puzzle) -> Self {
        self.scene(key, message, SceneKind::Puzzle(puzzle))
    }

    /// Add a final scene.
    #[must_use]
    pub fn final_scene(self, key: &str, message: &str) -> Self {
        self.scene(key, message, SceneKind::Final)
    }

    /// Attach media to an already added scene.
    ///
    /// # Panics
    ///
    /// Panics if no scene with `key` was added.
    #[must_use]
    pub fn media(mut self, key: &str, gif: Option<&str>, audio: Option<&str>) -> Self {
        let mut scene = self
            .graph
            .scene(scene_id(key))
            .cloned()
            .unwrap_or_else(|| panic!("scene {key} must be added before its media"));
        scene.media = SceneMedia {
            gif: gif.map(str::to_owned),
            audio: audio.map(str::to_owned),
        };
        self.graph.insert_scene(scene);
        self
    }

    /// Add a scene of any kind under the current project.
    #[must_use]
    pub fn scene(mut self, key: &str, message: &str, kind: SceneKind) -> Self {
        let id = scene_id(key);
        let project_id = project_id(&self.current.0);
        self.current.1.get_or_insert(id);
        self.scene_count += 1;
        self.graph.insert_scene(Scene {
            id,
            project_id,
            title: key.to_owned(),
            entry_message: message.to_owned(),
            media: SceneMedia::default(),
            character_id: None,
            order: self.scene_count,
            kind,
        });
        self
    }

    /// Finish the graph.
    ///
    /// # Panics
    ///
    /// Panics if a project has no scenes.
    #[must_use]
    pub fn build(mut self) -> StoryGraph {
        self.finished.push(self.current);
        for (slug, initial) in self.finished {
            let initial_scene_id =
                initial.unwrap_or_else(|| panic!("project {slug} has no scenes"));
            self.graph.insert_project(Project {
                id: project_id(&slug),
                name: slug.to_uppercase(),
                slug,
                initial_scene_id,
            });
        }
        self.graph
    }
}

/// A story graph that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingStoryGraph;

#[async_trait]
impl StoryGraphRepository for FailingStoryGraph {
    async fn get_scene(&self, _scene_id: Uuid) -> Result<Scene, EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }

    async fn get_project(&self, _project_id: Uuid) -> Result<Project, EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }

    async fn get_project_by_slug(&self, _slug: &str) -> Result<Project, EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }

    async fn get_choices(&self, _scene_id: Uuid) -> Result<Vec<Choice>, EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }
}
