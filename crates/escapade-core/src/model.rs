//! Story graph and player progress model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Puzzle attempts granted when a puzzle does not author its own limit.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// A story: one scene graph with a single entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique join keyword.
    pub slug: String,
    /// Scene new sessions start at.
    pub initial_scene_id: Uuid,
}

/// A collectible that puzzles can grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier.
    pub id: Uuid,
    /// Author-facing identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
}

/// Optional media attached to a scene, as storage paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMedia {
    /// GIF, image or video shown with the scene.
    pub gif: Option<String>,
    /// Audio clip played with the scene.
    pub audio: Option<String>,
}

/// Puzzle-only scene fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Question shown to the player.
    pub question: String,
    /// Expected answer, compared case-insensitively.
    pub correct_answer: String,
    /// Rendered on a correct answer.
    pub success_message: String,
    /// Rendered once attempts are exhausted.
    pub failure_message: String,
    /// Authored attempt limit.
    pub max_attempts: Option<u32>,
    /// Item granted on success.
    pub item_id: Option<Uuid>,
    /// Scene to advance to on success.
    pub next_scene_id: Option<Uuid>,
}

impl Puzzle {
    /// Attempts a player gets on arrival: the authored limit (at least one)
    /// or [`DEFAULT_ATTEMPTS`].
    #[must_use]
    pub fn attempts_allowed(&self) -> u32 {
        self.max_attempts.map_or(DEFAULT_ATTEMPTS, |n| n.max(1))
    }
}

/// Behaviour of a scene. Exactly one handler exists per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneKind {
    /// Narrative scene advanced by a continue trigger.
    Intro {
        /// Scene reached on continue; `None` is a soft end.
        next_scene_id: Option<Uuid>,
    },
    /// Scene whose outgoing edges are its choices.
    Investigation,
    /// Question with a single correct answer.
    Puzzle(Puzzle),
    /// Terminal scene.
    Final,
}

impl SceneKind {
    /// Storage name of the variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Intro { .. } => "intro",
            Self::Investigation => "investigation",
            Self::Puzzle(_) => "puzzle",
            Self::Final => "final",
        }
    }
}

/// A node of the story graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene identifier.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Author-facing title.
    pub title: String,
    /// Narrative text, may contain limited markup.
    pub entry_message: String,
    /// Attached media.
    pub media: SceneMedia,
    /// Character shown in the scene (flavour only).
    pub character_id: Option<Uuid>,
    /// Author-facing ordering.
    pub order: i32,
    /// Type-specific behaviour.
    pub kind: SceneKind,
}

impl Scene {
    /// Attempts counter to install when progress arrives here, if any.
    #[must_use]
    pub fn attempts_on_arrival(&self) -> Option<u32> {
        match &self.kind {
            SceneKind::Puzzle(puzzle) => Some(puzzle.attempts_allowed()),
            _ => None,
        }
    }
}

/// An edge out of an investigation scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Choice identifier.
    pub id: Uuid,
    /// Investigation scene owning the choice.
    pub scene_id: Uuid,
    /// Menu text; also accepted verbatim as input.
    pub label: String,
    /// Destination scene.
    pub target_scene_id: Uuid,
    /// Menu position, ascending.
    pub order: i32,
}

/// An item in a player's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedItem {
    /// The collected item.
    pub item_id: Uuid,
    /// When it was first collected.
    pub collected_at: DateTime<Utc>,
}

/// State changes produced by one scene handler invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressMutation {
    /// New current scene.
    pub move_to: Option<Uuid>,
    /// New attempts counter.
    pub attempts_remaining: Option<u32>,
    /// Item to add to the collection.
    pub grant_item: Option<Uuid>,
}

impl ProgressMutation {
    /// A mutation that changes nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Moves to `scene`, installing its arrival attempts counter.
    #[must_use]
    pub fn arrive_at(scene: &Scene) -> Self {
        Self {
            move_to: Some(scene.id),
            attempts_remaining: scene.attempts_on_arrival(),
            grant_item: None,
        }
    }

    /// Returns `true` if applying the mutation changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.move_to.is_none() && self.attempts_remaining.is_none() && self.grant_item.is_none()
    }
}

/// Per-player, per-project session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Progress identifier.
    pub id: Uuid,
    /// Sender identifier in the transport's format.
    pub phone_number: String,
    /// Project being played.
    pub project_id: Uuid,
    /// Current node in the graph.
    pub current_scene_id: Uuid,
    /// Puzzle attempts left.
    pub attempts_remaining: u32,
    /// Items in collection order.
    pub collected_items: Vec<CollectedItem>,
    /// Time of the last inbound message.
    pub last_interaction_at: DateTime<Utc>,
    /// Optimistic concurrency token.
    pub version: i64,
}

impl PlayerProgress {
    /// Creates progress positioned at `initial_scene`.
    #[must_use]
    pub fn start(
        id: Uuid,
        phone_number: &str,
        project_id: Uuid,
        initial_scene: &Scene,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            phone_number: phone_number.to_owned(),
            project_id,
            current_scene_id: initial_scene.id,
            attempts_remaining: initial_scene
                .attempts_on_arrival()
                .unwrap_or(DEFAULT_ATTEMPTS),
            collected_items: Vec::new(),
            last_interaction_at: now,
            version: 0,
        }
    }

    /// Returns `true` if the item is already collected.
    #[must_use]
    pub fn has_item(&self, item_id: Uuid) -> bool {
        self.collected_items.iter().any(|c| c.item_id == item_id)
    }

    /// Adds an item unless already present. Returns `true` if it was added.
    pub fn collect_item(&mut self, item_id: Uuid, collected_at: DateTime<Utc>) -> bool {
        if self.has_item(item_id) {
            return false;
        }
        self.collected_items.push(CollectedItem {
            item_id,
            collected_at,
        });
        true
    }

    /// Applies a handler mutation and stamps the interaction time.
    pub fn apply(&mut self, mutation: &ProgressMutation, now: DateTime<Utc>) {
        if let Some(scene_id) = mutation.move_to {
            self.current_scene_id = scene_id;
        }
        if let Some(attempts) = mutation.attempts_remaining {
            self.attempts_remaining = attempts;
        }
        if let Some(item_id) = mutation.grant_item {
            self.collect_item(item_id, now);
        }
        self.last_interaction_at = now;
    }
}
