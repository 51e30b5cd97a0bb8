//! Column lists shared by the store queries.
//!
//! Table definitions live in the workspace `migrations/` directory.

/// Columns selected for a scene row.
pub const SCENE_COLUMNS: &str = r#"
    id, project_id, title, type, entry_message, media_gif, media_audio,
    puzzle_question, correct_answer, success_message, failure_message,
    max_attempts, item_id, character_id, next_scene_id, "order"
"#;

/// Columns selected for a project row.
pub const PROJECT_COLUMNS: &str = "id, name, slug, initial_scene_id";

/// Columns selected for a choice row.
pub const CHOICE_COLUMNS: &str = r#"id, scene_id, label, target_scene_id, "order""#;

/// Columns selected for a progress row, without its collected items.
pub const PROGRESS_COLUMNS: &str = r"
    id, phone_number, project_id, current_scene_id, attempts_remaining,
    last_interaction_at, version
";
