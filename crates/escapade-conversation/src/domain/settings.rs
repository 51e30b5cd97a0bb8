//! Engine policy and player-facing copy.

/// Default restart sentinel, also used as the welcome message body.
pub const DEFAULT_RESTART_PHRASE: &str = "Send this message to start the game!";

/// Input that advances an intro scene.
pub const CONTINUE_KEYWORD: &str = "1";

/// What is rendered after a scene someone has just arrived in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainingPolicy {
    /// Entry message and media, then one level of follow-up: the choice
    /// menu of an investigation, the question of a puzzle or the continue
    /// prompt of an intro.
    #[default]
    Prologue,
    /// Entry message and media only.
    EntryOnly,
}

impl ChainingPolicy {
    /// Policy from a boolean toggle.
    #[must_use]
    pub fn from_flag(chain: bool) -> Self {
        if chain { Self::Prologue } else { Self::EntryOnly }
    }
}

/// Fixed texts sent by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    /// Appended to an intro that did not advance.
    pub continue_prompt: String,
    /// Sent when an intro without a next scene is continued.
    pub completion: String,
    /// First line of a numbered choice menu.
    pub menu_header: String,
    /// Wrong puzzle answer with attempts left; `{remaining}` is replaced.
    pub wrong_answer: String,
    /// Sent to senders without progress.
    pub join_instructions: String,
    /// Sent when a join or restart names an unknown project.
    pub project_not_found: String,
    /// Sent when a sender tries to start a second project.
    pub session_conflict: String,
    /// Sent when the story data is broken.
    pub configuration_error: String,
    /// Sent when concurrent deliveries kept conflicting.
    pub busy: String,
    /// Sent when the request carries no sender.
    pub missing_sender: String,
    /// Sent for every other failure.
    pub generic_error: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            continue_prompt: "<p>Reply <b>1</b> to continue.</p>".to_owned(),
            completion: "<p>You have completed this part of the game. New adventures are coming soon!</p>"
                .to_owned(),
            menu_header: "<b>Available options:</b>".to_owned(),
            wrong_answer: "<p>Wrong answer. <b>Attempts remaining: {remaining}</b></p>".to_owned(),
            join_instructions: "<p>Welcome! To start playing, send <b>join</b> followed by the game name.</p>"
                .to_owned(),
            project_not_found: "<p>Game not found. Check the name and try again.</p>".to_owned(),
            session_conflict: "<p>You are already playing another game. Finish it before starting a new one.</p>"
                .to_owned(),
            configuration_error: "<p>Configuration error, please contact support.</p>".to_owned(),
            busy: "<p>We received several messages at once. Please try again.</p>".to_owned(),
            missing_sender: "<p>Missing phone number.</p>".to_owned(),
            generic_error: "<p>Something went wrong. Please try again later.</p>".to_owned(),
        }
    }
}

impl Messages {
    /// The wrong-answer notice for `remaining` attempts.
    #[must_use]
    pub fn wrong_answer(&self, remaining: u32) -> String {
        self.wrong_answer.replace("{remaining}", &remaining.to_string())
    }
}

/// Everything the engine needs besides its stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Restart sentinel, compared case-insensitively after trimming.
    pub restart_phrase: String,
    /// Project restarted when the sender has none and names none.
    pub default_project_slug: Option<String>,
    /// Follow-up rendered after arriving in a scene.
    pub chaining: ChainingPolicy,
    /// Engine copy.
    pub messages: Messages,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            restart_phrase: DEFAULT_RESTART_PHRASE.to_owned(),
            default_project_slug: None,
            chaining: ChainingPolicy::default(),
            messages: Messages::default(),
        }
    }
}

impl EngineSettings {
    /// Returns `true` if `text` is the restart sentinel.
    #[must_use]
    pub fn is_restart(&self, text: &str) -> bool {
        let phrase = self.restart_phrase.trim();
        !phrase.is_empty() && text.trim().to_lowercase() == phrase.to_lowercase()
    }
}
