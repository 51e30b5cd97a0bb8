//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use escapade_conversation::domain::settings::{
    ChainingPolicy, DEFAULT_RESTART_PHRASE, EngineSettings,
};
use url::Url;

use crate::error::AppError;

/// Runtime configuration of the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL media storage paths are resolved against.
    pub public_base_url: Url,
    /// Story file served instead of the database graph.
    pub story_file: Option<PathBuf>,
    /// Project restarted when a sender names none.
    pub default_project_slug: Option<String>,
    /// Restart sentinel.
    pub restart_phrase: String,
    /// Whether arrivals render their follow-up prompt.
    pub chain_scene_prologue: bool,
    /// Connection pool size.
    pub db_max_connections: u32,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key)
                .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let public_base_url = Url::parse(required("PUBLIC_BASE_URL")?.trim())
            .map_err(|e| AppError::Config(format!("PUBLIC_BASE_URL must be a valid URL: {e}")))?;
        let chain_scene_prologue = match var("CHAIN_SCENE_PROLOGUE") {
            Some(raw) => parse_flag("CHAIN_SCENE_PROLOGUE", &raw)?,
            None => true,
        };
        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse().map_err(|e| {
                AppError::Config(format!("DB_MAX_CONNECTIONS must be a positive integer: {e}"))
            })?,
            None => 10,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            public_base_url,
            story_file: var("STORY_FILE").map(PathBuf::from),
            default_project_slug: var("DEFAULT_PROJECT_SLUG").map(|s| s.trim().to_lowercase()),
            restart_phrase: var("RESTART_PHRASE")
                .unwrap_or_else(|| DEFAULT_RESTART_PHRASE.to_owned()),
            chain_scene_prologue,
            db_max_connections,
        })
    }

    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Engine policy derived from the configuration, with the stock copy.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            restart_phrase: self.restart_phrase.clone(),
            default_project_slug: self.default_project_slug.clone(),
            chaining: ChainingPolicy::from_flag(self.chain_scene_prologue),
            ..EngineSettings::default()
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!("{key} must be a boolean, got {other:?}"))),
    }
}
