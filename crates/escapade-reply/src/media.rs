//! Media validation and public URL resolution.

use escapade_core::error::EngineError;
use url::Url;

use crate::block::MediaSlot;

/// Extensions accepted in the visual slot.
pub const VISUAL_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "mp4"];

/// Extensions accepted in the audio slot.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "amr"];

/// MIME category inferred from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
    /// `audio/*`
    Audio,
}

/// Infers the MIME category of `path`, enforcing the slot's allow-list.
///
/// # Errors
///
/// Returns `EngineError::UnsupportedMediaFormat` if the extension is missing
/// or not allowed in `slot`.
pub fn classify(path: &str, slot: MediaSlot) -> Result<MediaKind, EngineError> {
    let extension = extension_of(path)
        .ok_or_else(|| EngineError::UnsupportedMediaFormat(path.to_owned()))?;
    let kind = match slot {
        MediaSlot::Visual if extension == "mp4" => Some(MediaKind::Video),
        MediaSlot::Visual if VISUAL_EXTENSIONS.contains(&extension.as_str()) => {
            Some(MediaKind::Image)
        }
        MediaSlot::Audio if AUDIO_EXTENSIONS.contains(&extension.as_str()) => {
            Some(MediaKind::Audio)
        }
        MediaSlot::Visual | MediaSlot::Audio => None,
    };
    kind.ok_or_else(|| EngineError::UnsupportedMediaFormat(path.to_owned()))
}

fn extension_of(path: &str) -> Option<String> {
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    let file_name = without_query.rsplit('/').next().unwrap_or(without_query);
    let (_, extension) = file_name.rsplit_once('.')?;
    (!extension.is_empty()).then(|| extension.to_ascii_lowercase())
}

/// Maps stored media paths onto public HTTPS URLs.
#[derive(Debug, Clone)]
pub struct MediaUrlResolver {
    base: Url,
}

impl MediaUrlResolver {
    /// Creates a resolver rooted at the public base URL of the deployment.
    #[must_use]
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    /// Resolves a storage path (served under `/storage/`), a host-absolute
    /// path, or an absolute URL. HTTP is upgraded to HTTPS; spaces and other
    /// unsafe characters are percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnsupportedMediaFormat` if the path cannot form
    /// an HTTP(S) URL.
    pub fn resolve(&self, path: &str) -> Result<String, EngineError> {
        let trimmed = path.trim();
        let lower = trimmed.to_ascii_lowercase();
        let mut url = if lower.starts_with("http://") || lower.starts_with("https://") {
            Url::parse(trimmed)
        } else if trimmed.starts_with('/') {
            self.base.join(trimmed)
        } else {
            self.base.join(&format!("storage/{trimmed}"))
        }
        .map_err(|e| EngineError::UnsupportedMediaFormat(format!("{path}: {e}")))?;

        match url.scheme() {
            "https" => {}
            "http" => url.set_scheme("https").map_err(|()| {
                EngineError::UnsupportedMediaFormat(format!("{path}: cannot upgrade to https"))
            })?,
            other => {
                return Err(EngineError::UnsupportedMediaFormat(format!(
                    "{path}: scheme {other} not allowed"
                )));
            }
        }
        Ok(url.to_string())
    }
}
