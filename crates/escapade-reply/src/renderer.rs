//! Content blocks to reply parts.

use escapade_core::error::EngineError;
use tracing::debug;
use url::Url;

use crate::block::{ContentBlock, ReplyPart};
use crate::document::write_reply;
use crate::media::{MediaUrlResolver, classify};
use crate::sanitize::{contains_markup, sanitize_body};

/// Renders handler output for the messaging gateway.
#[derive(Debug, Clone)]
pub struct ReplyRenderer {
    resolver: MediaUrlResolver,
}

impl ReplyRenderer {
    /// Creates a renderer that resolves media against `public_base_url`.
    #[must_use]
    pub fn new(public_base_url: Url) -> Self {
        Self {
            resolver: MediaUrlResolver::new(public_base_url),
        }
    }

    /// Sanitises text and resolves media, preserving block order. Text that
    /// sanitises to nothing is dropped.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnsupportedMediaFormat` if any media block has a
    /// disallowed extension or an unusable URL. Nothing is rendered then.
    pub fn render(&self, blocks: &[ContentBlock]) -> Result<Vec<ReplyPart>, EngineError> {
        let mut parts = Vec::with_capacity(blocks.len());
        for block in blocks {
            match block {
                ContentBlock::Text(raw) => {
                    let body = sanitize_body(raw);
                    if body.is_empty() {
                        continue;
                    }
                    let html = contains_markup(&body);
                    parts.push(ReplyPart::Text { body, html });
                }
                ContentBlock::Media { path, slot } => {
                    let kind = classify(path, *slot)?;
                    let url = self.resolver.resolve(path)?;
                    debug!(%url, ?kind, "media attached");
                    parts.push(ReplyPart::Media { url });
                }
            }
        }
        Ok(parts)
    }

    /// Renders blocks straight into a reply document.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ReplyRenderer::render`] and
    /// `EngineError::TransportError` if serialisation fails.
    pub fn render_document(&self, blocks: &[ContentBlock]) -> Result<String, EngineError> {
        write_reply(&self.render(blocks)?)
    }
}
