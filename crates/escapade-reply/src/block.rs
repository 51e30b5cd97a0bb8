//! Renderer input and output units.

/// Which scene media slot a file came from. Each slot has its own
/// extension allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    /// GIF, image or video.
    Visual,
    /// Audio clip.
    Audio,
}

/// One unit of handler output, in send order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Author text with limited markup.
    Text(String),
    /// A stored media file.
    Media {
        /// Storage path or absolute URL.
        path: String,
        /// Slot the file belongs to.
        slot: MediaSlot,
    },
}

impl ContentBlock {
    /// A text block.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    /// A GIF/image/video attachment.
    pub fn visual(path: impl Into<String>) -> Self {
        Self::Media {
            path: path.into(),
            slot: MediaSlot::Visual,
        }
    }

    /// An audio attachment.
    pub fn audio(path: impl Into<String>) -> Self {
        Self::Media {
            path: path.into(),
            slot: MediaSlot::Audio,
        }
    }
}

/// One `<Message>` of the reply document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPart {
    /// Sanitised text.
    Text {
        /// Body content.
        body: String,
        /// Whether the body carries allow-listed markup.
        html: bool,
    },
    /// One attachment.
    Media {
        /// Fully-qualified HTTPS URL.
        url: String,
    },
}

impl ReplyPart {
    /// Text body of the part, if it is a text part.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Text { body, .. } => Some(body),
            Self::Media { .. } => None,
        }
    }
}
