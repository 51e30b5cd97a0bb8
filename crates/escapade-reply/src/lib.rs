//! Escapade — message renderer.
//!
//! Turns the ordered content blocks produced by scene handlers into reply
//! parts (sanitised text bodies and HTTPS media URLs) and serialises them as
//! the XML document the messaging gateway reads back from the webhook.

pub mod block;
pub mod document;
pub mod media;
pub mod renderer;
pub mod sanitize;

pub use block::{ContentBlock, MediaSlot, ReplyPart};
pub use document::{DocumentError, parse_reply, write_reply};
pub use renderer::ReplyRenderer;
