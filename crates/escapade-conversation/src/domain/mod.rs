//! Scene handlers and the inputs they work on.

pub mod commands;
pub mod handlers;
pub mod settings;
