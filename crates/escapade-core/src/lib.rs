//! Escapade Core — shared story model and store contracts.
//!
//! This crate defines the story graph and player progress types, the engine
//! error taxonomy, and the repository traits every other crate depends on.
//! It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod model;
pub mod repository;
