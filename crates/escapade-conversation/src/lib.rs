//! Escapade — conversation engine.
//!
//! Responsible for resolving a sender to their progress record, dispatching
//! the inbound text to the handler of the current scene type, persisting the
//! resulting mutation and rendering the reply document.

pub mod application;
pub mod domain;
