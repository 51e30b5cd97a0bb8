//! Route modules.

pub mod health;
pub mod initial_message;
pub mod progress;
pub mod webhook;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// A gateway reply document, always sent with status 200.
#[derive(Debug)]
pub struct XmlReply(pub String);

impl IntoResponse for XmlReply {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml")], self.0).into_response()
    }
}
