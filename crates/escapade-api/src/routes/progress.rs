//! Read-only progress inspection.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use escapade_conversation::application::query_handlers::{self, ProgressView};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{project_id}/{phone_number}
#[instrument(skip(state))]
async fn get_progress(
    State(state): State<AppState>,
    Path((project_id, phone_number)): Path<(Uuid, String)>,
) -> Result<Json<ProgressView>, ApiError> {
    let view = query_handlers::get_progress(
        &phone_number,
        project_id,
        state.progress_repository.as_ref(),
        state.story_graph.as_ref(),
    )
    .await?;

    Ok(Json(view))
}

/// Returns the router for progress queries.
pub fn router() -> Router<AppState> {
    Router::new().route("/{project_id}/{phone_number}", get(get_progress))
}
