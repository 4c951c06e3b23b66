// src/api/http/study.rs
// Study-guide progress endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, IntoApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub user_id: String,
    pub guide_slug: String,
    pub section_id: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub completed: bool,
}

pub async fn toggle_handler(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    if request.user_id.is_empty() || request.guide_slug.is_empty() || request.section_id.is_empty()
    {
        return Err(ApiError::bad_request(
            "user_id, guide_slug and section_id are required",
        ));
    }

    let completed = state
        .progress
        .toggle_completion(&request.user_id, &request.guide_slug, &request.section_id)
        .await
        .into_api_error("Failed to toggle progress")?;

    info!(
        guide = %request.guide_slug,
        section = %request.section_id,
        completed,
        "progress toggled"
    );

    Ok(Json(ToggleResponse { completed }))
}

#[derive(Deserialize)]
pub struct ProgressQuery {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub guide_slug: String,
    pub sections: Vec<String>,
}

pub async fn progress_handler(
    State(state): State<AppState>,
    Path(guide_slug): Path<String>,
    Query(params): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let sections = state
        .progress
        .load_progress(&params.user_id, &guide_slug)
        .await
        .into_api_error("Failed to load progress")?;

    Ok(Json(ProgressResponse {
        guide_slug,
        sections,
    }))
}
