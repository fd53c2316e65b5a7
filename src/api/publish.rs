//! Publish API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{invalid_body, success, ApiResult};
use crate::auth::Operator;
use crate::commands::{dispatch, Command};
use crate::errors::AppError;
use crate::models::PublishDraft;
use crate::workflow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PublishPostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Comma-separated category names
    #[serde(default)]
    pub categories: String,
}

/// POST /api/publish - Publish an approved post to both stores.
pub async fn publish_post(
    State(state): State<AppState>,
    operator: Operator,
    body: Result<Json<PublishPostRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(invalid_body)?;
    let command = Command::publish(&request.title, &request.content, &request.categories)?;
    Ok(dispatch(&state, operator.id(), command).await?.into_response())
}

/// GET /api/publish/draft - Values that pre-fill the approval form.
pub async fn get_publish_draft(
    State(state): State<AppState>,
    operator: Operator,
) -> ApiResult<PublishDraft> {
    success(workflow::publish_draft(&state, operator.id()).await?)
}
