//! Generation API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::invalid_body;
use crate::auth::Operator;
use crate::commands::{dispatch, Command};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ParagraphsRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_count() -> i64 {
    1
}

/// POST /api/generate/categories - Suggest categories and stage a draft.
pub async fn generate_categories(
    State(state): State<AppState>,
    operator: Operator,
    body: Result<Json<TitleRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(invalid_body)?;
    let command = Command::generate_categories(&request.title)?;
    Ok(dispatch(&state, operator.id(), command).await?.into_response())
}

/// POST /api/generate/toc - Generate table-of-contents headings.
pub async fn generate_toc(
    State(state): State<AppState>,
    operator: Operator,
    body: Result<Json<TitleRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(invalid_body)?;
    let command = Command::generate_toc(&request.title)?;
    Ok(dispatch(&state, operator.id(), command).await?.into_response())
}

/// POST /api/generate/paragraphs - Generate body sections for a topic.
pub async fn generate_paragraphs(
    State(state): State<AppState>,
    operator: Operator,
    body: Result<Json<ParagraphsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(invalid_body)?;
    let command = Command::generate_paragraphs(&request.topic, request.count)?;
    Ok(dispatch(&state, operator.id(), command).await?.into_response())
}
