//! REST API module.
//!
//! Handlers turn requests into [`Command`]s, dispatch them and render the
//! outcome as the JSON envelope (or, for exports, a CSV attachment).
//!
//! [`Command`]: crate::commands::Command

mod generate;
mod postmeta;
mod publish;
mod status;

pub use generate::*;
pub use postmeta::*;
pub use publish::*;
pub use status::*;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::commands::CommandOutput;
use crate::errors::AppError;
use crate::models::CanonicalPost;
use crate::workflow::PublishOutcome;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub notice: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            notice: None,
            data,
        }
    }

    pub fn with_notice(data: T, notice: String) -> Self {
        Self {
            success: true,
            notice: Some(notice),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Map a malformed JSON body onto the error envelope.
pub(crate) fn invalid_body(rejection: JsonRejection) -> AppError {
    tracing::warn!("Rejected request body: {}", rejection.body_text());
    AppError::Validation(rejection.body_text())
}

/// Which stores a publish reached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub state: &'static str,
    pub post: CanonicalPost,
    pub staging_post_id: Option<i64>,
    pub sync_error: Option<String>,
}

impl IntoResponse for CommandOutput {
    fn into_response(self) -> Response {
        let notice = self.notice();
        match self {
            CommandOutput::CategoryDraft(draft) => {
                ApiResponse::with_notice(draft, notice).into_response()
            }
            CommandOutput::Toc(toc) => ApiResponse::with_notice(toc, notice).into_response(),
            CommandOutput::Paragraphs(paragraphs) => {
                ApiResponse::with_notice(paragraphs, notice).into_response()
            }
            CommandOutput::Published(PublishOutcome::PublishedBoth {
                post,
                staging_post_id,
            }) => {
                let report = PublishReport {
                    state: "publishedBoth",
                    post,
                    staging_post_id: Some(staging_post_id),
                    sync_error: None,
                };
                ApiResponse::with_notice(report, notice).into_response()
            }
            CommandOutput::Published(PublishOutcome::PublishedPrimaryOnly { post, error }) => {
                let report = PublishReport {
                    state: "publishedPrimaryOnly",
                    post,
                    staging_post_id: None,
                    sync_error: Some(error.message()),
                };
                ApiResponse::with_notice(report, notice).into_response()
            }
            CommandOutput::Published(PublishOutcome::FailedAtPrimary { error }) => {
                error.into_response()
            }
            CommandOutput::Export(export) => (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", export.filename),
                    ),
                ],
                export.bytes,
            )
                .into_response(),
            CommandOutput::Import(summary) => {
                ApiResponse::with_notice(summary, notice).into_response()
            }
        }
    }
}
