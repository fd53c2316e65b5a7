//! Postmeta transfer endpoints.

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};

use crate::auth::Operator;
use crate::commands::{dispatch, Command};
use crate::errors::AppError;
use crate::AppState;

/// Multipart field that carries the uploaded CSV.
pub const IMPORT_FIELD: &str = "import_file";

/// GET /api/postmeta/export - Download staging posts and metadata as CSV.
pub async fn export_postmeta(
    State(state): State<AppState>,
    operator: Operator,
) -> Result<Response, AppError> {
    Ok(dispatch(&state, operator.id(), Command::ExportPostMeta)
        .await?
        .into_response())
}

/// POST /api/postmeta/import - Upsert metadata rows from an uploaded CSV.
pub async fn import_postmeta(
    State(state): State<AppState>,
    operator: Operator,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some(IMPORT_FIELD) {
            continue;
        }
        upload = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
            .to_vec();
    }

    let command = Command::import_post_meta(upload)?;
    Ok(dispatch(&state, operator.id(), command).await?.into_response())
}
