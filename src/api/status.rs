//! Read-only views of the staging store and the audit log.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::auth::Operator;
use crate::models::{StagingPost, SyncLogEntry};
use crate::AppState;

const DEFAULT_LOG_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

/// GET /api/staging/posts - All staging posts, newest first.
pub async fn list_staging_posts(
    State(state): State<AppState>,
    _operator: Operator,
) -> ApiResult<Vec<StagingPost>> {
    success(state.staging.list_posts().await?)
}

/// GET /api/logs - Recent audit entries, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Vec<SyncLogEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    success(state.audit.recent(limit).await?)
}
