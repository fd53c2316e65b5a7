//! Append-only audit trail of generation, publish and import attempts.
//!
//! Audit writes never fail the operation being audited: a write error is
//! logged and dropped.

use crate::db::PrimaryStore;
use crate::errors::AppError;
use crate::models::{SyncLogEntry, SyncStatus};

/// Largest page returned by [`AuditLog::recent`].
pub const MAX_PAGE: i64 = 200;

/// Writer and reader over the primary store's `sync_logs` table.
#[derive(Clone)]
pub struct AuditLog {
    store: PrimaryStore,
}

impl AuditLog {
    pub fn new(store: PrimaryStore) -> Self {
        Self { store }
    }

    /// Record a successful attempt.
    pub async fn success(&self, user_id: i64, title: &str, content: &str, message: &str) {
        self.append(user_id, title, content, SyncStatus::Success, message)
            .await;
    }

    /// Record a failed attempt. Failures that are the operator's own
    /// mistake are not recorded.
    pub async fn failure(&self, user_id: i64, title: &str, content: &str, error: &AppError) {
        if !error.is_audited() {
            return;
        }
        self.append(user_id, title, content, SyncStatus::Error, &error.message())
            .await;
    }

    /// Record `error` and hand it back, for early returns.
    pub async fn failed<T>(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        error: AppError,
    ) -> Result<T, AppError> {
        self.failure(user_id, title, content, &error).await;
        Err(error)
    }

    /// Newest entries first, at most [`MAX_PAGE`].
    pub async fn recent(&self, limit: i64) -> Result<Vec<SyncLogEntry>, AppError> {
        self.store.list_sync_logs(limit.clamp(1, MAX_PAGE)).await
    }

    async fn append(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        status: SyncStatus,
        message: &str,
    ) {
        if let Err(e) = self
            .store
            .append_sync_log(title, content, status, message, user_id)
            .await
        {
            tracing::error!("Failed to write audit entry for '{}': {}", title, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_primary_database;
    use tempfile::TempDir;

    async fn audit_log() -> (AuditLog, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_primary_database(&dir.path().join("primary.sqlite"))
            .await
            .unwrap();
        (AuditLog::new(PrimaryStore::new(pool)), dir)
    }

    #[tokio::test]
    async fn test_records_success_and_system_failures() {
        let (audit, _dir) = audit_log().await;

        audit.success(3, "Boots", "<p>x</p>", "Draft saved").await;
        audit
            .failure(3, "Boots", "", &AppError::Network("timed out".into()))
            .await;

        let entries = audit.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, SyncStatus::Error);
        assert_eq!(entries[0].message, "timed out");
        assert_eq!(entries[1].status, SyncStatus::Success);
        assert_eq!(entries[1].user_id, 3);
        assert_eq!(entries[1].content, "<p>x</p>");
    }

    #[tokio::test]
    async fn test_operator_mistakes_are_not_recorded() {
        let (audit, _dir) = audit_log().await;

        audit
            .failure(1, "", "", &AppError::Validation("title required".into()))
            .await;
        audit
            .failure(1, "Boots", "", &AppError::DuplicateTitle("Boots".into()))
            .await;

        assert!(audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_returns_error() {
        let (audit, _dir) = audit_log().await;
        let result: Result<(), AppError> = audit
            .failed(1, "Boots", "", AppError::DbWrite("disk full".into()))
            .await;
        assert_eq!(result, Err(AppError::DbWrite("disk full".into())));
        assert_eq!(audit.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_limit_is_clamped() {
        let (audit, _dir) = audit_log().await;
        for i in 0..3 {
            audit.success(1, &format!("Post {}", i), "", "ok").await;
        }
        assert_eq!(audit.recent(0).await.unwrap().len(), 1);
        assert_eq!(audit.recent(-4).await.unwrap().len(), 1);
        assert_eq!(audit.recent(10_000).await.unwrap().len(), 3);
        assert_eq!(audit.recent(2).await.unwrap()[0].post_title, "Post 2");
    }
}
