//! Primary store repository: canonical posts, their categories, the audit
//! log and per-operator generation state.

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::html::slugify;
use crate::models::{
    CanonicalPost, CategoryTerm, GenerationKind, NewPost, PostStatus, SyncLogEntry, SyncStatus,
};

/// Repository over the primary content store.
#[derive(Clone)]
pub struct PrimaryStore {
    pool: SqlitePool,
}

impl PrimaryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== POST OPERATIONS ====================

    /// Find a canonical post by exact, case-sensitive title.
    pub async fn find_post_by_title(&self, title: &str) -> Result<Option<CanonicalPost>, AppError> {
        let row = sqlx::query(
            "SELECT id, author_id, title, content, status, slug, created_at, modified_at FROM posts WHERE title = ? ORDER BY id LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(canonical_post_from_row))
    }

    /// Create a canonical post.
    pub async fn create_post(&self, post: &NewPost) -> Result<CanonicalPost, AppError> {
        let now = Utc::now().to_rfc3339();
        let slug = slugify(&post.title);

        let result = sqlx::query(
            "INSERT INTO posts (author_id, title, content, status, slug, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.status.as_str())
        .bind(&slug)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(CanonicalPost {
            id: result.last_insert_rowid(),
            author_id: post.author_id,
            title: post.title.clone(),
            content: post.content.clone(),
            status: post.status,
            slug,
            created_at: now.clone(),
            modified_at: now,
        })
    }

    /// Count canonical posts.
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// Look up a category by exact name, creating it when absent.
    pub async fn find_or_create_category(&self, name: &str) -> Result<CategoryTerm, AppError> {
        let existing = sqlx::query(
            "SELECT t.term_id, tt.term_taxonomy_id FROM terms t JOIN term_taxonomy tt ON t.term_id = tt.term_id WHERE t.name = ? AND tt.taxonomy = 'category' LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            return Ok(CategoryTerm {
                term_id: row.get("term_id"),
                term_taxonomy_id: row.get("term_taxonomy_id"),
            });
        }

        let mut tx = self.pool.begin().await?;

        let term_id = sqlx::query("INSERT INTO terms (name, slug) VALUES (?, ?)")
            .bind(name)
            .bind(slugify(name))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let term_taxonomy_id = sqlx::query(
            "INSERT INTO term_taxonomy (term_id, taxonomy, count) VALUES (?, 'category', 0)",
        )
        .bind(term_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        tracing::debug!("Created primary category '{}' ({})", name, term_taxonomy_id);

        Ok(CategoryTerm {
            term_id,
            term_taxonomy_id,
        })
    }

    /// Replace a post's category assignment with `term_taxonomy_ids` and
    /// refresh the affected counts.
    pub async fn set_post_categories(
        &self,
        post_id: i64,
        term_taxonomy_ids: &[i64],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let previous: Vec<i64> =
            sqlx::query("SELECT term_taxonomy_id FROM term_relationships WHERE object_id = ?")
                .bind(post_id)
                .fetch_all(&mut *tx)
                .await?
                .iter()
                .map(|row| row.get("term_taxonomy_id"))
                .collect();

        sqlx::query("DELETE FROM term_relationships WHERE object_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        for tt_id in term_taxonomy_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO term_relationships (object_id, term_taxonomy_id) VALUES (?, ?)",
            )
            .bind(post_id)
            .bind(*tt_id)
            .execute(&mut *tx)
            .await?;
        }

        for tt_id in previous.iter().chain(term_taxonomy_ids) {
            sqlx::query(
                "UPDATE term_taxonomy SET count = (SELECT COUNT(*) FROM term_relationships WHERE term_taxonomy_id = ?) WHERE term_taxonomy_id = ?",
            )
            .bind(*tt_id)
            .bind(*tt_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Category names assigned to a canonical post.
    pub async fn post_categories(&self, post_id: i64) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT t.name FROM term_relationships r JOIN term_taxonomy tt ON r.term_taxonomy_id = tt.term_taxonomy_id JOIN terms t ON tt.term_id = t.term_id WHERE r.object_id = ? AND tt.taxonomy = 'category' ORDER BY t.name",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    // ==================== AUDIT LOG ====================

    /// Append one audit row.
    pub async fn append_sync_log(
        &self,
        post_title: &str,
        content: &str,
        status: SyncStatus,
        message: &str,
        user_id: i64,
    ) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO sync_logs (post_title, content, status, message, user_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(post_title)
        .bind(content)
        .bind(status.as_str())
        .bind(message)
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent audit rows, newest first.
    pub async fn list_sync_logs(&self, limit: i64) -> Result<Vec<SyncLogEntry>, AppError> {
        let rows = sqlx::query(
            "SELECT id, post_title, content, status, message, user_id, created_at FROM sync_logs ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(sync_log_from_row).collect())
    }

    // ==================== GENERATION STATE ====================

    /// Store the latest generated value of `kind` for an operator.
    pub async fn save_generation<T: Serialize>(
        &self,
        user_id: i64,
        kind: GenerationKind,
        value: &T,
    ) -> Result<(), AppError> {
        let payload = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode generation state: {}", e)))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO generation_state (user_id, kind, payload, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT(user_id, kind) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(&payload)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the latest generated value of `kind` for an operator.
    pub async fn load_generation<T: DeserializeOwned>(
        &self,
        user_id: i64,
        kind: GenerationKind,
    ) -> Result<Option<T>, AppError> {
        let row = sqlx::query("SELECT payload FROM generation_state WHERE user_id = ? AND kind = ?")
            .bind(user_id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.get("payload");
        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    "Discarding unreadable {} state for user {}: {}",
                    kind.as_str(),
                    user_id,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Drop an operator's stored generation state.
    pub async fn clear_generation(&self, user_id: i64, kinds: &[GenerationKind]) -> Result<(), AppError> {
        for kind in kinds {
            sqlx::query("DELETE FROM generation_state WHERE user_id = ? AND kind = ?")
                .bind(user_id)
                .bind(kind.as_str())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}

// ==================== HELPER FUNCTIONS ====================

fn canonical_post_from_row(row: &sqlx::sqlite::SqliteRow) -> CanonicalPost {
    let status: String = row.get("status");
    CanonicalPost {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        status: PostStatus::from_str(&status).unwrap_or(PostStatus::Publish),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
    }
}

fn sync_log_from_row(row: &sqlx::sqlite::SqliteRow) -> SyncLogEntry {
    let status: String = row.get("status");
    SyncLogEntry {
        id: row.get("id"),
        post_title: row.get("post_title"),
        content: row.get("content"),
        status: SyncStatus::from_str(&status).unwrap_or(SyncStatus::Error),
        message: row.get("message"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_primary_database;
    use crate::models::{ParagraphData, TocData};
    use tempfile::TempDir;

    async fn store() -> (PrimaryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_primary_database(&temp_dir.path().join("primary.sqlite"))
            .await
            .unwrap();
        (PrimaryStore::new(pool), temp_dir)
    }

    fn new_post(title: &str) -> NewPost {
        NewPost {
            author_id: 7,
            title: title.to_string(),
            content: "<p>Body</p>".to_string(),
            status: PostStatus::Publish,
        }
    }

    #[tokio::test]
    async fn test_title_lookup_is_exact() {
        let (store, _dir) = store().await;
        store.create_post(&new_post("Example")).await.unwrap();

        assert!(store.find_post_by_title("Example").await.unwrap().is_some());
        assert!(store.find_post_by_title("example").await.unwrap().is_none());
        assert!(store.find_post_by_title("Example ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_or_create_category_reuses_term() {
        let (store, _dir) = store().await;

        let first = store.find_or_create_category("Trail Boots").await.unwrap();
        let second = store.find_or_create_category("Trail Boots").await.unwrap();
        let other = store.find_or_create_category("Hiking Socks").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn test_set_post_categories() {
        let (store, _dir) = store().await;
        let post = store.create_post(&new_post("Boots")).await.unwrap();
        let a = store.find_or_create_category("Alpine").await.unwrap();
        let b = store.find_or_create_category("Boots").await.unwrap();

        store
            .set_post_categories(post.id, &[a.term_taxonomy_id, b.term_taxonomy_id, a.term_taxonomy_id])
            .await
            .unwrap();

        assert_eq!(
            store.post_categories(post.id).await.unwrap(),
            vec!["Alpine".to_string(), "Boots".to_string()]
        );
    }

    #[tokio::test]
    async fn test_generation_state_is_per_operator() {
        let (store, _dir) = store().await;
        let toc = TocData {
            source_topic: "Boots".into(),
            raw_text: "A\nB".into(),
            headings: vec!["A".into(), "B".into()],
            rendered_links: vec![],
        };

        store.save_generation(1, GenerationKind::Toc, &toc).await.unwrap();

        let mine: Option<TocData> = store.load_generation(1, GenerationKind::Toc).await.unwrap();
        let theirs: Option<TocData> = store.load_generation(2, GenerationKind::Toc).await.unwrap();
        assert_eq!(mine, Some(toc));
        assert_eq!(theirs, None);
    }

    #[tokio::test]
    async fn test_clear_generation() {
        let (store, _dir) = store().await;
        let paragraphs = ParagraphData {
            heading: "Boots".into(),
            html_content: "<div></div>".into(),
        };
        store
            .save_generation(1, GenerationKind::Paragraphs, &paragraphs)
            .await
            .unwrap();

        store
            .clear_generation(1, &[GenerationKind::Toc, GenerationKind::Paragraphs])
            .await
            .unwrap();

        let loaded: Option<ParagraphData> = store
            .load_generation(1, GenerationKind::Paragraphs)
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_sync_log_append_and_list() {
        let (store, _dir) = store().await;
        store
            .append_sync_log("First", "", SyncStatus::Error, "boom", 1)
            .await
            .unwrap();
        store
            .append_sync_log("Second", "<p>x</p>", SyncStatus::Success, "ok", 1)
            .await
            .unwrap();

        let logs = store.list_sync_logs(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].post_title, "Second");
        assert_eq!(logs[0].status, SyncStatus::Success);
        assert_eq!(logs[1].message, "boom");
    }
}
