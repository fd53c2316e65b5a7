//! Staging store adapter.
//!
//! The staging store is a separate blog deployment reached through its own
//! pool. It is connected lazily on first use; a failed connect is reported
//! as [`AppError::DbConnection`] and retried on the next call.

use chrono::{Local, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;

use crate::errors::AppError;
use crate::html::slugify;
use crate::models::{
    CategoryTerm, NewPost, PostCriteria, PostMetaExportRow, PostStatus, PostUpdate, StagingPost,
    UpsertOutcome,
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Repository over the staging content store.
pub struct StagingStore {
    url: String,
    prefix: String,
    site_url: String,
    author_id: i64,
    pool: OnceCell<SqlitePool>,
}

impl StagingStore {
    /// Create an unconnected store. `prefix` must already be validated.
    pub fn new(url: &str, prefix: &str, site_url: &str, author_id: i64) -> Self {
        Self {
            url: url.to_string(),
            prefix: prefix.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
            author_id,
            pool: OnceCell::new(),
        }
    }

    /// Author that owns generated drafts.
    pub fn author_id(&self) -> i64 {
        self.author_id
    }

    async fn pool(&self) -> Result<&SqlitePool, AppError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = super::connect(&self.url).await.map_err(|e| {
                    tracing::error!("Failed to connect to staging store: {}", e);
                    AppError::DbConnection(format!(
                        "Failed to connect to staging database: {}",
                        e
                    ))
                })?;
                super::run_staging_migrations(&pool, &self.prefix)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to prepare staging tables: {}", e);
                        AppError::DbConnection(format!(
                            "Failed to prepare staging database: {}",
                            e
                        ))
                    })?;
                tracing::info!("Connected to staging store");
                Ok::<_, AppError>(pool)
            })
            .await
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    // ==================== POST OPERATIONS ====================

    /// Insert a post row and return its id.
    pub async fn insert_post(&self, post: &NewPost) -> Result<i64, AppError> {
        let pool = self.pool().await?;
        let local = Local::now().format(DATE_FORMAT).to_string();
        let gmt = Utc::now().format(DATE_FORMAT).to_string();

        let sql = format!(
            "INSERT INTO {} (post_author, post_date, post_date_gmt, post_content, post_title, post_excerpt, post_status, comment_status, ping_status, post_name, post_modified, post_modified_gmt, post_parent, guid, menu_order, post_type, comment_count) VALUES (?, ?, ?, ?, ?, '', ?, 'open', 'open', ?, ?, ?, 0, ?, 0, 'post', 0)",
            self.table("posts")
        );

        let result = sqlx::query(&sql)
            .bind(post.author_id)
            .bind(&local)
            .bind(&gmt)
            .bind(&post.content)
            .bind(&post.title)
            .bind(post.status.as_str())
            .bind(slugify(&post.title))
            .bind(&local)
            .bind(&gmt)
            .bind(format!("{}/?p=", self.site_url))
            .execute(pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Apply a partial update. Returns false when no row matched.
    pub async fn update_post(&self, id: i64, update: &PostUpdate) -> Result<bool, AppError> {
        let pool = self.pool().await?;
        let local = Local::now().format(DATE_FORMAT).to_string();
        let gmt = Utc::now().format(DATE_FORMAT).to_string();

        let sql = format!(
            "UPDATE {} SET post_title = COALESCE(?, post_title), post_name = COALESCE(?, post_name), post_content = COALESCE(?, post_content), post_status = COALESCE(?, post_status), guid = COALESCE(?, guid), post_modified = ?, post_modified_gmt = ? WHERE ID = ?",
            self.table("posts")
        );

        let result = sqlx::query(&sql)
            .bind(&update.title)
            .bind(update.title.as_deref().map(slugify))
            .bind(&update.content)
            .bind(update.status.map(|s| s.as_str()))
            .bind(&update.guid)
            .bind(&local)
            .bind(&gmt)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete posts matching every set criterion together with their metadata
    /// and category relationships, then recompute the affected term counts.
    /// Returns the deleted post count.
    pub async fn delete_posts(&self, criteria: PostCriteria) -> Result<u64, AppError> {
        let pool = self.pool().await?;
        let matching = format!(
            "SELECT ID FROM {} WHERE (? IS NULL OR post_author = ?) AND (? IS NULL OR post_status = ?)",
            self.table("posts")
        );
        let status = criteria.status.map(|s| s.as_str());

        let mut tx = pool.begin().await?;

        let affected_sql = format!(
            "SELECT DISTINCT term_taxonomy_id FROM {} WHERE object_id IN ({})",
            self.table("term_relationships"),
            matching
        );
        let affected: Vec<i64> = sqlx::query(&affected_sql)
            .bind(criteria.author_id)
            .bind(criteria.author_id)
            .bind(status)
            .bind(status)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.get("term_taxonomy_id"))
            .collect();

        for (table, column) in [("postmeta", "post_id"), ("term_relationships", "object_id")] {
            let sql = format!(
                "DELETE FROM {} WHERE {} IN ({})",
                self.table(table),
                column,
                matching
            );
            sqlx::query(&sql)
                .bind(criteria.author_id)
                .bind(criteria.author_id)
                .bind(status)
                .bind(status)
                .execute(&mut *tx)
                .await?;
        }

        let delete_posts = format!(
            "DELETE FROM {} WHERE (? IS NULL OR post_author = ?) AND (? IS NULL OR post_status = ?)",
            self.table("posts")
        );
        let result = sqlx::query(&delete_posts)
            .bind(criteria.author_id)
            .bind(criteria.author_id)
            .bind(status)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        let recount = format!(
            "UPDATE {tt} SET count = (SELECT COUNT(*) FROM {tr} WHERE term_taxonomy_id = ?) WHERE term_taxonomy_id = ?",
            tt = self.table("term_taxonomy"),
            tr = self.table("term_relationships")
        );
        for term_taxonomy_id in affected {
            sqlx::query(&recount)
                .bind(term_taxonomy_id)
                .bind(term_taxonomy_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Whether a post with this id exists.
    pub async fn post_exists(&self, id: i64) -> Result<bool, AppError> {
        let pool = self.pool().await?;
        let sql = format!("SELECT ID FROM {} WHERE ID = ?", self.table("posts"));
        let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
        Ok(row.is_some())
    }

    /// Get a post by id.
    pub async fn get_post(&self, id: i64) -> Result<Option<StagingPost>, AppError> {
        let pool = self.pool().await?;
        let sql = format!("{} WHERE ID = ?", self.select_posts());
        let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
        Ok(row.as_ref().map(staging_post_from_row))
    }

    /// The most recent draft owned by `author_id`.
    pub async fn latest_draft(&self, author_id: i64) -> Result<Option<StagingPost>, AppError> {
        let pool = self.pool().await?;
        let sql = format!(
            "{} WHERE post_author = ? AND post_status = 'draft' ORDER BY post_date DESC, ID DESC LIMIT 1",
            self.select_posts()
        );
        let row = sqlx::query(&sql).bind(author_id).fetch_optional(pool).await?;
        Ok(row.as_ref().map(staging_post_from_row))
    }

    /// All posts, newest first.
    pub async fn list_posts(&self) -> Result<Vec<StagingPost>, AppError> {
        let pool = self.pool().await?;
        let sql = format!("{} ORDER BY post_date DESC, ID DESC", self.select_posts());
        let rows = sqlx::query(&sql).fetch_all(pool).await?;
        Ok(rows.iter().map(staging_post_from_row).collect())
    }

    fn select_posts(&self) -> String {
        format!(
            "SELECT ID, post_author, post_title, post_content, post_status, post_name, post_date, post_modified, guid FROM {}",
            self.table("posts")
        )
    }

    /// Insert a post, point its guid at the staging site and attach categories.
    pub async fn sync_post(
        &self,
        title: &str,
        content: &str,
        status: PostStatus,
        categories: &[String],
    ) -> Result<i64, AppError> {
        let post_id = self
            .insert_post(&NewPost {
                author_id: self.author_id,
                title: title.to_string(),
                content: content.to_string(),
                status,
            })
            .await?;

        let update = PostUpdate {
            guid: Some(format!("{}/?p={}", self.site_url, post_id)),
            ..Default::default()
        };
        self.update_post(post_id, &update).await?;

        for name in categories {
            let term = self.find_or_create_category_term(name).await?;
            self.attach_category(post_id, term.term_taxonomy_id).await?;
        }

        tracing::info!(
            "Synced '{}' to staging as {} ({} categories)",
            title,
            post_id,
            categories.len()
        );

        Ok(post_id)
    }

    // ==================== TAXONOMY OPERATIONS ====================

    /// Look up a category term by exact name, creating the term and its
    /// taxonomy row when absent.
    pub async fn find_or_create_category_term(&self, name: &str) -> Result<CategoryTerm, AppError> {
        let pool = self.pool().await?;

        let lookup = format!(
            "SELECT t.term_id, tt.term_taxonomy_id FROM {} t JOIN {} tt ON t.term_id = tt.term_id WHERE t.name = ? AND tt.taxonomy = 'category' LIMIT 1",
            self.table("terms"),
            self.table("term_taxonomy")
        );
        if let Some(row) = sqlx::query(&lookup).bind(name).fetch_optional(pool).await? {
            return Ok(CategoryTerm {
                term_id: row.get("term_id"),
                term_taxonomy_id: row.get("term_taxonomy_id"),
            });
        }

        let insert_term = format!(
            "INSERT INTO {} (name, slug, term_group) VALUES (?, ?, 0)",
            self.table("terms")
        );
        let term_id = sqlx::query(&insert_term)
            .bind(name)
            .bind(slugify(name))
            .execute(pool)
            .await?
            .last_insert_rowid();

        let insert_taxonomy = format!(
            "INSERT INTO {} (term_id, taxonomy, description, parent, count) VALUES (?, 'category', '', 0, 0)",
            self.table("term_taxonomy")
        );
        let term_taxonomy_id = sqlx::query(&insert_taxonomy)
            .bind(term_id)
            .execute(pool)
            .await?
            .last_insert_rowid();

        tracing::debug!("Created staging category '{}' ({})", name, term_taxonomy_id);

        Ok(CategoryTerm {
            term_id,
            term_taxonomy_id,
        })
    }

    /// Link a post to a category and refresh the category's count.
    ///
    /// The count is recomputed from the relationship rows after the insert.
    /// The two statements are not wrapped in a transaction, so concurrent
    /// writers can leave a stale count until the next attach.
    pub async fn attach_category(&self, post_id: i64, term_taxonomy_id: i64) -> Result<(), AppError> {
        let pool = self.pool().await?;

        let insert = format!(
            "INSERT OR IGNORE INTO {} (object_id, term_taxonomy_id, term_order) VALUES (?, ?, 0)",
            self.table("term_relationships")
        );
        sqlx::query(&insert)
            .bind(post_id)
            .bind(term_taxonomy_id)
            .execute(pool)
            .await?;

        let recount = format!(
            "UPDATE {tt} SET count = (SELECT COUNT(*) FROM {tr} WHERE term_taxonomy_id = ?) WHERE term_taxonomy_id = ?",
            tt = self.table("term_taxonomy"),
            tr = self.table("term_relationships")
        );
        sqlx::query(&recount)
            .bind(term_taxonomy_id)
            .bind(term_taxonomy_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Stored count of a taxonomy row.
    pub async fn term_count(&self, term_taxonomy_id: i64) -> Result<Option<i64>, AppError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT count FROM {} WHERE term_taxonomy_id = ?",
            self.table("term_taxonomy")
        );
        let row = sqlx::query(&sql)
            .bind(term_taxonomy_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.get("count")))
    }

    /// Category names attached to a staging post.
    pub async fn post_categories(&self, post_id: i64) -> Result<Vec<String>, AppError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT t.name FROM {tr} r JOIN {tt} tt ON r.term_taxonomy_id = tt.term_taxonomy_id JOIN {t} t ON tt.term_id = t.term_id WHERE r.object_id = ? AND tt.taxonomy = 'category' ORDER BY r.rowid",
            tr = self.table("term_relationships"),
            tt = self.table("term_taxonomy"),
            t = self.table("terms")
        );
        let rows = sqlx::query(&sql).bind(post_id).fetch_all(pool).await?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    // ==================== POST METADATA ====================

    /// Every post joined with its metadata rows, newest post first.
    /// Posts without metadata appear once with empty meta fields.
    pub async fn export_post_meta(&self) -> Result<Vec<PostMetaExportRow>, AppError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT p.ID, p.post_title, p.post_content, p.post_date, p.post_status, pm.meta_key, pm.meta_value FROM {} p LEFT JOIN {} pm ON p.ID = pm.post_id ORDER BY p.post_date DESC, p.ID DESC, pm.meta_id",
            self.table("posts"),
            self.table("postmeta")
        );

        let rows = sqlx::query(&sql).fetch_all(pool).await?;
        if rows.is_empty() {
            return Err(AppError::NoData(
                "No post metadata found to export".to_string(),
            ));
        }

        Ok(rows
            .iter()
            .map(|row| PostMetaExportRow {
                id: row.get("ID"),
                title: row.get("post_title"),
                content: row.get("post_content"),
                date: row.get("post_date"),
                status: row.get("post_status"),
                meta_key: row.get("meta_key"),
                meta_value: row.get("meta_value"),
            })
            .collect())
    }

    /// Insert or update the metadata row identified by (post_id, key).
    pub async fn upsert_post_meta(
        &self,
        post_id: i64,
        key: &str,
        value: &str,
    ) -> Result<UpsertOutcome, AppError> {
        if key.trim().is_empty() {
            return Err(AppError::Validation("meta_key is required".to_string()));
        }
        if !self.post_exists(post_id).await? {
            return Err(AppError::ForeignKeyMissing(post_id));
        }

        let pool = self.pool().await?;
        let lookup = format!(
            "SELECT meta_id FROM {} WHERE post_id = ? AND meta_key = ? ORDER BY meta_id LIMIT 1",
            self.table("postmeta")
        );
        let existing = sqlx::query(&lookup)
            .bind(post_id)
            .bind(key)
            .fetch_optional(pool)
            .await?;

        match existing {
            Some(row) => {
                let meta_id: i64 = row.get("meta_id");
                let update = format!(
                    "UPDATE {} SET meta_value = ? WHERE meta_id = ?",
                    self.table("postmeta")
                );
                sqlx::query(&update)
                    .bind(value)
                    .bind(meta_id)
                    .execute(pool)
                    .await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let insert = format!(
                    "INSERT INTO {} (post_id, meta_key, meta_value) VALUES (?, ?, ?)",
                    self.table("postmeta")
                );
                sqlx::query(&insert)
                    .bind(post_id)
                    .bind(key)
                    .bind(value)
                    .execute(pool)
                    .await?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// Metadata value for (post_id, key), if any.
    pub async fn post_meta(&self, post_id: i64, key: &str) -> Result<Option<String>, AppError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT meta_value FROM {} WHERE post_id = ? AND meta_key = ? ORDER BY meta_id LIMIT 1",
            self.table("postmeta")
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .bind(key)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(|r| r.get("meta_value")))
    }
}

// ==================== HELPER FUNCTIONS ====================

fn staging_post_from_row(row: &sqlx::sqlite::SqliteRow) -> StagingPost {
    let status: String = row.get("post_status");
    StagingPost {
        id: row.get("ID"),
        author_id: row.get("post_author"),
        title: row.get("post_title"),
        content: row.get("post_content"),
        status: PostStatus::from_str(&status).unwrap_or(PostStatus::Draft),
        slug: row.get("post_name"),
        created_at: row.get("post_date"),
        modified_at: row.get("post_modified"),
        guid: row.get("guid"),
    }
}
