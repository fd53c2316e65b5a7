//! Post, taxonomy and post-metadata models shared by both content stores.

use serde::{Deserialize, Serialize};

/// Publication state of a post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Publish,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "publish" => Some(PostStatus::Publish),
            _ => None,
        }
    }
}

/// A post row in the staging store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingPost {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub slug: String,
    pub created_at: String,
    pub modified_at: String,
    pub guid: String,
}

/// The authoritative published post in the primary store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPost {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub slug: String,
    pub created_at: String,
    pub modified_at: String,
}

/// Fields for a new post row, in either store.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

/// Partial update of a staging post. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub guid: Option<String>,
}

/// Selection of staging posts for bulk deletion.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostCriteria {
    pub author_id: Option<i64>,
    pub status: Option<PostStatus>,
}

/// Resolved category ids within one store.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTerm {
    pub term_id: i64,
    pub term_taxonomy_id: i64,
}

/// One row of the post + metadata left join.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetaExportRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub date: String,
    pub status: String,
    pub meta_key: Option<String>,
    pub meta_value: Option<String>,
}

/// Result of writing one metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Split a comma-separated category list into trimmed, non-empty names.
pub fn split_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
