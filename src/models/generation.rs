//! Generated content kept between operator steps.

use serde::{Deserialize, Serialize};

/// Kind of generation flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Categories,
    Toc,
    Paragraphs,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Categories => "categories",
            GenerationKind::Toc => "toc",
            GenerationKind::Paragraphs => "paragraphs",
        }
    }
}

/// Last generated table of contents for an operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TocData {
    pub source_topic: String,
    pub raw_text: String,
    pub headings: Vec<String>,
    pub rendered_links: Vec<String>,
}

/// Last generated paragraph body for an operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphData {
    pub heading: String,
    pub html_content: String,
}

/// Result of a category generation: the suggestions and the staged draft.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub title: String,
    pub categories: Vec<String>,
    pub content: String,
    pub staging_post_id: i64,
}

/// Values that pre-fill the approval form.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishDraft {
    pub title: String,
    pub content: String,
    pub categories: String,
}
