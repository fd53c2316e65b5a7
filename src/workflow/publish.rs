//! Publishing an approved post to both content stores.
//!
//! The two stores share no transaction. [`PublishOutcome`] names which side
//! effects happened so callers can tell a full publish from a partial one.

use crate::errors::AppError;
use crate::html::{plain_text, sanitize_post_content};
use crate::models::{
    split_categories, CanonicalPost, GenerationKind, NewPost, ParagraphData, PostCriteria,
    PostStatus, PublishDraft, TocData,
};
use crate::AppState;

/// Validated publish input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    title: String,
    content: String,
    categories: Vec<String>,
}

impl PublishRequest {
    /// Normalize operator input: the title and categories become plain
    /// text, the content is filtered through the post allow-list.
    pub fn new(title: &str, content: &str, categories: &str) -> Result<Self, AppError> {
        let title = plain_text(title);
        let content = sanitize_post_content(content).trim().to_string();

        if title.is_empty() || content.is_empty() {
            tracing::warn!("Rejected publish without title or content");
            return Err(AppError::Validation(
                "Title and content are required".to_string(),
            ));
        }

        Ok(Self {
            title,
            content,
            categories: split_categories(&plain_text(categories)),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Which stores received the post.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Canonical post created and mirrored to staging.
    PublishedBoth {
        post: CanonicalPost,
        staging_post_id: i64,
    },
    /// Canonical post created; the staging mirror failed.
    PublishedPrimaryOnly { post: CanonicalPost, error: AppError },
    /// Nothing was published.
    FailedAtPrimary { error: AppError },
}

/// Publish `request` as `operator`.
///
/// Returns `Err` for a duplicate title, which writes nothing, and for a
/// failed duplicate lookup.
pub async fn publish(
    state: &AppState,
    operator: i64,
    request: &PublishRequest,
) -> Result<PublishOutcome, AppError> {
    let title = request.title();
    let content = request.content();

    match state.primary.find_post_by_title(title).await {
        Ok(Some(_)) => {
            tracing::warn!("Rejected duplicate title '{}'", title);
            return Err(AppError::DuplicateTitle(title.to_string()));
        }
        Ok(None) => {}
        Err(e) => return state.audit.failed(operator, title, content, e).await,
    }

    let new_post = NewPost {
        author_id: operator,
        title: title.to_string(),
        content: content.to_string(),
        status: PostStatus::Publish,
    };
    let post = match state.primary.create_post(&new_post).await {
        Ok(post) => post,
        Err(error) => {
            tracing::error!("Failed to publish '{}' to primary store: {}", title, error);
            state.audit.failure(operator, title, content, &error).await;
            return Ok(PublishOutcome::FailedAtPrimary { error });
        }
    };

    attach_primary_categories(state, post.id, request.categories()).await;

    let synced = state
        .staging
        .sync_post(title, content, PostStatus::Publish, request.categories())
        .await;

    cleanup(state, operator).await;

    match synced {
        Ok(staging_post_id) => {
            state
                .audit
                .success(operator, title, content, "Post published to staging")
                .await;
            tracing::info!(
                "Published '{}' as {} (staging {})",
                title,
                post.id,
                staging_post_id
            );
            Ok(PublishOutcome::PublishedBoth {
                post,
                staging_post_id,
            })
        }
        Err(error) => {
            state.audit.failure(operator, title, content, &error).await;
            tracing::error!("Published '{}' but staging sync failed: {}", title, error);
            Ok(PublishOutcome::PublishedPrimaryOnly { post, error })
        }
    }
}

/// Resolve and attach categories in the primary store. Names that cannot be
/// resolved are skipped.
async fn attach_primary_categories(state: &AppState, post_id: i64, names: &[String]) {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        match state.primary.find_or_create_category(name).await {
            Ok(term) => ids.push(term.term_taxonomy_id),
            Err(e) => tracing::warn!("Skipping category '{}': {}", name, e),
        }
    }

    if let Err(e) = state.primary.set_post_categories(post_id, &ids).await {
        tracing::warn!("Failed to attach categories to post {}: {}", post_id, e);
    }
}

/// Drop the staging author's drafts and the operator's generated material.
async fn cleanup(state: &AppState, operator: i64) {
    let drafts = PostCriteria {
        author_id: Some(state.staging.author_id()),
        status: Some(PostStatus::Draft),
    };
    match state.staging.delete_posts(drafts).await {
        Ok(n) => tracing::debug!("Removed {} staging drafts", n),
        Err(e) => tracing::warn!("Failed to remove staging drafts: {}", e),
    }

    if let Err(e) = state
        .primary
        .clear_generation(operator, &[GenerationKind::Toc, GenerationKind::Paragraphs])
        .await
    {
        tracing::warn!("Failed to clear generation state for {}: {}", operator, e);
    }
}

/// Values that pre-fill the approval form: the current staging draft's title
/// and categories, and a body assembled from the operator's TOC and
/// paragraphs (or the draft content when there are no paragraphs).
pub async fn publish_draft(state: &AppState, operator: i64) -> Result<PublishDraft, AppError> {
    let draft = state
        .staging
        .latest_draft(state.staging.author_id())
        .await?;
    let toc: Option<TocData> = state
        .primary
        .load_generation(operator, GenerationKind::Toc)
        .await?;
    let paragraphs: Option<ParagraphData> = state
        .primary
        .load_generation(operator, GenerationKind::Paragraphs)
        .await?;

    let (title, categories) = match &draft {
        Some(draft) => (
            draft.title.clone(),
            state.staging.post_categories(draft.id).await?.join(", "),
        ),
        None => (String::new(), String::new()),
    };

    let body = match (paragraphs, &draft) {
        (Some(paragraphs), _) => paragraphs.html_content,
        (None, Some(draft)) => draft.content.clone(),
        (None, None) => String::new(),
    };

    let content = match toc {
        Some(toc) if !toc.rendered_links.is_empty() => {
            format!("{}\n\n{}", toc.rendered_links.join("\n"), body)
        }
        _ => body,
    };

    Ok(PublishDraft {
        title,
        content,
        categories,
    })
}
