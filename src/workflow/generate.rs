//! Generation flows: call a generator, persist what it produced, audit.

use crate::errors::AppError;
use crate::generators;
use crate::models::{CategoryDraft, GenerationKind, ParagraphData, PostStatus, TocData};
use crate::AppState;

/// Suggest categories for `title` and stage a draft carrying them.
pub async fn generate_category_draft(
    state: &AppState,
    operator: i64,
    title: &str,
) -> Result<CategoryDraft, AppError> {
    let year = state.config.trends_year;

    let suggestions = match generators::generate_categories(&state.llm, title, year).await {
        Ok(suggestions) => suggestions,
        Err(e) => return state.audit.failed(operator, title, "", e).await,
    };

    let content = generators::draft_content(title, year);
    let staging_post_id = match state
        .staging
        .sync_post(title, &content, PostStatus::Draft, &suggestions.names)
        .await
    {
        Ok(id) => id,
        Err(e) => return state.audit.failed(operator, title, &content, e).await,
    };

    state
        .audit
        .success(operator, title, &content, "Draft saved to staging")
        .await;

    Ok(CategoryDraft {
        title: title.to_string(),
        categories: suggestions.names,
        content,
        staging_post_id,
    })
}

/// Generate TOC headings for `title` and keep them as the operator's TOC.
pub async fn generate_toc(state: &AppState, operator: i64, title: &str) -> Result<TocData, AppError> {
    let toc = match generators::generate_toc(&state.llm, title).await {
        Ok(toc) => toc,
        Err(e) => return state.audit.failed(operator, title, "", e).await,
    };

    if let Err(e) = state
        .primary
        .save_generation(operator, GenerationKind::Toc, &toc)
        .await
    {
        return state.audit.failed(operator, title, "", e).await;
    }

    state
        .audit
        .success(operator, title, &toc.rendered_links.join("\n"), "TOC generated")
        .await;

    tracing::info!("Generated {} TOC headings for '{}'", toc.headings.len(), title);
    Ok(toc)
}

/// Generate `count` sections for `topic`, titled from the operator's TOC
/// when one exists, and mirror the result to the staging store.
pub async fn generate_paragraphs(
    state: &AppState,
    operator: i64,
    topic: &str,
    count: usize,
) -> Result<ParagraphData, AppError> {
    let toc: Option<TocData> = match state
        .primary
        .load_generation(operator, GenerationKind::Toc)
        .await
    {
        Ok(toc) => toc,
        Err(e) => return state.audit.failed(operator, topic, "", e).await,
    };

    let paragraphs =
        match generators::generate_paragraphs(&state.llm, topic, count, toc.as_ref()).await {
            Ok(paragraphs) => paragraphs,
            Err(e) => return state.audit.failed(operator, topic, "", e).await,
        };

    let html = paragraphs.html_content.as_str();
    if let Err(e) = state
        .staging
        .sync_post(topic, html, PostStatus::Publish, &[])
        .await
    {
        return state.audit.failed(operator, topic, html, e).await;
    }

    if let Err(e) = state
        .primary
        .save_generation(operator, GenerationKind::Paragraphs, &paragraphs)
        .await
    {
        return state.audit.failed(operator, topic, html, e).await;
    }

    state
        .audit
        .success(operator, topic, html, "Paragraphs synced to staging")
        .await;

    Ok(paragraphs)
}
