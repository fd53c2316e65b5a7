//! Table-of-contents headings.

use crate::errors::AppError;
use crate::html::{slugify, SafeHtml};
use crate::llm::{CompletionOptions, LlmClient};
use crate::models::TocData;

use super::fallback_headings;

pub fn toc_prompt(title: &str) -> String {
    format!(
        "Generate H2-level section titles for a blog post about '{}'. Provide one heading per line, without numbering or extra text.",
        title
    )
}

pub fn toc_options() -> CompletionOptions {
    CompletionOptions::new(0.5, 500)
}

/// One heading per non-empty line.
pub fn parse_headings(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<li><a href="#slug">heading</a></li>`
pub fn toc_link(heading: &str) -> SafeHtml {
    let href = format!("#{}", slugify(heading));
    SafeHtml::element(
        "li",
        &[],
        [SafeHtml::element("a", &[("href", href.as_str())], [SafeHtml::text(heading)])],
    )
}

/// Build the TOC record from raw model output, falling back to the fixed
/// heading set when the output has no usable lines.
pub fn build_toc(title: &str, raw: &str) -> TocData {
    let raw_text = raw.trim().to_string();
    let mut headings = parse_headings(&raw_text);
    if headings.is_empty() {
        tracing::warn!("Empty TOC response for '{}', using fallback headings", title);
        headings = fallback_headings(title);
    }

    let rendered_links = headings
        .iter()
        .map(|heading| toc_link(heading).into_string())
        .collect();

    TocData {
        source_topic: title.to_string(),
        raw_text,
        headings,
        rendered_links,
    }
}

pub async fn generate_toc(llm: &LlmClient, title: &str) -> Result<TocData, AppError> {
    let result = llm.complete(&toc_prompt(title), &toc_options()).await?;
    Ok(build_toc(title, result.content()))
}
