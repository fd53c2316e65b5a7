//! Category suggestions for a post title.

use crate::errors::AppError;
use crate::html::SafeHtml;
use crate::llm::{CompletionOptions, LlmClient};
use crate::models::split_categories;

/// Category names suggested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySuggestions {
    /// The single comma-separated line, quotes removed.
    pub line: String,
    pub names: Vec<String>,
}

pub fn category_prompt(title: &str, year: i32) -> String {
    format!(
        "Generate 10 new post categories for '{}' in a single CSV row. Use highly specific, long-tail keywords aligned with {} SEO trends. Avoid generic terms and ensure high search volume.",
        title, year
    )
}

pub fn category_options() -> CompletionOptions {
    CompletionOptions::new(0.7, 500)
}

/// Strip quote characters and split the line. The number of names is not
/// checked.
pub fn parse_categories(raw: &str) -> CategorySuggestions {
    let line = raw.trim().replace('"', "");
    let names = split_categories(&line);
    CategorySuggestions { line, names }
}

/// Placeholder body of the draft staged for a title.
pub fn draft_content(title: &str, year: i32) -> String {
    format!(
        "This post explores the topic: '{}' and provides valuable insights aligned with {} SEO trends.",
        SafeHtml::text(title),
        year
    )
}

pub async fn generate_categories(
    llm: &LlmClient,
    title: &str,
    year: i32,
) -> Result<CategorySuggestions, AppError> {
    let result = llm
        .complete(&category_prompt(title, year), &category_options())
        .await?;
    Ok(parse_categories(result.content()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_title_and_year() {
        let prompt = category_prompt("Best Hiking Boots", 2025);
        assert!(prompt.contains("'Best Hiking Boots'"));
        assert!(prompt.contains("2025 SEO trends"));
        assert!(prompt.starts_with("Generate 10 new post categories"));
    }

    #[test]
    fn test_parse_strips_quotes() {
        let parsed = parse_categories("\"Trail Boots\", \"Waterproof Hiking Boots\", Alpine Gear\n");
        assert_eq!(parsed.line, "Trail Boots, Waterproof Hiking Boots, Alpine Gear");
        assert_eq!(
            parsed.names,
            vec!["Trail Boots", "Waterproof Hiking Boots", "Alpine Gear"]
        );
    }

    #[test]
    fn test_parse_tolerates_any_count() {
        assert_eq!(parse_categories("Only One").names.len(), 1);
        assert!(parse_categories("   ").names.is_empty());
    }

    #[test]
    fn test_draft_content_escapes_title() {
        let content = draft_content("Boots <b>& Socks</b>", 2025);
        assert!(content.contains("Boots &lt;b&gt;&amp; Socks&lt;/b&gt;"));
        assert!(content.ends_with("aligned with 2025 SEO trends."));
    }
}
