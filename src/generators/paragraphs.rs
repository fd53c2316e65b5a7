//! Multi-section paragraph bodies.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::AppError;
use crate::html::{slugify, SafeHtml};
use crate::llm::{CompletionOptions, LlmClient};
use crate::models::{ParagraphData, TocData};

use super::fallback_headings;

static H2_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h2>").expect("valid h2 pattern"));

static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2>(.*?)</h2>(.*)").expect("valid section pattern"));

static OUTER_P: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^<p\b[^>]*>(.*)</p>$").expect("valid paragraph pattern"));

pub const NO_CONTENT: &str = "No paragraph content generated";

/// One parsed `<h2>` section of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// Titles for `count` sections: the TOC headings (or the fallback set),
/// truncated, then padded from the fallback set and finally with numbered
/// parts.
pub fn section_titles(topic: &str, toc: Option<&TocData>, count: usize) -> Vec<String> {
    let fallback = fallback_headings(topic);
    let mut titles: Vec<String> = match toc {
        Some(toc) if !toc.headings.is_empty() => toc.headings.clone(),
        _ => fallback.clone(),
    };
    titles.truncate(count);

    for title in fallback {
        if titles.len() >= count {
            break;
        }
        if !titles.contains(&title) {
            titles.push(title);
        }
    }

    let mut part = titles.len() + 1;
    while titles.len() < count {
        titles.push(format!("{}: Part {}", topic, part));
        part += 1;
    }

    titles
}

pub fn paragraph_prompt(topic: &str, titles: &[String]) -> String {
    let listed = titles
        .iter()
        .map(|title| format!("- {}", title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "For the topic '{}', write {} SEO-optimized sections.\n\
         For each section:\n\
         - Output a <h2> with the exact section title.\n\
         - Then immediately after, output a <p> with an ID generated from the title (lowercase, hyphens instead of spaces).\n\
         - The paragraph should be around 100 words.\n\
         - Use natural language, no lists, no extra formatting.\n\n\
         Section Titles:\n{}",
        topic,
        titles.len(),
        listed
    )
}

pub fn paragraph_options() -> CompletionOptions {
    CompletionOptions::new(0.7, 3000)
}

/// Split before every `<h2>` and keep the chunks that carry a heading and a
/// non-empty body.
pub fn parse_sections(output: &str) -> Vec<Section> {
    let mut starts: Vec<usize> = H2_OPEN.find_iter(output).map(|m| m.start()).collect();
    starts.push(output.len());

    let mut chunks = Vec::with_capacity(starts.len());
    if starts[0] > 0 {
        chunks.push(&output[..starts[0]]);
    }
    for pair in starts.windows(2) {
        chunks.push(&output[pair[0]..pair[1]]);
    }

    chunks
        .into_iter()
        .filter_map(|chunk| {
            let caps = SECTION.captures(chunk)?;
            let heading = caps.get(1)?.as_str().trim().to_string();
            let body = unwrap_paragraph(caps.get(2)?.as_str().trim()).trim().to_string();
            if body.is_empty() {
                return None;
            }
            Some(Section { heading, body })
        })
        .collect()
}

/// Drop a single `<p ...>` wrapping the whole body so the rebuilt markup does
/// not nest paragraphs.
fn unwrap_paragraph(body: &str) -> &str {
    match OUTER_P.captures(body).and_then(|caps| caps.get(1)) {
        Some(inner) if !inner.as_str().to_ascii_lowercase().contains("<p") => inner.as_str(),
        _ => body,
    }
}

/// `<div class="seo-paragraphs">` with one `<h2>` and `<p id>` pair per
/// section.
pub fn render_sections(sections: &[Section]) -> SafeHtml {
    let parts = sections.iter().flat_map(|section| {
        let anchor = slugify(&section.heading);
        [
            SafeHtml::element("h2", &[], [SafeHtml::text(&section.heading)]),
            SafeHtml::element(
                "p",
                &[("id", anchor.as_str())],
                [SafeHtml::sanitized(&section.body)],
            ),
        ]
    });
    SafeHtml::element("div", &[("class", "seo-paragraphs")], parts)
}

pub async fn generate_paragraphs(
    llm: &LlmClient,
    topic: &str,
    count: usize,
    toc: Option<&TocData>,
) -> Result<ParagraphData, AppError> {
    let titles = section_titles(topic, toc, count);
    let result = llm
        .complete(&paragraph_prompt(topic, &titles), &paragraph_options())
        .await?;

    let output = result.content().trim();
    if output.is_empty() {
        return Err(AppError::InvalidResponse(NO_CONTENT.to_string()));
    }

    let sections = parse_sections(output);
    if sections.is_empty() {
        tracing::warn!("Paragraph response for '{}' had no usable sections", topic);
        return Err(AppError::InvalidResponse(NO_CONTENT.to_string()));
    }

    Ok(ParagraphData {
        heading: topic.to_string(),
        html_content: render_sections(&sections).into_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toc_with(headings: &[&str]) -> TocData {
        TocData {
            source_topic: "Boots".to_string(),
            headings: headings.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_titles_from_toc_truncated() {
        let toc = toc_with(&["A", "B", "C", "D"]);
        assert_eq!(section_titles("Boots", Some(&toc), 2), vec!["A", "B"]);
    }

    #[test]
    fn test_titles_without_toc_use_fallback() {
        let titles = section_titles("Boots", None, 3);
        assert_eq!(titles, fallback_headings("Boots")[..3].to_vec());
        let empty = toc_with(&[]);
        assert_eq!(section_titles("Boots", Some(&empty), 3), titles);
    }

    #[test]
    fn test_titles_padded_to_count() {
        let toc = toc_with(&["Introduction to Boots", "Sizing"]);
        let titles = section_titles("Boots", Some(&toc), 8);
        assert_eq!(titles.len(), 8);
        assert_eq!(titles[0], "Introduction to Boots");
        assert_eq!(titles[1], "Sizing");
        assert_eq!(titles[2], "Benefits of Boots");
        assert_eq!(titles[5], "Future of Boots");
        assert_eq!(titles[6], "Boots: Part 7");
        assert_eq!(titles[7], "Boots: Part 8");
        assert_eq!(
            titles.iter().filter(|t| t.as_str() == "Introduction to Boots").count(),
            1
        );
    }

    #[test]
    fn test_prompt_lists_titles() {
        let titles = vec!["Why Boots".to_string(), "Fit Guide".to_string()];
        let prompt = paragraph_prompt("Boots", &titles);
        assert!(prompt.starts_with("For the topic 'Boots', write 2 SEO-optimized sections."));
        assert!(prompt.ends_with("Section Titles:\n- Why Boots\n- Fit Guide"));
        assert!(prompt.contains("around 100 words"));
    }

    #[test]
    fn test_parse_sections_case_insensitive() {
        let output = "Intro text\n<h2>First</h2><p id=\"first\">One body.</p>\n<H2>Second</H2>\nTwo body.";
        let sections = parse_sections(output);
        assert_eq!(
            sections,
            vec![
                Section {
                    heading: "First".to_string(),
                    body: "One body.".to_string()
                },
                Section {
                    heading: "Second".to_string(),
                    body: "Two body.".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_drops_empty_and_unmatched_chunks() {
        let output = "<h2>Empty</h2>   <h2>Unclosed heading <h2>Kept</h2><p></p> more";
        let sections = parse_sections(output);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Kept");
        assert_eq!(sections[0].body, "<p></p> more");
        assert!(parse_sections("<h2>Only</h2><p class=\"x\">  </p>").is_empty());
        assert!(parse_sections("no headings at all").is_empty());
    }

    #[test]
    fn test_unwrap_only_single_paragraph() {
        assert_eq!(unwrap_paragraph("<p id=\"a\">Body</p>"), "Body");
        assert_eq!(
            unwrap_paragraph("<p>One</p><p>Two</p>"),
            "<p>One</p><p>Two</p>"
        );
        assert_eq!(unwrap_paragraph("Plain"), "Plain");
    }

    #[test]
    fn test_render_escapes_heading_and_sanitizes_body() {
        let sections = vec![Section {
            heading: "Boots & <Socks>".to_string(),
            body: "Warm <strong>feet</strong><script>x()</script>".to_string(),
        }];
        assert_eq!(
            render_sections(&sections).as_str(),
            "<div class=\"seo-paragraphs\"><h2>Boots &amp; &lt;Socks&gt;</h2>\
             <p id=\"boots-socks\">Warm <strong>feet</strong></p></div>"
        );
    }
}
