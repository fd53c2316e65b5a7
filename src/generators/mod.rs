//! Prompt construction and response parsing for the three generation flows.
//!
//! Generators are pure apart from the single [`LlmClient`] call; persisting
//! results and writing the audit log happen in the workflow layer.
//!
//! [`LlmClient`]: crate::llm::LlmClient

mod categories;
mod paragraphs;
mod toc;

pub use categories::*;
pub use paragraphs::*;
pub use toc::*;

/// Smallest number of paragraph sections.
pub const MIN_SECTIONS: usize = 1;

/// Largest number of paragraph sections.
pub const MAX_SECTIONS: usize = 10;

/// Heading set used when the model returns nothing usable.
pub fn fallback_headings(topic: &str) -> Vec<String> {
    vec![
        format!("Introduction to {}", topic),
        format!("Benefits of {}", topic),
        format!("How {} Works", topic),
        format!("Common Uses of {}", topic),
        format!("Future of {}", topic),
    ]
}

/// Clamp a requested section count into `MIN_SECTIONS..=MAX_SECTIONS`.
pub fn clamp_section_count(requested: i64) -> usize {
    requested.clamp(MIN_SECTIONS as i64, MAX_SECTIONS as i64) as usize
}
