//! The six operator intents and their single dispatcher.
//!
//! Each [`Command`] variant carries input that has already been validated by
//! its constructor, so [`dispatch`] never sees empty titles or topics.

use crate::errors::AppError;
use crate::generators::clamp_section_count;
use crate::html::plain_text;
use crate::models::{CategoryDraft, ParagraphData, TocData};
use crate::workflow::{self, CsvExport, ImportSummary, PublishOutcome, PublishRequest};
use crate::AppState;

/// Shortest accepted paragraph topic, in characters.
pub const MIN_TOPIC_LEN: usize = 3;

/// Longest accepted title or topic, in characters.
pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone)]
pub enum Command {
    GenerateCategories { title: String },
    GenerateToc { title: String },
    GenerateParagraphs { topic: String, count: usize },
    Publish(PublishRequest),
    ExportPostMeta,
    ImportPostMeta { csv: Vec<u8> },
}

/// What a command produced.
#[derive(Debug)]
pub enum CommandOutput {
    CategoryDraft(CategoryDraft),
    Toc(TocData),
    Paragraphs(ParagraphData),
    Published(PublishOutcome),
    Export(CsvExport),
    Import(ImportSummary),
}

fn title_input(raw: &str, what: &str) -> Result<String, AppError> {
    let title = plain_text(raw);
    if title.is_empty() {
        return Err(AppError::Validation(format!("{} is required", what)));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            what, MAX_TITLE_LEN
        )));
    }
    Ok(title)
}

impl Command {
    pub fn generate_categories(title: &str) -> Result<Self, AppError> {
        Ok(Command::GenerateCategories {
            title: title_input(title, "Post title")?,
        })
    }

    pub fn generate_toc(title: &str) -> Result<Self, AppError> {
        Ok(Command::GenerateToc {
            title: title_input(title, "TOC title")?,
        })
    }

    /// `count` is clamped into the accepted section range.
    pub fn generate_paragraphs(topic: &str, count: i64) -> Result<Self, AppError> {
        let topic = plain_text(topic);
        if topic.chars().count() < MIN_TOPIC_LEN {
            return Err(AppError::Validation(format!(
                "Please provide a valid topic (at least {} characters)",
                MIN_TOPIC_LEN
            )));
        }
        Ok(Command::GenerateParagraphs {
            topic: title_input(&topic, "Topic")?,
            count: clamp_section_count(count),
        })
    }

    pub fn publish(title: &str, content: &str, categories: &str) -> Result<Self, AppError> {
        Ok(Command::Publish(PublishRequest::new(title, content, categories)?))
    }

    pub fn import_post_meta(csv: Vec<u8>) -> Result<Self, AppError> {
        if csv.is_empty() {
            return Err(AppError::Validation("Please upload a CSV file".to_string()));
        }
        Ok(Command::ImportPostMeta { csv })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::GenerateCategories { .. } => "generate_categories",
            Command::GenerateToc { .. } => "generate_toc",
            Command::GenerateParagraphs { .. } => "generate_paragraphs",
            Command::Publish(_) => "publish",
            Command::ExportPostMeta => "export_postmeta",
            Command::ImportPostMeta { .. } => "import_postmeta",
        }
    }
}

impl CommandOutput {
    /// Operator-facing success notice.
    pub fn notice(&self) -> String {
        match self {
            CommandOutput::CategoryDraft(_) => "Post draft saved to staging.".to_string(),
            CommandOutput::Toc(_) => "TOC generated successfully.".to_string(),
            CommandOutput::Paragraphs(_) => {
                "Paragraphs generated and synced to staging.".to_string()
            }
            CommandOutput::Published(PublishOutcome::PublishedBoth { .. }) => {
                "Post published and synced to staging.".to_string()
            }
            CommandOutput::Published(PublishOutcome::PublishedPrimaryOnly { error, .. }) => {
                format!("Post published, but sync to staging failed: {}", error.message())
            }
            CommandOutput::Published(PublishOutcome::FailedAtPrimary { error }) => {
                format!("Failed to publish post: {}", error.message())
            }
            CommandOutput::Export(export) => format!("Exported {}", export.filename),
            CommandOutput::Import(summary) => summary.notice(),
        }
    }
}

/// Run `command` on behalf of `operator`.
pub async fn dispatch(
    state: &AppState,
    operator: i64,
    command: Command,
) -> Result<CommandOutput, AppError> {
    tracing::debug!("Dispatching {} for operator {}", command.name(), operator);

    match command {
        Command::GenerateCategories { title } => {
            workflow::generate_category_draft(state, operator, &title)
                .await
                .map(CommandOutput::CategoryDraft)
        }
        Command::GenerateToc { title } => workflow::generate_toc(state, operator, &title)
            .await
            .map(CommandOutput::Toc),
        Command::GenerateParagraphs { topic, count } => {
            workflow::generate_paragraphs(state, operator, &topic, count)
                .await
                .map(CommandOutput::Paragraphs)
        }
        Command::Publish(request) => workflow::publish(state, operator, &request)
            .await
            .map(CommandOutput::Published),
        Command::ExportPostMeta => workflow::export_post_meta(state)
            .await
            .map(CommandOutput::Export),
        Command::ImportPostMeta { csv } => workflow::import_post_meta(state, operator, &csv)
            .await
            .map(CommandOutput::Import),
    }
}
