//! Postmeta CSV export and import against the staging store.

use chrono::Local;
use serde::Serialize;

use crate::errors::AppError;
use crate::html::plain_text;
use crate::AppState;

/// Column order of an export file.
pub const EXPORT_HEADER: [&str; 7] = [
    "ID",
    "post_title",
    "post_content",
    "post_date",
    "post_status",
    "meta_key",
    "meta_value",
];

const IMPORT_AUDIT_TITLE: &str = "Postmeta import";

/// A rendered export file.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Per-row accounting of an import.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

impl ImportSummary {
    pub fn notice(&self) -> String {
        format!(
            "Import complete. {} entries imported, {} skipped.",
            self.imported, self.skipped
        )
    }
}

/// Render every staging post with its metadata as CSV.
pub async fn export_post_meta(state: &AppState) -> Result<CsvExport, AppError> {
    let rows = state.staging.export_post_meta().await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;
    for row in &rows {
        let id = row.id.to_string();
        writer.write_record([
            id.as_str(),
            row.title.as_str(),
            row.content.as_str(),
            row.date.as_str(),
            row.status.as_str(),
            row.meta_key.as_deref().unwrap_or(""),
            row.meta_value.as_deref().unwrap_or(""),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to finish CSV export: {}", e)))?;

    tracing::info!("Exported {} postmeta rows", rows.len());

    Ok(CsvExport {
        filename: format!(
            "postmeta_export_{}.csv",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ),
        bytes,
    })
}

struct Columns {
    id: usize,
    key: usize,
    value: usize,
}

fn locate_columns(header: &csv::StringRecord) -> Option<Columns> {
    let position = |name: &str| {
        header
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
    };
    Some(Columns {
        id: position("ID")?,
        key: position("meta_key")?,
        value: position("meta_value")?,
    })
}

/// Upsert `(ID, meta_key, meta_value)` rows. Bad rows are counted and
/// skipped; only an unreadable file or a lost staging connection stops the
/// import.
pub async fn import_post_meta(
    state: &AppState,
    operator: i64,
    csv_bytes: &[u8],
) -> Result<ImportSummary, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_bytes);

    let header = reader.headers()?.clone();
    let Some(columns) = locate_columns(&header) else {
        tracing::warn!("Rejected postmeta import with header {:?}", header);
        return Err(AppError::Validation(
            "Invalid CSV format. Ensure columns include ID, meta_key, and meta_value.".to_string(),
        ));
    };

    let mut summary = ImportSummary::default();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping unreadable import row {}: {}", line + 1, e);
                summary.skipped += 1;
                continue;
            }
        };

        let post_id = match record.get(columns.id).map(str::trim).map(str::parse::<i64>) {
            Some(Ok(id)) if id > 0 => id,
            _ => {
                summary.skipped += 1;
                continue;
            }
        };
        let key = plain_text(record.get(columns.key).unwrap_or(""));
        let value = plain_text(record.get(columns.value).unwrap_or(""));

        match state.staging.upsert_post_meta(post_id, &key, &value).await {
            Ok(_) => summary.imported += 1,
            Err(e @ AppError::DbConnection(_)) => {
                return state.audit.failed(operator, IMPORT_AUDIT_TITLE, "", e).await;
            }
            Err(e) => {
                tracing::warn!("Skipping import row {} for post {}: {}", line + 1, post_id, e);
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Postmeta import finished: {} imported, {} skipped",
        summary.imported,
        summary.skipped
    );
    state
        .audit
        .success(operator, IMPORT_AUDIT_TITLE, "", &summary.notice())
        .await;

    Ok(summary)
}
