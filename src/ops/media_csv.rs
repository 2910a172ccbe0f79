use std::collections::HashSet;

use crate::model::media::{ImportSummary, MediaItem, MediaStatus, NewMedia};

/// Column order used for export and expected (by name) on import
pub const HEADER: [&str; 6] = ["title", "creator", "status", "rating", "progress", "notes"];

/// Error type for media CSV handling
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: title")]
    MissingTitleColumn,
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    #[error("csv output is not utf-8")]
    Encoding,
}

/// Parse an import file. Columns are matched by header name
/// (case-insensitive); only `title` is required. Rows with an empty title are
/// returned as `None` so callers can count them.
pub fn parse_media_csv(text: &str) -> Result<Vec<Option<NewMedia>>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let col = |name: &str| headers.iter().position(|h| h == name);
    let title_col = col("title").ok_or(CsvError::MissingTitleColumn)?;
    let creator_col = col("creator").or_else(|| col("author"));
    let status_col = col("status");
    let rating_col = col("rating");
    let progress_col = col("progress");
    let notes_col = col("notes");

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let row = i + 2;
        let field = |c: Option<usize>| -> Option<String> {
            c.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let Some(title) = field(Some(title_col)) else {
            rows.push(None);
            continue;
        };

        let status = match field(status_col) {
            Some(s) => MediaStatus::parse(&s).ok_or_else(|| CsvError::InvalidRow {
                row,
                message: format!("unknown status '{}'", s),
            })?,
            None => MediaStatus::Planned,
        };
        let rating = match field(rating_col) {
            Some(r) => Some(parse_rating(&r).ok_or_else(|| CsvError::InvalidRow {
                row,
                message: format!("rating '{}' is not a number from 1 to 10", r),
            })?),
            None => None,
        };
        let progress = match field(progress_col) {
            Some(p) => Some(p.parse::<u32>().map_err(|_| CsvError::InvalidRow {
                row,
                message: format!("progress '{}' is not a whole number", p),
            })?),
            None => None,
        };

        rows.push(Some(NewMedia {
            title,
            creator: field(creator_col),
            status,
            rating,
            progress,
            notes: field(notes_col),
        }));
    }
    Ok(rows)
}

fn parse_rating(s: &str) -> Option<u8> {
    let value: f32 = s.parse().ok()?;
    let rounded = value.round();
    (1.0..=10.0).contains(&rounded).then_some(rounded as u8)
}

/// Key used for duplicate detection
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Decide which parsed rows to import. A row is a duplicate when its title
/// matches an existing title or an earlier row of the same file.
pub fn plan_import(
    existing_titles: &[&str],
    rows: Vec<Option<NewMedia>>,
) -> (Vec<NewMedia>, ImportSummary) {
    let mut seen: HashSet<String> = existing_titles.iter().map(|t| title_key(t)).collect();
    let mut summary = ImportSummary {
        total_rows: rows.len(),
        ..Default::default()
    };
    let mut to_import = Vec::new();
    for row in rows.into_iter().flatten() {
        if seen.insert(title_key(&row.title)) {
            to_import.push(row);
        } else {
            summary.skipped_duplicates += 1;
            summary.duplicate_titles.push(row.title);
        }
    }
    summary.imported = to_import.len();
    (to_import, summary)
}

/// Render items as CSV, sorted by title.
pub fn write_media_csv(items: &[MediaItem]) -> Result<String, CsvError> {
    let mut sorted: Vec<&MediaItem> = items.iter().collect();
    sorted.sort_by_key(|i| title_key(&i.title));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for item in sorted {
        let rating = item.rating.map(|r| r.to_string()).unwrap_or_default();
        let progress = item.progress.map(|p| p.to_string()).unwrap_or_default();
        writer.write_record([
            item.title.as_str(),
            item.creator.as_deref().unwrap_or(""),
            item.status.as_str(),
            rating.as_str(),
            progress.as_str(),
            item.notes.as_deref().unwrap_or(""),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| CsvError::Encoding)
}
