//! CSV loading for conversation analysis files.
//!
//! Reads the header, checks the required columns and converts every row into a
//! typed [`ConversationRecord`]. Any malformed value aborts the load with the
//! 1-based data row and the raw cell.

use super::schema::missing_required_columns;
use crate::analytics::dataset::{Column, ConversationRecord, Dataset};
use crate::analytics::date_filter::normalize_date;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading an analysis file.
#[derive(Error, Debug)]
pub enum LoadError {
    /// I/O error when reading the file
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Header lacks required columns
    #[error("Missing required columns: {}", join_columns(.missing))]
    MissingColumns { missing: Vec<Column> },

    /// Date cell that is not ISO-8601
    #[error("Invalid date at row {row}: '{value}'")]
    InvalidDate { row: usize, value: String },

    /// Integer cell that is negative, fractional or not a number
    #[error("Invalid integer in column '{column}' at row {row}: '{value}'")]
    InvalidNumber {
        row: usize,
        column: Column,
        value: String,
    },

    /// Boolean cell outside true/false/1/0/yes/no
    #[error("Invalid boolean in column '{column}' at row {row}: '{value}'")]
    InvalidBoolean {
        row: usize,
        column: Column,
        value: String,
    },
}

impl LoadError {
    /// Whether this error comes from the schema check.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, LoadError::MissingColumns { .. })
    }
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| column.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Column positions resolved from the header.
struct HeaderIndex {
    positions: Vec<(Column, usize)>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        let mut positions: Vec<(Column, usize)> = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(header) {
                // first occurrence wins
                if !positions.iter().any(|(known, _)| *known == column) {
                    positions.push((column, index));
                }
            }
        }
        Self { positions }
    }

    fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.positions.iter().map(|(column, _)| *column)
    }

    /// Non-empty cell for `column`, if the column exists.
    fn cell<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        let index = self
            .positions
            .iter()
            .find(|(known, _)| *known == column)
            .map(|(_, index)| *index)?;
        record.get(index).filter(|value| !value.trim().is_empty())
    }
}

/// Row being converted, with the 1-based row number for error reporting.
struct RowParser<'a> {
    index: &'a HeaderIndex,
    record: &'a StringRecord,
    row: usize,
}

impl<'a> RowParser<'a> {
    fn text(&self, column: Column) -> Option<String> {
        self.index.cell(self.record, column).map(String::from)
    }

    fn date(&self) -> Result<NaiveDate, LoadError> {
        let raw = self.index.cell(self.record, Column::Date).unwrap_or_default();
        normalize_date(raw).map_err(|_| LoadError::InvalidDate {
            row: self.row,
            value: raw.to_string(),
        })
    }

    fn count(&self, column: Column) -> Result<Option<u64>, LoadError> {
        let Some(raw) = self.index.cell(self.record, column) else {
            return Ok(None);
        };
        parse_count(raw).map_err(|_| LoadError::InvalidNumber {
            row: self.row,
            column,
            value: raw.to_string(),
        })
    }

    fn flag(&self, column: Column) -> Result<Option<bool>, LoadError> {
        let Some(raw) = self.index.cell(self.record, column) else {
            return Ok(None);
        };
        parse_flag(raw).map_err(|_| LoadError::InvalidBoolean {
            row: self.row,
            column,
            value: raw.to_string(),
        })
    }

    fn into_record(self) -> Result<ConversationRecord, LoadError> {
        Ok(ConversationRecord {
            conversation_id: self.text(Column::ConversationId),
            date: self.date()?,
            theme_principal: self.text(Column::ThemePrincipal),
            sous_theme: self.text(Column::SousTheme),
            turn_count: self.count(Column::TurnCount)?,
            default_count: self.count(Column::DefaultCount)?,
            feedback_positive: self.count(Column::FeedbackPositive)?,
            feedback_negative: self.count(Column::FeedbackNegative)?,
            language_normalized: self.text(Column::LanguageNormalized),
            is_hot_topic: self.flag(Column::IsHotTopic)?,
            hot_topic_name: self.text(Column::HotTopicName),
            urls: self.text(Column::Urls),
            device: self.text(Column::Device),
            formulaire_data: self.text(Column::FormulaireData),
        })
    }
}

/// Null markers written by spreadsheet and dataframe tools.
fn is_null_marker(value: &str) -> bool {
    matches!(value, "nan" | "NaN" | "NA" | "null" | "None")
}

/// 2^64, the first whole float that no longer fits a `u64`.
const U64_RANGE_END: f64 = 18_446_744_073_709_551_616.0;

/// Parses a non-negative integer, accepting whole floats such as `"3.0"`.
fn parse_count(raw: &str) -> Result<Option<u64>, ()> {
    let value = raw.trim();
    if is_null_marker(value) {
        return Ok(None);
    }
    if let Ok(count) = value.parse::<u64>() {
        return Ok(Some(count));
    }
    // `as u64` saturates, so out-of-range floats must be rejected first
    match value.parse::<f64>() {
        Ok(number)
            if number.is_finite()
                && number >= 0.0
                && number < U64_RANGE_END
                && number.fract() == 0.0 =>
        {
            Ok(Some(number as u64))
        }
        _ => Err(()),
    }
}

/// Parses `true/false/1/0/yes/no`, case-insensitively.
fn parse_flag(raw: &str) -> Result<Option<bool>, ()> {
    let value = raw.trim();
    if is_null_marker(value) {
        return Ok(None);
    }
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" => Ok(Some(true)),
        "false" | "0" | "0.0" | "no" => Ok(Some(false)),
        _ => Err(()),
    }
}

/// Load a dataset from any reader producing CSV text.
pub fn load_dataset<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing = missing_required_columns(headers.iter());
    if !missing.is_empty() {
        debug!(missing = %join_columns(&missing), "❌ Schema check failed");
        return Err(LoadError::MissingColumns { missing });
    }

    let index = HeaderIndex::new(&headers);
    let mut records = Vec::new();
    for (position, result) in csv_reader.records().enumerate() {
        let record = result?;
        let parser = RowParser {
            index: &index,
            record: &record,
            row: position + 1,
        };
        records.push(parser.into_record()?);
    }

    let dataset = Dataset::new(records, index.columns());
    info!(
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "📂 Dataset loaded"
    );
    Ok(dataset)
}

/// Load a dataset from a CSV file on disk.
pub fn load_dataset_from_path(path: &Path) -> Result<Dataset, LoadError> {
    let file = File::open(path)?;
    load_dataset(file)
}
