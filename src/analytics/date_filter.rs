//! 日付の正規化と期間フィルタ

use super::dataset::Dataset;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{value}' is not an ISO-8601 date")]
pub struct DateParseError {
    pub value: String,
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// ISO-8601の値を暦日に切り詰める
///
/// オフセット付きの値は記載されたオフセットでの日付を返す。
pub fn normalize_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let value = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.date_naive());
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(datetime) = DateTime::parse_from_str(value, format) {
            return Ok(datetime.date_naive());
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime.date());
        }
    }

    Err(DateParseError {
        value: value.to_string(),
    })
}

/// 包括的な日付範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// ユーザーが選択した期間（片方だけの場合もある）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateSelection {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// 完全な範囲ならDateRangeを返す
    pub fn as_range(&self) -> Option<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some(DateRange { start, end }),
            _ => None,
        }
    }
}

/// フィルタ適用結果の通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterNotice {
    Filtered {
        range: DateRange,
        selected: usize,
        total: usize,
    },
    IncompleteSelection {
        total: usize,
    },
}

impl FilterNotice {
    pub fn message(&self) -> String {
        match self {
            FilterNotice::Filtered {
                selected, total, ..
            } => format!(
                "🔍 {} conversations dans la période sélectionnée (sur {} conversations au total)",
                selected, total
            ),
            FilterNotice::IncompleteSelection { .. } => {
                "⚠️ Veuillez sélectionner une période complète (date de début et de fin)".to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    pub notice: FilterNotice,
}

impl FilterOutcome {
    pub fn applied_range(&self) -> Option<DateRange> {
        match self.notice {
            FilterNotice::Filtered { range, .. } => Some(range),
            FilterNotice::IncompleteSelection { .. } => None,
        }
    }
}

/// 期間フィルタを適用
///
/// 不完全な選択は「フィルタなし」として扱い、その旨を通知に残す。
pub fn apply_date_filter(dataset: &Dataset, selection: DateSelection) -> FilterOutcome {
    let total = dataset.len();

    match selection.as_range() {
        Some(range) => {
            let filtered = dataset.retain_where(|record| range.contains(record.date));
            tracing::debug!(
                start = %range.start,
                end = %range.end,
                selected = filtered.len(),
                total,
                "📅 Date filter applied"
            );
            let selected = filtered.len();
            FilterOutcome {
                dataset: filtered,
                notice: FilterNotice::Filtered {
                    range,
                    selected,
                    total,
                },
            }
        }
        None => {
            tracing::debug!(?selection, "📅 Incomplete date selection, using whole dataset");
            FilterOutcome {
                dataset: dataset.clone(),
                notice: FilterNotice::IncompleteSelection { total },
            }
        }
    }
}
