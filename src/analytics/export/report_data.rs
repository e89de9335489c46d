use crate::analytics::dashboard::{Dashboard, DashboardSection};
use crate::analytics::date_filter::{DateRange, FilterOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// レポートのメタデータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    pub source_name: String,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub date_range: Option<DateRange>,
    pub generated_at: DateTime<Utc>,
    pub generator_version: String,
}

impl ReportMetadata {
    pub fn new(source_name: impl Into<String>, total_rows: usize, outcome: &FilterOutcome) -> Self {
        Self {
            source_name: source_name.into(),
            total_rows,
            filtered_rows: outcome.dataset.len(),
            date_range: outcome.applied_range(),
            generated_at: Utc::now(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 表示用のキーと値
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let range = match self.date_range {
            Some(range) => format!("{} → {}", range.start, range.end),
            None => "Toutes les dates".to_string(),
        };
        vec![
            ("Fichier source", self.source_name.clone()),
            ("Conversations chargées", self.total_rows.to_string()),
            ("Conversations analysées", self.filtered_rows.to_string()),
            ("Période", range),
            (
                "Généré le",
                self.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
            ("Version", self.generator_version.clone()),
        ]
    }
}

/// エクスポート対象（メタデータ + ダッシュボード）
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub metadata: ReportMetadata,
    pub dashboard: Dashboard,
    pub sections: Vec<DashboardSection>,
}

impl ReportData {
    pub fn new(metadata: ReportMetadata, dashboard: Dashboard) -> Self {
        let sections = dashboard.sections();
        Self {
            metadata,
            dashboard,
            sections,
        }
    }
}
