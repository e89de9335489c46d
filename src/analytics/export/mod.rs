use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

pub mod csv_exporter;
pub mod excel_exporter;
pub mod json_exporter;
pub mod report_data;

pub use csv_exporter::CsvExporter;
pub use excel_exporter::ExcelExporter;
pub use json_exporter::JsonExporter;
pub use report_data::{ReportData, ReportMetadata};

use super::dashboard::DashboardSection;

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
}

impl ExportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" | "excel" => Ok(ExportFormat::Excel),
            other => Err(ExportError::UnknownFormat {
                name: other.to_string(),
            }),
        }
    }
}

/// エクスポートエラー
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {format:?}")]
    UnsupportedFormat { format: ExportFormat },

    #[error("Unknown export format '{name}' (expected json, csv or xlsx)")]
    UnknownFormat { name: String },
}

/// エクスポート設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub include_metadata: bool,
    pub include_charts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_metadata: true,
            include_charts: true,
        }
    }
}

impl ExportConfig {
    pub fn for_format(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }
}

/// 設定に応じてチャートを除いたセクション
pub(crate) fn exported_sections(data: &ReportData, config: &ExportConfig) -> Vec<DashboardSection> {
    let mut sections = data.sections.clone();
    if !config.include_charts {
        for section in &mut sections {
            section.body.clear_charts();
        }
    }
    sections
}

/// フォーマットハンドラートレイト
pub trait FormatHandler: Send + Sync {
    fn export(&self, data: &ReportData, config: &ExportConfig) -> Result<Vec<u8>, ExportError>;
    fn file_extension(&self) -> &str;
}

/// エクスポートマネージャー
pub struct ExportManager {
    format_handlers: HashMap<ExportFormat, Box<dyn FormatHandler>>,
}

impl ExportManager {
    /// 新しいエクスポートマネージャーを作成
    pub fn new() -> Self {
        let mut manager = Self {
            format_handlers: HashMap::new(),
        };

        // デフォルトハンドラーを登録
        manager.register_handler(ExportFormat::Csv, Box::new(CsvExporter::new()));
        manager.register_handler(ExportFormat::Json, Box::new(JsonExporter::new()));
        manager.register_handler(ExportFormat::Excel, Box::new(ExcelExporter::new()));

        manager
    }

    /// フォーマットハンドラーを登録
    pub fn register_handler(&mut self, format: ExportFormat, handler: Box<dyn FormatHandler>) {
        self.format_handlers.insert(format, handler);
    }

    /// データをエクスポート
    pub fn export(&self, data: &ReportData, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        let handler =
            self.format_handlers
                .get(&config.format)
                .ok_or(ExportError::UnsupportedFormat {
                    format: config.format,
                })?;

        let bytes = handler.export(data, config)?;
        tracing::info!(
            format = handler.file_extension(),
            bytes = bytes.len(),
            "📤 Report exported"
        );
        Ok(bytes)
    }
}

impl Default for ExportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_extensions() {
        assert_eq!(ExportFormat::Csv.file_extension(), "csv");
        assert_eq!(ExportFormat::Json.file_extension(), "json");
        assert_eq!(ExportFormat::Excel.file_extension(), "xlsx");
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_unsupported_format() {
        // CSVとJSONのみを登録
        let mut manager = ExportManager {
            format_handlers: HashMap::new(),
        };
        manager.register_handler(ExportFormat::Csv, Box::new(CsvExporter::new()));
        manager.register_handler(ExportFormat::Json, Box::new(JsonExporter::new()));

        let data = report_data::tests::sample_report();
        let config = ExportConfig::for_format(ExportFormat::Excel);

        let result = manager.export(&data, &config);
        assert!(matches!(result, Err(ExportError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_default_manager_supports_all_formats() {
        let manager = ExportManager::new();
        let data = report_data::tests::sample_report();
        for format in [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Excel] {
            let bytes = manager
                .export(&data, &ExportConfig::for_format(format))
                .unwrap();
            assert!(!bytes.is_empty(), "{:?}", format);
        }
    }
}
