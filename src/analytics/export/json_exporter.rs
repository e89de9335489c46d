use super::{exported_sections, ExportConfig, ExportError, FormatHandler, ReportData, ReportMetadata};
use crate::analytics::dashboard::{Dashboard, DashboardSection};
use serde::Serialize;

/// JSON形式エクスポーター
pub struct JsonExporter {
    pretty_print: bool,
}

/// 出力される JSON の形
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a ReportMetadata>,
    dashboard: &'a Dashboard,
    sections: Vec<DashboardSection>,
}

impl JsonExporter {
    pub fn new() -> Self {
        Self { pretty_print: true }
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }
}

impl FormatHandler for JsonExporter {
    fn export(&self, data: &ReportData, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        let report = JsonReport {
            metadata: config.include_metadata.then_some(&data.metadata),
            dashboard: &data.dashboard,
            sections: exported_sections(data, config),
        };

        let json = if self.pretty_print {
            serde_json::to_vec_pretty(&report)
        } else {
            serde_json::to_vec(&report)
        }
        .map_err(|e| ExportError::Serialization(format!("JSON serialization failed: {}", e)))?;

        Ok(json)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new()
    }
}
