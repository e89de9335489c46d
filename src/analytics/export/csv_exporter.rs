use super::{exported_sections, ExportConfig, ExportError, FormatHandler, ReportData};
use crate::analytics::dashboard::{DashboardSection, SectionBody};
use crate::analytics::panel::ReportTable;
use csv::WriterBuilder;
use std::io::Write;

/// CSV形式エクスポーター
///
/// 表ごとに `# セクション - 表` のコメント行、ヘッダー、データ行を続けて出力する。
pub struct CsvExporter {
    delimiter: u8,
    include_headers: bool,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            include_headers: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, include_headers: bool) -> Self {
        self.include_headers = include_headers;
        self
    }

    /// メタデータブロック
    fn write_metadata<W: Write>(
        &self,
        writer: &mut csv::Writer<W>,
        data: &ReportData,
    ) -> Result<(), ExportError> {
        for (key, value) in data.metadata.entries() {
            writer.write_record([format!("# {}", key), value])?;
        }
        Ok(())
    }

    fn write_table<W: Write>(
        &self,
        writer: &mut csv::Writer<W>,
        section: &DashboardSection,
        table: &ReportTable,
    ) -> Result<(), ExportError> {
        writer.write_record([format!("# {} - {}", section.title, table.title)])?;
        if self.include_headers {
            writer.write_record(&table.headers)?;
        }
        for row in &table.rows {
            writer.write_record(row.iter().map(|cell| cell.display()))?;
        }
        Ok(())
    }

    fn write_section<W: Write>(
        &self,
        writer: &mut csv::Writer<W>,
        section: &DashboardSection,
    ) -> Result<(), ExportError> {
        let content = match &section.body {
            SectionBody::Notice(message) => {
                writer.write_record([format!("# {}", section.title)])?;
                writer.write_record([message.as_str()])?;
                return Ok(());
            }
            SectionBody::Content(content) => content,
        };

        if !content.metrics.is_empty() {
            writer.write_record([format!("# {} - Indicateurs", section.title)])?;
            if self.include_headers {
                writer.write_record(["Indicateur", "Valeur"])?;
            }
            for metric in &content.metrics {
                writer.write_record([metric.label.as_str(), metric.value.as_str()])?;
            }
        }

        for table in &content.tables {
            self.write_table(writer, section, table)?;
        }

        for note in &content.notes {
            writer.write_record([format!("# {}", note)])?;
        }

        Ok(())
    }
}

impl FormatHandler for CsvExporter {
    fn export(&self, data: &ReportData, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());

        // メタデータセクション（オプション）
        if config.include_metadata {
            self.write_metadata(&mut writer, data)?;
        }

        for section in exported_sections(data, config) {
            self.write_section(&mut writer, &section)?;
        }

        writer
            .into_inner()
            .map_err(|e| ExportError::Serialization(format!("CSV generation failed: {}", e)))
    }

    fn file_extension(&self) -> &str {
        "csv"
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        ExportError::Serialization(format!("CSV error: {}", error))
    }
}
