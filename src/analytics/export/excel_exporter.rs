use super::{exported_sections, ExportConfig, ExportError, FormatHandler, ReportData};
use crate::analytics::chart::ChartSpec;
use crate::analytics::dashboard::{DashboardSection, SectionBody};
use crate::analytics::panel::{Cell, PanelContent, ReportTable};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

/// Excelのシート名の上限
const MAX_SHEET_NAME_LEN: usize = 31;

/// Excel形式エクスポーター
///
/// セクションごとに1シート、指標・表・グラフのデータを縦に並べる。
pub struct ExcelExporter {
    cell_formatting: bool,
}

/// シートへの書き込みで使う書式
struct SheetFormats {
    title: Option<Format>,
    header: Option<Format>,
    caption: Option<Format>,
}

impl SheetFormats {
    fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                title: None,
                header: None,
                caption: None,
            };
        }
        Self {
            title: Some(Format::new().set_bold().set_font_size(14)),
            header: Some(
                Format::new()
                    .set_bold()
                    .set_background_color(Color::RGB(0x4472C4))
                    .set_font_color(Color::White)
                    .set_border(FormatBorder::Thin),
            ),
            caption: Some(Format::new().set_italic().set_font_color(Color::Gray)),
        }
    }
}

fn write_text(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match format {
        Some(format) => worksheet.write_string_with_format(row, col, text, format)?,
        None => worksheet.write_string(row, col, text)?,
    };
    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), XlsxError> {
    match cell {
        Cell::Integer(value) => worksheet.write_number(row, col, *value as f64)?,
        Cell::Number(value) => worksheet.write_number(row, col, *value)?,
        Cell::Text(value) => worksheet.write_string(row, col, value)?,
    };
    Ok(())
}

/// シート名として使えない文字を除き31文字に切り詰める
fn sheet_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self {
            cell_formatting: true,
        }
    }

    pub fn with_cell_formatting(mut self, cell_formatting: bool) -> Self {
        self.cell_formatting = cell_formatting;
        self
    }

    /// ワークブックを作成してデータを書き込み
    fn create_workbook(
        &self,
        data: &ReportData,
        config: &ExportConfig,
    ) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let formats = SheetFormats::new(self.cell_formatting);

        for section in exported_sections(data, config) {
            self.create_section_sheet(&mut workbook, &section, &formats)?;
        }

        // メタデータシート
        if config.include_metadata {
            self.create_metadata_sheet(&mut workbook, data, &formats)?;
        }

        // ワークブックをバイト配列として取得
        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| ExportError::Serialization(format!("Excel generation failed: {}", e)))?;

        Ok(buffer)
    }

    /// セクションシートを作成
    fn create_section_sheet(
        &self,
        workbook: &mut Workbook,
        section: &DashboardSection,
        formats: &SheetFormats,
    ) -> Result<(), ExportError> {
        let worksheet = workbook
            .add_worksheet()
            .set_name(sheet_name(section.kind.short_name()))?;

        write_text(worksheet, 0, 0, section.title, formats.title.as_ref())?;

        match &section.body {
            SectionBody::Notice(message) => {
                worksheet.write_string(2, 0, message)?;
            }
            SectionBody::Content(content) => {
                self.write_content(worksheet, content, formats)?;
            }
        }

        worksheet.set_column_width(0, 40)?;
        worksheet.set_column_width(1, 24)?;
        Ok(())
    }

    fn write_content(
        &self,
        worksheet: &mut Worksheet,
        content: &PanelContent,
        formats: &SheetFormats,
    ) -> Result<(), ExportError> {
        let mut row = 2u32;

        if !content.metrics.is_empty() {
            write_text(worksheet, row, 0, "Indicateur", formats.header.as_ref())?;
            write_text(worksheet, row, 1, "Valeur", formats.header.as_ref())?;
            row += 1;
            for metric in &content.metrics {
                worksheet.write_string(row, 0, &metric.label)?;
                worksheet.write_string(row, 1, &metric.value)?;
                row += 1;
            }
            row += 1;
        }

        for table in &content.tables {
            row = self.write_table(worksheet, row, table, formats)?;
        }

        for chart in &content.charts {
            row = self.write_chart_data(worksheet, row, chart, formats)?;
        }

        for note in &content.notes {
            write_text(worksheet, row, 0, note, formats.caption.as_ref())?;
            row += 1;
        }

        Ok(())
    }

    /// 表を書き込み、次の空き行を返す
    fn write_table(
        &self,
        worksheet: &mut Worksheet,
        start_row: u32,
        table: &ReportTable,
        formats: &SheetFormats,
    ) -> Result<u32, ExportError> {
        let mut row = start_row;
        write_text(worksheet, row, 0, &table.title, formats.title.as_ref())?;
        row += 1;

        for (col, header) in table.headers.iter().enumerate() {
            write_text(worksheet, row, col as u16, header, formats.header.as_ref())?;
        }
        row += 1;

        for cells in &table.rows {
            for (col, cell) in cells.iter().enumerate() {
                write_cell(worksheet, row, col as u16, cell)?;
            }
            row += 1;
        }

        if let Some(caption) = &table.caption {
            write_text(worksheet, row, 0, caption, formats.caption.as_ref())?;
            row += 1;
        }

        Ok(row + 1)
    }

    /// グラフの元データを表として書き込む
    fn write_chart_data(
        &self,
        worksheet: &mut Worksheet,
        start_row: u32,
        chart: &ChartSpec,
        formats: &SheetFormats,
    ) -> Result<u32, ExportError> {
        let Some(first) = chart.series.first() else {
            return Ok(start_row);
        };

        let mut row = start_row;
        write_text(
            worksheet,
            row,
            0,
            &format!("📈 {}", chart.title),
            formats.title.as_ref(),
        )?;
        row += 1;

        write_text(worksheet, row, 0, "", formats.header.as_ref())?;
        for (col, series) in chart.series.iter().enumerate() {
            write_text(worksheet, row, col as u16 + 1, &series.name, formats.header.as_ref())?;
        }
        row += 1;

        for (index, label) in first.labels.iter().enumerate() {
            worksheet.write_string(row, 0, label)?;
            for (col, series) in chart.series.iter().enumerate() {
                if let Some(value) = series.values.get(index) {
                    worksheet.write_number(row, col as u16 + 1, *value)?;
                }
            }
            row += 1;
        }

        Ok(row + 1)
    }

    /// メタデータシートを作成
    fn create_metadata_sheet(
        &self,
        workbook: &mut Workbook,
        data: &ReportData,
        formats: &SheetFormats,
    ) -> Result<(), ExportError> {
        let worksheet = workbook.add_worksheet().set_name("Métadonnées")?;

        write_text(worksheet, 0, 0, "Clé", formats.header.as_ref())?;
        write_text(worksheet, 0, 1, "Valeur", formats.header.as_ref())?;

        for (index, (key, value)) in data.metadata.entries().into_iter().enumerate() {
            let row = index as u32 + 1;
            worksheet.write_string(row, 0, key)?;
            worksheet.write_string(row, 1, &value)?;
        }

        worksheet.set_column_width(0, 28)?;
        worksheet.set_column_width(1, 40)?;
        Ok(())
    }
}

impl FormatHandler for ExcelExporter {
    fn export(&self, data: &ReportData, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        self.create_workbook(data, config)
    }

    fn file_extension(&self) -> &str {
        "xlsx"
    }
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new()
    }
}

// XlsxErrorをExportErrorに変換
impl From<XlsxError> for ExportError {
    fn from(error: XlsxError) -> Self {
        ExportError::Serialization(format!("Excel error: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::export::report_data::tests::sample_report;

    #[test]
    fn test_excel_export() {
        let exporter = ExcelExporter::new();
        let bytes = exporter
            .export(&sample_report(), &ExportConfig::default())
            .unwrap();
        assert!(!bytes.is_empty());
        // Excel形式の最初のバイトをチェック（ZIP形式の開始）
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_excel_export_without_formatting_or_metadata() {
        let exporter = ExcelExporter::new().with_cell_formatting(false);
        let config = ExportConfig {
            include_metadata: false,
            include_charts: false,
            ..Default::default()
        };
        let result = exporter.export(&sample_report(), &config);
        assert!(result.is_ok());
    }

    #[test]
    fn test_sheet_names_are_sanitized() {
        assert_eq!(sheet_name("URLs et appareils"), "URLs et appareils");
        assert_eq!(sheet_name("a/b:c"), "abc");
        assert_eq!(sheet_name(&"x".repeat(40)).chars().count(), MAX_SHEET_NAME_LEN);
    }
}
