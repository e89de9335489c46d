//! HTML pages for the dashboard server.
//!
//! Pages are plain server-rendered HTML; charts are drawn in the browser by
//! Plotly.js from the figure JSON embedded in each section.

use crate::analytics::dashboard::{DashboardSection, SectionBody};
use crate::analytics::date_filter::DateSelection;
use crate::analytics::export::ExportFormat;
use crate::analytics::panel::{PanelContent, ReportTable};
use crate::io::schema::{required_columns_message, INVALID_FILE_MESSAGE};
use crate::pipeline::Analysis;
use chrono::NaiveDate;
use std::fmt::Write;
use uuid::Uuid;

const PAGE_TITLE: &str = "scuuba light - Client Dashboard";
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0 auto; max-width: 1200px; padding: 1.5rem; color: #262730; }
h1 { margin-bottom: 0.25rem; }
section.panel { border-top: 1px solid #e6e9ef; margin-top: 2rem; padding-top: 1rem; }
.alert { border-radius: 0.5rem; padding: 0.75rem 1rem; margin: 0.5rem 0; }
.success { background: #e8f9ee; color: #0f5132; }
.info { background: #e8f0fe; color: #1c3d7a; }
.error { background: #fdecea; color: #7a1c1c; }
.metrics { display: flex; flex-wrap: wrap; gap: 1rem; margin: 1rem 0; }
.metric { min-width: 180px; padding: 0.5rem 1rem; border: 1px solid #e6e9ef; border-radius: 0.5rem; }
.metric .label { font-size: 0.85rem; color: #6b6f76; }
.metric .value { font-size: 1.6rem; font-weight: 600; }
table { border-collapse: collapse; margin: 0.5rem 0 1rem; }
th, td { border: 1px solid #e6e9ef; padding: 0.35rem 0.75rem; text-align: left; }
th { background: #f0f2f6; }
caption { caption-side: bottom; font-size: 0.85rem; color: #6b6f76; text-align: left; }
.chart { width: 100%; }
.exports a { margin-right: 1rem; }
"#;

/// Error shown on the upload page after a rejected file.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadFailure {
    /// Required columns are missing
    InvalidSchema,
    /// Any other failure, with the raw error text
    Processing(String),
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON embedded inside a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn alert(out: &mut String, class: &str, message: &str) {
    let _ = writeln!(
        out,
        r#"<div class="alert {}">{}</div>"#,
        class,
        escape_html(message)
    );
}

fn page(body: &str, with_charts: bool) -> String {
    let script = if with_charts {
        format!(r#"<script src="{}"></script>"#, PLOTLY_CDN)
    } else {
        String::new()
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n{}\n</head>\n<body>\n<h1>✨ scuuba light - Dashboard Client</h1>\n{}</body>\n</html>\n",
        PAGE_TITLE, STYLE, script, body
    )
}

/// Upload page, optionally with the reason the last file was rejected.
pub fn upload_page(failure: Option<&UploadFailure>) -> String {
    let mut body = String::new();
    body.push_str(
        "<p>Téléchargez votre fichier d'analyse pour visualiser les résultats.</p>\n",
    );
    body.push_str(
        r#"<form action="/upload" method="post" enctype="multipart/form-data">
<label for="file">Choisissez un fichier CSV d'analyse</label>
<input type="file" id="file" name="file" accept=".csv,text/csv" required>
<button type="submit">Analyser</button>
</form>
"#,
    );

    match failure {
        Some(UploadFailure::InvalidSchema) => {
            alert(&mut body, "error", INVALID_FILE_MESSAGE);
            alert(&mut body, "info", &required_columns_message());
        }
        Some(UploadFailure::Processing(error)) => {
            alert(&mut body, "error", &format!("Erreur lors du traitement : {}", error));
            alert(
                &mut body,
                "error",
                "Détails de l'erreur pour le support technique:",
            );
            let _ = writeln!(body, "<pre>{}</pre>", escape_html(error));
        }
        None => {}
    }

    page(&body, false)
}

fn export_links(out: &mut String, session_id: Uuid, selection: &DateSelection) {
    let mut query = String::new();
    if let Some(start) = selection.start {
        let _ = write!(query, "&start={}", start);
    }
    if let Some(end) = selection.end {
        let _ = write!(query, "&end={}", end);
    }

    out.push_str(r#"<p class="exports">📤 Exporter : "#);
    for (format, label) in [
        (ExportFormat::Json, "JSON"),
        (ExportFormat::Csv, "CSV"),
        (ExportFormat::Excel, "Excel"),
    ] {
        let _ = write!(
            out,
            r#"<a href="/export/{}?format={}{}">{}</a>"#,
            session_id,
            format.file_extension(),
            escape_html(&query),
            label
        );
    }
    out.push_str("</p>\n");
}

fn date_selector(
    out: &mut String,
    bounds: Option<(NaiveDate, NaiveDate)>,
    selection: &DateSelection,
) {
    out.push_str("<h3>📅 Filtrer par période</h3>\n");
    let Some((min, max)) = bounds else {
        return;
    };

    let value = |date: Option<NaiveDate>| date.map(|d| d.to_string()).unwrap_or_default();
    let _ = writeln!(
        out,
        r#"<form method="get" title="Données disponibles du {} au {}">
<label>Sélectionnez la période à analyser:</label>
<input type="date" name="start" min="{min}" max="{max}" value="{}">
<input type="date" name="end" min="{min}" max="{max}" value="{}">
<button type="submit">Appliquer</button>
</form>"#,
        min.format("%d/%m/%Y"),
        max.format("%d/%m/%Y"),
        value(selection.start),
        value(selection.end),
    );
}

fn render_table(out: &mut String, table: &ReportTable) {
    let _ = writeln!(out, "<h4>{}</h4>", escape_html(&table.title));
    out.push_str("<table>\n<thead><tr>");
    for header in &table.headers {
        let _ = write!(out, "<th>{}</th>", escape_html(header));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape_html(&cell.display()));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n");
    if let Some(caption) = &table.caption {
        let _ = writeln!(out, "<caption>{}</caption>", escape_html(caption));
    }
    out.push_str("</table>\n");
}

fn render_content(out: &mut String, anchor: &str, content: &PanelContent) {
    if !content.metrics.is_empty() {
        out.push_str(r#"<div class="metrics">"#);
        for metric in &content.metrics {
            let help = metric
                .help
                .as_deref()
                .map(|help| format!(r#" title="{}""#, escape_html(help)))
                .unwrap_or_default();
            let _ = write!(
                out,
                r#"<div class="metric"{}><div class="label">{}</div><div class="value">{}</div></div>"#,
                help,
                escape_html(&metric.label),
                escape_html(&metric.value)
            );
        }
        out.push_str("</div>\n");
    }

    for (index, chart) in content.charts.iter().enumerate() {
        let id = format!("{}-chart-{}", anchor, index);
        let _ = writeln!(
            out,
            r#"<div class="chart" id="{id}"></div>
<script>(function() {{ var fig = {}; Plotly.newPlot("{id}", fig.data, fig.layout, {{responsive: true}}); }})();</script>"#,
            script_json(&chart.to_plotly()),
        );
    }

    for table in &content.tables {
        render_table(out, table);
    }

    for note in &content.notes {
        alert(out, "info", note);
    }
}

fn render_section(out: &mut String, section: &DashboardSection) {
    let anchor = format!("{:?}", section.kind).to_lowercase();
    let _ = writeln!(
        out,
        r#"<section class="panel" id="{}">
<h2>{}</h2>"#,
        anchor,
        escape_html(section.title)
    );
    match &section.body {
        SectionBody::Notice(message) => alert(out, "info", message),
        SectionBody::Content(content) => render_content(out, &anchor, content),
    }
    out.push_str("</section>\n");
}

/// Dashboard page: acceptance notice, date selector, filter notice, panels.
pub fn dashboard_page(session_id: Uuid, analysis: &Analysis, selection: &DateSelection) -> String {
    let mut body = String::new();

    alert(&mut body, "success", "✅ Fichier d'analyse valide");
    alert(
        &mut body,
        "info",
        &format!(
            "📊 {} conversations analysées",
            analysis.report.metadata.total_rows
        ),
    );

    date_selector(&mut body, analysis.date_bounds, selection);
    alert(&mut body, "info", &analysis.notice.message());

    body.push_str("<h3>📊 Tableau de bord</h3>\n");
    export_links(&mut body, session_id, selection);

    for section in &analysis.report.sections {
        render_section(&mut body, section);
    }

    body.push_str(r#"<p><a href="/">⬅️ Charger un autre fichier</a></p>"#);
    page(&body, true)
}

/// Page shown for an unknown or expired session.
pub fn not_found_page() -> String {
    let mut body = String::new();
    alert(
        &mut body,
        "error",
        "Session introuvable ou expirée. Veuillez télécharger à nouveau votre fichier.",
    );
    body.push_str(r#"<p><a href="/">⬅️ Retour</a></p>"#);
    page(&body, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dashboard::DashboardSettings;
    use crate::analytics::dataset::{ConversationRecord, Dataset};
    use crate::pipeline::analyze;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_script_json_cannot_close_script() {
        let value = serde_json::json!({ "title": "</script><script>alert(1)" });
        assert!(!script_json(&value).contains("</script>"));
    }

    #[test]
    fn test_upload_page_schema_failure() {
        let html = upload_page(Some(&UploadFailure::InvalidSchema));
        assert!(html.contains("Colonnes requises: theme_principal"));
        assert!(html.contains("Genii Insights"));
    }

    #[test]
    fn test_upload_page_processing_error_is_escaped() {
        let html = upload_page(Some(&UploadFailure::Processing("<bad>".to_string())));
        assert!(html.contains("&lt;bad&gt;"));
        assert!(!html.contains("<bad>"));
    }

    #[test]
    fn test_dashboard_page_order() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut record = ConversationRecord::new("c1", day);
        record.feedback_positive = Some(1);
        record.feedback_negative = Some(0);
        let dataset = Dataset::with_all_columns(vec![record]);
        let selection = DateSelection::between(day, day);
        let analysis = analyze("juin.csv", &dataset, selection, &DashboardSettings::default());

        let html = dashboard_page(Uuid::nil(), &analysis, &selection);
        let accepted = html.find("Fichier d&#39;analyse valide").unwrap();
        let selector = html.find("Filtrer par période").unwrap();
        let notice = html.find("conversations dans la période").unwrap();
        let satisfaction = html.find("Métriques de satisfaction").unwrap();
        let volume = html.find("Métriques des conversations").unwrap();
        assert!(accepted < selector);
        assert!(selector < notice);
        assert!(notice < satisfaction);
        assert!(satisfaction < volume);
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("format=xlsx&amp;start=2024-06-01&amp;end=2024-06-01"));
    }
}
