//! 読み込み済みデータセットから期間フィルタ・ダッシュボード・レポートを作る

use crate::analytics::dashboard::{build_dashboard, DashboardSettings};
use crate::analytics::dataset::Dataset;
use crate::analytics::date_filter::{apply_date_filter, normalize_date, DateSelection, FilterNotice};
use crate::analytics::export::{ExportConfig, ExportFormat, ExportManager, ReportData, ReportMetadata};
use crate::errors::DashboardResult;
use chrono::NaiveDate;
use tracing::info;

/// 1回の解析結果
#[derive(Debug, Clone)]
pub struct Analysis {
    /// 期間フィルタの通知
    pub notice: FilterNotice,
    /// フィルタ前のデータの最小日・最大日
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub report: ReportData,
}

fn parse_optional_date(raw: Option<&str>) -> DashboardResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(normalize_date(value)?)),
        None => Ok(None),
    }
}

/// クエリやCLI引数から期間選択を決める
///
/// 両方とも指定がなければデータの全期間を選択する。空文字列は指定ありとみなし、
/// 片方だけの場合と同じくフィルタ側で不完全な選択として扱う。
pub fn resolve_selection(
    dataset: &Dataset,
    start: Option<&str>,
    end: Option<&str>,
) -> DashboardResult<DateSelection> {
    if start.is_none() && end.is_none() {
        if let Some((min, max)) = dataset.date_bounds() {
            return Ok(DateSelection::between(min, max));
        }
    }
    Ok(DateSelection::new(
        parse_optional_date(start)?,
        parse_optional_date(end)?,
    ))
}

/// 期間フィルタを適用してダッシュボードとレポートを作る
pub fn analyze(
    source_name: &str,
    dataset: &Dataset,
    selection: DateSelection,
    settings: &DashboardSettings,
) -> Analysis {
    let outcome = apply_date_filter(dataset, selection);
    let dashboard = build_dashboard(&outcome.dataset, settings);
    let metadata = ReportMetadata::new(source_name, dataset.len(), &outcome);

    info!(
        source = source_name,
        total = dataset.len(),
        selected = outcome.dataset.len(),
        "🔍 Analysis completed"
    );

    Analysis {
        notice: outcome.notice,
        date_bounds: dataset.date_bounds(),
        report: ReportData::new(metadata, dashboard),
    }
}

/// レポートを指定形式のバイト列に変換
pub fn export_report(report: &ReportData, format: ExportFormat) -> DashboardResult<Vec<u8>> {
    let manager = ExportManager::new();
    let bytes = manager.export(report, &ExportConfig::for_format(format))?;
    Ok(bytes)
}
