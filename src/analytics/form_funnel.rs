//! フォームの表示・完了ファネル

use super::dataset::{Column, Dataset};
use super::frequency::{checked_add, checked_sum, ratio};
use super::panel::{
    format_rate, Cell, Metric, Panel, PanelContent, PanelError, PanelKind, PanelResult,
    Presentable, ReportTable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `formulaire_data` 1件分のカウンタ
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormCounters {
    pub triggers: u64,
    pub completions: u64,
}

/// `formulaire_data` セルの中身（フォーム名 → カウンタ）
pub type FormCounts = BTreeMap<String, FormCounters>;

/// `formulaire_data` セルを解析（空セルは `None`）
pub fn parse_form_data(cell: &str) -> Result<Option<FormCounts>, serde_json::Error> {
    if cell.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(cell).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormFunnelStats {
    /// フォーム名の昇順
    pub forms: Vec<FormSummary>,
    pub total_triggers: u64,
    pub total_completions: u64,
    pub global_completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormSummary {
    pub name: String,
    pub triggers: u64,
    pub completions: u64,
    /// 表示回数が0なら0
    pub completion_rate: f64,
}

/// フォーム統計を計算
pub fn form_funnel(dataset: &Dataset) -> PanelResult<FormFunnelStats> {
    let kind = PanelKind::FormFunnel;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    let missing = dataset.missing(&[Column::FormulaireData]);
    if !missing.is_empty() {
        return Ok(Panel::notice(kind.missing_columns_message(&missing)));
    }

    let mut totals = FormCounts::new();
    let mut seen_any = false;
    for (index, record) in dataset.records().iter().enumerate() {
        let Some(cell) = record.formulaire_data.as_deref() else {
            continue;
        };
        let parsed = parse_form_data(cell).map_err(|source| PanelError::InvalidFormData {
            row: index + 1,
            source,
        })?;
        for (name, counters) in parsed.into_iter().flatten() {
            seen_any = true;
            let entry = totals.entry(name).or_default();
            entry.triggers = checked_add(entry.triggers, counters.triggers, "triggers")?;
            entry.completions =
                checked_add(entry.completions, counters.completions, "completions")?;
        }
    }

    if !seen_any {
        return Ok(Panel::notice("Aucun formulaire n'a été utilisé."));
    }

    let forms: Vec<FormSummary> = totals
        .into_iter()
        .map(|(name, counters)| FormSummary {
            name,
            triggers: counters.triggers,
            completions: counters.completions,
            completion_rate: ratio(counters.completions, counters.triggers),
        })
        .collect();

    let total_triggers = checked_sum(forms.iter().map(|f| f.triggers), "triggers")?;
    let total_completions = checked_sum(forms.iter().map(|f| f.completions), "completions")?;

    Ok(Panel::Ready(FormFunnelStats {
        forms,
        total_triggers,
        total_completions,
        global_completion_rate: ratio(total_completions, total_triggers),
    }))
}

impl Presentable for FormFunnelStats {
    fn present(&self) -> PanelContent {
        let mut table = ReportTable::new(
            "📝 Détail par formulaire",
            &["name", "triggers", "completions", "completion_rate"],
        );
        for form in &self.forms {
            table.push_row(vec![
                Cell::text(&form.name),
                Cell::Integer(form.triggers),
                Cell::Integer(form.completions),
                Cell::text(format_rate(form.completion_rate)),
            ]);
        }

        PanelContent {
            metrics: vec![
                Metric::new("Total des déclenchements", self.total_triggers),
                Metric::new("Total des complétions", self.total_completions),
                Metric::new(
                    "Taux de complétion global",
                    format_rate(self.global_completion_rate),
                ),
            ],
            tables: vec![table],
            ..Default::default()
        }
    }
}
