//! デフォルト応答（フォールバック）の統計

use super::dataset::{Column, Dataset};
use super::frequency::{checked_add, checked_sum, percentage, ratio, OrderedGroups};
use super::panel::{
    format_percent, format_rate, Cell, Metric, Panel, PanelContent, PanelError, PanelKind,
    PanelResult, Presentable, ReportTable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultResponseStats {
    pub total_defaults: u64,
    pub conversations_with_defaults: u64,
    pub total_conversations: usize,
    /// デフォルト応答を含む会話の比率（0〜1）
    pub default_rate: f64,
    /// 値のある行のみの平均
    pub mean_per_conversation: f64,
    /// テーマ列がある場合のみ
    pub by_theme: Option<Vec<ThemeDefaults>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeDefaults {
    pub theme: String,
    pub sub_theme: String,
    pub conversations: u64,
    pub total_defaults: u64,
    /// デフォルト応答総数に対する割合
    pub percentage: f64,
}

/// デフォルト応答の統計を計算
pub fn default_response_stats(dataset: &Dataset) -> PanelResult<DefaultResponseStats> {
    let kind = PanelKind::DefaultResponses;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    let missing = dataset.missing(&[Column::DefaultCount]);
    if !missing.is_empty() {
        return Ok(Panel::notice(kind.missing_columns_message(&missing)));
    }

    let total_defaults = checked_sum(
        dataset.records().iter().map(|r| r.defaults()),
        "default_count",
    )?;
    if total_defaults == 0 {
        return Ok(Panel::notice("Aucune réponse par défaut n'a été détectée."));
    }

    let total_conversations = dataset.len();
    let conversations_with_defaults = dataset
        .records()
        .iter()
        .filter(|r| r.defaults() > 0)
        .count() as u64;

    let present: Vec<u64> = dataset
        .records()
        .iter()
        .filter_map(|r| r.default_count)
        .collect();
    let mean_per_conversation = if present.is_empty() {
        0.0
    } else {
        checked_sum(present.iter().copied(), "default_count")? as f64 / present.len() as f64
    };

    let by_theme = if dataset.has_columns(&[Column::ThemePrincipal, Column::SousTheme]) {
        Some(defaults_by_theme(dataset, total_defaults)?)
    } else {
        None
    };

    Ok(Panel::Ready(DefaultResponseStats {
        total_defaults,
        conversations_with_defaults,
        total_conversations,
        default_rate: ratio(conversations_with_defaults, total_conversations as u64),
        mean_per_conversation,
        by_theme,
    }))
}

/// 同数の組は最初に出現した順に並ぶ
fn defaults_by_theme(
    dataset: &Dataset,
    total_defaults: u64,
) -> Result<Vec<ThemeDefaults>, PanelError> {
    let mut groups: OrderedGroups<(&str, &str), (u64, u64)> = OrderedGroups::new();
    for record in dataset.records().iter().filter(|r| r.defaults() > 0) {
        if let (Some(theme), Some(sub_theme)) =
            (record.theme_principal.as_deref(), record.sous_theme.as_deref())
        {
            let entry = groups.entry((theme, sub_theme));
            entry.0 += 1;
            entry.1 = checked_add(entry.1, record.defaults(), "default_count")?;
        }
    }

    let mut rows: Vec<ThemeDefaults> = groups
        .into_iter()
        .map(|((theme, sub_theme), (conversations, defaults))| ThemeDefaults {
            theme: theme.to_string(),
            sub_theme: sub_theme.to_string(),
            conversations,
            total_defaults: defaults,
            percentage: percentage(defaults, total_defaults),
        })
        .collect();
    rows.sort_by(|a, b| b.total_defaults.cmp(&a.total_defaults));
    Ok(rows)
}

impl Presentable for DefaultResponseStats {
    fn present(&self) -> PanelContent {
        let mut content = PanelContent {
            metrics: vec![
                Metric::new("Total des réponses par défaut", self.total_defaults),
                Metric::new("Taux de réponses par défaut", format_rate(self.default_rate))
                    .with_help(
                        "Pourcentage de conversations contenant au moins une réponse par défaut",
                    ),
                Metric::new(
                    "Moyenne par conversation",
                    format!("{:.2}", self.mean_per_conversation),
                ),
            ],
            ..Default::default()
        };

        if let Some(rows) = self.by_theme.as_ref().filter(|rows| !rows.is_empty()) {
            let mut table = ReportTable::new(
                "📊 Répartition par thème et sous-thème",
                &[
                    "Thème principal",
                    "Sous-thème",
                    "Nombre de conversations",
                    "Total des réponses",
                    "Pourcentage",
                ],
            );
            for row in rows {
                table.push_row(vec![
                    Cell::text(&row.theme),
                    Cell::text(&row.sub_theme),
                    Cell::Integer(row.conversations),
                    Cell::Integer(row.total_defaults),
                    Cell::text(format_percent(row.percentage)),
                ]);
            }
            content.tables.push(table);
        }

        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::ConversationRecord;
    use chrono::NaiveDate;

    fn record(id: usize, theme: &str, sub_theme: &str, defaults: Option<u64>) -> ConversationRecord {
        ConversationRecord {
            theme_principal: Some(theme.to_string()),
            sous_theme: Some(sub_theme.to_string()),
            default_count: defaults,
            ..ConversationRecord::new(id.to_string(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        }
    }

    fn sample() -> Dataset {
        Dataset::with_all_columns(vec![
            record(1, "A", "a1", Some(2)),
            record(2, "A", "a1", Some(1)),
            record(3, "B", "b1", Some(4)),
            record(4, "B", "b2", Some(0)),
            record(5, "A", "a2", None),
            record(6, "A", "a2", Some(0)),
            record(7, "B", "b2", Some(0)),
        ])
    }

    #[test]
    fn test_rate_and_mean() {
        let stats = default_response_stats(&sample()).unwrap().ready().cloned().unwrap();
        assert_eq!(stats.total_defaults, 7);
        assert_eq!(stats.conversations_with_defaults, 3);
        assert!((stats.default_rate - 3.0 / 7.0).abs() < 1e-12);
        assert!((stats.mean_per_conversation - 7.0 / 6.0).abs() < 1e-12);
        assert_eq!(
            (stats.default_rate * stats.total_conversations as f64).round() as u64,
            stats.conversations_with_defaults
        );
    }

    #[test]
    fn test_by_theme_sorted_by_total_defaults() {
        let stats = default_response_stats(&sample()).unwrap().ready().cloned().unwrap();
        let rows = stats.by_theme.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].theme.as_str(), rows[0].sub_theme.as_str()), ("B", "b1"));
        assert_eq!(rows[0].total_defaults, 4);
        assert_eq!(rows[1].conversations, 2);
        assert!((rows[1].percentage - 300.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_tied_groups_keep_first_appearance() {
        let dataset = Dataset::with_all_columns(vec![
            record(1, "Z", "z1", Some(2)),
            record(2, "A", "a1", Some(2)),
            record(3, "M", "m1", Some(5)),
        ]);
        let rows = default_response_stats(&dataset)
            .unwrap()
            .ready()
            .cloned()
            .unwrap()
            .by_theme
            .unwrap();
        let themes: Vec<&str> = rows.iter().map(|r| r.theme.as_str()).collect();
        assert_eq!(themes, vec!["M", "Z", "A"]);
    }

    #[test]
    fn test_default_total_overflow_is_an_error() {
        let dataset = Dataset::with_all_columns(vec![
            record(1, "A", "a1", Some(u64::MAX)),
            record(2, "A", "a1", Some(1)),
        ]);
        let err = default_response_stats(&dataset).unwrap_err();
        assert!(matches!(err, PanelError::Overflow { field: "default_count" }));
    }

    #[test]
    fn test_zero_defaults_is_a_notice() {
        let dataset = Dataset::with_all_columns(vec![record(1, "A", "a", Some(0))]);
        let panel = default_response_stats(&dataset).unwrap();
        assert_eq!(panel.notice_message(), Some("Aucune réponse par défaut n'a été détectée."));
    }

    #[test]
    fn test_without_theme_columns_has_no_table() {
        let dataset = Dataset::new(
            vec![record(1, "A", "a", Some(3))],
            [Column::Date, Column::DefaultCount],
        );
        let stats = default_response_stats(&dataset).unwrap().ready().cloned().unwrap();
        assert!(stats.by_theme.is_none());
        let content = stats.present();
        assert!(content.tables.is_empty());
        assert_eq!(content.metrics[2].value, "3.00");
    }
}
