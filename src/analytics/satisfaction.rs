//! 満足度（フィードバック）統計

use super::chart::{ChartSeries, ChartSpec, NEGATIVE_COLOR, POSITIVE_COLOR};
use super::dataset::{Column, Dataset};
use super::frequency::{checked_add, checked_sum, ratio, OrderedGroups};
use super::panel::{
    format_rate, Cell, Metric, Panel, PanelContent, PanelError, PanelKind, PanelResult,
    Presentable, ReportTable,
};
use serde::{Deserialize, Serialize};

/// 満足度統計
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatisfactionStats {
    pub total_conversations: usize,
    pub total_positive: u64,
    pub total_negative: u64,
    pub total_votes: u64,
    /// 否定的フィードバック数 ÷ 会話数（投票数ではない）
    pub negative_rate: f64,
    /// sous_theme列がある場合のみ
    pub by_sub_theme: Option<SubThemeFeedbackTables>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubThemeFeedbackTables {
    /// 否定票が1以上のサブテーマ（否定票の降順）
    pub negative: Vec<SubThemeFeedback>,
    /// 肯定票が1以上のサブテーマ（肯定票の降順）
    pub positive: Vec<SubThemeFeedback>,
}

/// サブテーマ別の票数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubThemeFeedback {
    pub sub_theme: String,
    pub positive: u64,
    pub negative: u64,
    pub total: u64,
    /// 否定テーブルでは否定率、肯定テーブルでは肯定率
    pub rate: f64,
}

/// 満足度指標を計算
pub fn satisfaction_metrics(dataset: &Dataset) -> PanelResult<SatisfactionStats> {
    let kind = PanelKind::Satisfaction;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    let missing = dataset.missing(&[Column::FeedbackPositive, Column::FeedbackNegative]);
    if !missing.is_empty() {
        return Ok(Panel::notice(format!(
            "😊 Certaines colonnes de feedback ne sont pas disponibles : {}",
            missing
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let total_conversations = dataset.len();
    let total_negative = checked_sum(
        dataset.records().iter().map(|r| r.negative_votes()),
        "feedbackNegative",
    )?;
    let total_positive = checked_sum(
        dataset.records().iter().map(|r| r.positive_votes()),
        "feedbackPositive",
    )?;
    let total_votes = checked_add(total_negative, total_positive, "feedback")?;

    if total_votes == 0 {
        return Ok(Panel::notice("Aucun feedback n'a été enregistré."));
    }

    let by_sub_theme = if dataset.has_column(Column::SousTheme) {
        Some(sub_theme_feedback(dataset)?)
    } else {
        None
    };

    Ok(Panel::Ready(SatisfactionStats {
        total_conversations,
        total_positive,
        total_negative,
        total_votes,
        negative_rate: ratio(total_negative, total_conversations as u64),
        by_sub_theme,
    }))
}

/// サブテーマごとに票を集計し、否定・肯定の2つの表を作る
///
/// 同数のサブテーマは最初に出現した順に並ぶ。
fn sub_theme_feedback(dataset: &Dataset) -> Result<SubThemeFeedbackTables, PanelError> {
    let mut votes: OrderedGroups<&str, (u64, u64)> = OrderedGroups::new();
    for record in dataset.records() {
        let Some(sub_theme) = record.sous_theme.as_deref() else {
            continue;
        };
        let entry = votes.entry(sub_theme);
        entry.0 = checked_add(entry.0, record.positive_votes(), "feedbackPositive")?;
        entry.1 = checked_add(entry.1, record.negative_votes(), "feedbackNegative")?;
    }

    let mut rows = Vec::with_capacity(votes.len());
    for (sub_theme, (positive, negative)) in votes {
        rows.push(SubThemeFeedback {
            sub_theme: sub_theme.to_string(),
            positive,
            negative,
            total: checked_add(positive, negative, "feedback")?,
            rate: 0.0,
        });
    }

    let mut negative: Vec<SubThemeFeedback> = rows
        .iter()
        .filter(|row| row.negative > 0)
        .map(|row| SubThemeFeedback {
            rate: ratio(row.negative, row.total),
            ..row.clone()
        })
        .collect();
    negative.sort_by(|a, b| b.negative.cmp(&a.negative));

    let mut positive: Vec<SubThemeFeedback> = rows
        .iter()
        .filter(|row| row.positive > 0)
        .map(|row| SubThemeFeedback {
            rate: ratio(row.positive, row.total),
            ..row.clone()
        })
        .collect();
    positive.sort_by(|a, b| b.positive.cmp(&a.positive));

    Ok(SubThemeFeedbackTables { negative, positive })
}

impl Presentable for SatisfactionStats {
    fn present(&self) -> PanelContent {
        let mut content = PanelContent {
            metrics: vec![
                Metric::new("Taux de feedback négatif", format_rate(self.negative_rate)).with_help(
                    "Nombre total de feedback négatifs divisé par le nombre total de conversations",
                ),
                Metric::new("Votes totaux", self.total_votes)
                    .with_help("Nombre total de votes (positifs + négatifs)"),
                Metric::new(
                    "Répartition des votes",
                    format!("👍 {} / 👎 {}", self.total_positive, self.total_negative),
                )
                .with_help("Nombre de votes positifs / nombre de votes négatifs"),
            ],
            ..Default::default()
        };

        let Some(tables) = &self.by_sub_theme else {
            return content;
        };

        if tables.negative.is_empty() {
            content
                .notes
                .push("Aucun sous-thème n'a reçu de feedback négatif.".to_string());
        } else {
            let mut table = ReportTable::new(
                "🔍 Sous-thèmes avec feedback négatif",
                &["Sous-thème", "👎 Négatif", "👍 Positif", "Total", "% Négatif"],
            );
            for row in &tables.negative {
                table.push_row(vec![
                    Cell::text(&row.sub_theme),
                    Cell::Integer(row.negative),
                    Cell::Integer(row.positive),
                    Cell::Integer(row.total),
                    Cell::text(format_rate(row.rate)),
                ]);
            }
            content.tables.push(table);
            content.charts.push(feedback_chart(
                "Répartition des feedbacks par sous-thème",
                &tables.negative,
                false,
            ));
        }

        if tables.positive.is_empty() {
            content
                .notes
                .push("Aucun sous-thème n'a reçu de feedback positif.".to_string());
        } else {
            let mut table = ReportTable::new(
                "✨ Sous-thèmes avec feedback positif",
                &["Sous-thème", "👍 Positif", "👎 Négatif", "Total", "% Positif"],
            );
            for row in &tables.positive {
                table.push_row(vec![
                    Cell::text(&row.sub_theme),
                    Cell::Integer(row.positive),
                    Cell::Integer(row.negative),
                    Cell::Integer(row.total),
                    Cell::text(format_rate(row.rate)),
                ]);
            }
            content.tables.push(table);
            content.charts.push(feedback_chart(
                "Répartition des feedbacks par sous-thème (vue positive)",
                &tables.positive,
                true,
            ));
        }

        content
    }
}

fn feedback_chart(title: &str, rows: &[SubThemeFeedback], positive_first: bool) -> ChartSpec {
    let labels: Vec<String> = rows.iter().map(|r| r.sub_theme.clone()).collect();
    let negative = ChartSeries::new(
        "Feedback négatif",
        labels.clone(),
        rows.iter().map(|r| r.negative as f64).collect(),
    )
    .with_color(NEGATIVE_COLOR);
    let positive = ChartSeries::new(
        "Feedback positif",
        labels,
        rows.iter().map(|r| r.positive as f64).collect(),
    )
    .with_color(POSITIVE_COLOR);

    let chart = ChartSpec::grouped_bar(title).with_y_axis("Nombre de feedback");
    if positive_first {
        chart.with_series(positive).with_series(negative)
    } else {
        chart.with_series(negative).with_series(positive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::ConversationRecord;
    use chrono::NaiveDate;

    fn record(id: &str, sub_theme: Option<&str>, positive: u64, negative: u64) -> ConversationRecord {
        ConversationRecord {
            sous_theme: sub_theme.map(String::from),
            feedback_positive: Some(positive),
            feedback_negative: Some(negative),
            ..ConversationRecord::new(id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        }
    }

    #[test]
    fn test_negative_rate_uses_conversation_count() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", Some("a"), 1, 0),
            record("2", Some("b"), 0, 1),
            record("3", Some("a"), 2, 0),
        ]);
        let panel = satisfaction_metrics(&dataset).unwrap();
        let stats = panel.ready().unwrap();
        assert!((stats.negative_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.total_votes, 4);
        assert_eq!(stats.total_positive, 3);
        assert_eq!(stats.total_negative, 1);
        assert_eq!(stats.present().metrics[0].value, "33.3%");
    }

    #[test]
    fn test_sub_theme_tables_are_independent() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", Some("a"), 1, 0),
            record("2", Some("b"), 0, 1),
            record("3", Some("a"), 2, 0),
            record("4", Some("c"), 1, 3),
            record("5", None, 0, 5),
        ]);
        let stats = satisfaction_metrics(&dataset).unwrap().ready().cloned().unwrap();
        let tables = stats.by_sub_theme.unwrap();

        let negative: Vec<&str> = tables.negative.iter().map(|r| r.sub_theme.as_str()).collect();
        assert_eq!(negative, vec!["c", "b"]);
        assert!((tables.negative[0].rate - 0.75).abs() < 1e-12);

        let positive: Vec<&str> = tables.positive.iter().map(|r| r.sub_theme.as_str()).collect();
        assert_eq!(positive, vec!["a", "c"]);
        assert!((tables.positive[0].rate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tied_sub_themes_keep_first_appearance() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", Some("zeta"), 1, 1),
            record("2", Some("alpha"), 1, 1),
            record("3", Some("mu"), 2, 0),
        ]);
        let stats = satisfaction_metrics(&dataset).unwrap().ready().cloned().unwrap();
        let tables = stats.by_sub_theme.unwrap();

        let negative: Vec<&str> = tables.negative.iter().map(|r| r.sub_theme.as_str()).collect();
        assert_eq!(negative, vec!["zeta", "alpha"]);
        let positive: Vec<&str> = tables.positive.iter().map(|r| r.sub_theme.as_str()).collect();
        assert_eq!(positive, vec!["mu", "zeta", "alpha"]);
    }

    #[test]
    fn test_vote_overflow_is_an_error() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", Some("a"), u64::MAX, 0),
            record("2", Some("b"), 0, 1),
        ]);
        let err = satisfaction_metrics(&dataset).unwrap_err();
        assert!(matches!(err, PanelError::Overflow { field: "feedback" }));
    }

    #[test]
    fn test_no_votes_is_a_notice() {
        let dataset = Dataset::with_all_columns(vec![record("1", Some("a"), 0, 0)]);
        let panel = satisfaction_metrics(&dataset).unwrap();
        assert_eq!(panel.notice_message(), Some("Aucun feedback n'a été enregistré."));
    }

    #[test]
    fn test_empty_dataset_is_a_notice() {
        let panel = satisfaction_metrics(&Dataset::with_all_columns(vec![])).unwrap();
        assert!(panel.notice_message().is_some());
    }

    #[test]
    fn test_missing_feedback_columns() {
        let dataset = Dataset::new(
            vec![record("1", None, 1, 0)],
            [Column::Date, Column::FeedbackPositive],
        );
        let panel = satisfaction_metrics(&dataset).unwrap();
        assert!(panel.notice_message().unwrap().contains("feedbackNegative"));
    }

    #[test]
    fn test_empty_negative_table_becomes_note() {
        let dataset = Dataset::with_all_columns(vec![record("1", Some("a"), 2, 0)]);
        let content = satisfaction_metrics(&dataset).unwrap().ready().unwrap().present();
        assert_eq!(content.tables.len(), 1);
        assert_eq!(content.charts.len(), 1);
        assert_eq!(content.notes, vec!["Aucun sous-thème n'a reçu de feedback négatif."]);
    }
}
