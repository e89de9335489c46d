//! 会話数・メッセージ数の推移

use super::chart::{ChartSeries, ChartSpec};
use super::dataset::{Column, Dataset};
use super::frequency::{checked_add, checked_sum};
use super::panel::{Cell, Metric, Panel, PanelContent, PanelKind, PanelResult, Presentable, ReportTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationVolume {
    pub total_conversations: usize,
    pub total_messages: u64,
    /// 日付の昇順
    pub daily: Vec<DailyVolume>,
}

/// 日別集計
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub conversations: u64,
    pub messages: u64,
}

impl DailyVolume {
    pub fn label(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

const REQUIRED: [Column; 3] = [Column::Date, Column::ConversationId, Column::TurnCount];

/// 会話・メッセージの総数と日別推移を計算
pub fn conversation_metrics(dataset: &Dataset) -> PanelResult<ConversationVolume> {
    let kind = PanelKind::ConversationVolume;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    let missing = dataset.missing(&REQUIRED);
    if !missing.is_empty() {
        return Ok(Panel::notice(kind.missing_columns_message(&missing)));
    }

    let total_messages = checked_sum(dataset.records().iter().map(|r| r.turns()), "turn_count")?;

    let mut by_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for record in dataset.records() {
        let entry = by_day.entry(record.date).or_default();
        if record.conversation_id.is_some() {
            entry.0 += 1;
        }
        entry.1 = checked_add(entry.1, record.turns(), "turn_count")?;
    }

    let daily = by_day
        .into_iter()
        .map(|(date, (conversations, messages))| DailyVolume {
            date,
            conversations,
            messages,
        })
        .collect();

    Ok(Panel::Ready(ConversationVolume {
        total_conversations: dataset.len(),
        total_messages,
        daily,
    }))
}

impl Presentable for ConversationVolume {
    fn present(&self) -> PanelContent {
        let labels: Vec<String> = self.daily.iter().map(DailyVolume::label).collect();

        let mut table = ReportTable::new(
            "📅 Données quotidiennes",
            &["Date", "Conversations", "Messages utilisateur"],
        );
        for (label, day) in labels.iter().zip(&self.daily) {
            table.push_row(vec![
                Cell::text(label),
                Cell::Integer(day.conversations),
                Cell::Integer(day.messages),
            ]);
        }

        let conversations_chart = ChartSpec::bar("Évolution des conversations")
            .with_y_axis("Nombre de conversations")
            .with_series(ChartSeries::new(
                "Conversations",
                labels.clone(),
                self.daily.iter().map(|d| d.conversations as f64).collect(),
            ));
        let messages_chart = ChartSpec::bar("Évolution des messages utilisateur")
            .with_y_axis("Nombre de messages")
            .with_series(ChartSeries::new(
                "Messages utilisateur",
                labels,
                self.daily.iter().map(|d| d.messages as f64).collect(),
            ));

        PanelContent {
            metrics: vec![
                Metric::new("Nombre total de conversations", self.total_conversations),
                Metric::new("Nombre total de messages utilisateur", self.total_messages),
            ],
            tables: vec![table],
            charts: vec![conversations_chart, messages_chart],
            notes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::ConversationRecord;
    use crate::analytics::panel::PanelError;

    fn record(id: &str, day: u32, turns: Option<u64>) -> ConversationRecord {
        ConversationRecord {
            turn_count: turns,
            ..ConversationRecord::new(id, NaiveDate::from_ymd_opt(2024, 2, day).unwrap())
        }
    }

    #[test]
    fn test_daily_volume_is_chronological() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", 3, Some(4)),
            record("2", 1, Some(2)),
            record("3", 3, None),
            record("4", 1, Some(5)),
        ]);
        let stats = conversation_metrics(&dataset).unwrap().ready().cloned().unwrap();

        assert_eq!(stats.total_conversations, 4);
        assert_eq!(stats.total_messages, 11);
        assert_eq!(stats.daily.len(), 2);
        assert_eq!(stats.daily[0].label(), "01/02/2024");
        assert_eq!(stats.daily[0].conversations, 2);
        assert_eq!(stats.daily[0].messages, 7);
        assert_eq!(stats.daily[1].messages, 4);
    }

    #[test]
    fn test_present_produces_table_and_two_charts() {
        let dataset = Dataset::with_all_columns(vec![record("1", 1, Some(3))]);
        let content = conversation_metrics(&dataset).unwrap().ready().unwrap().present();
        assert_eq!(content.tables[0].rows.len(), 1);
        assert_eq!(content.charts.len(), 2);
        assert_eq!(content.metrics[1].value, "3");
    }

    #[test]
    fn test_missing_turn_count_column() {
        let dataset = Dataset::new(
            vec![record("1", 1, Some(3))],
            [Column::Date, Column::ConversationId],
        );
        let panel = conversation_metrics(&dataset).unwrap();
        assert!(panel.notice_message().unwrap().contains("turn_count"));
    }

    #[test]
    fn test_message_total_overflow_is_an_error() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", 1, Some(u64::MAX)),
            record("2", 2, Some(u64::MAX)),
        ]);
        let err = conversation_metrics(&dataset).unwrap_err();
        assert!(matches!(err, PanelError::Overflow { field: "turn_count" }));
    }

    #[test]
    fn test_empty_dataset() {
        let panel = conversation_metrics(&Dataset::with_all_columns(vec![])).unwrap();
        assert_eq!(
            panel.notice_message(),
            Some(PanelKind::ConversationVolume.empty_message())
        );
    }
}
