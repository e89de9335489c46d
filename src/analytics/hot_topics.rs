//! ホットトピック統計

use super::chart::{ChartSeries, ChartSpec};
use super::dataset::{Column, Dataset};
use super::frequency::{percentage, ratio, FrequencyTable};
use super::panel::{
    format_rate, Cell, Metric, Panel, PanelContent, PanelKind, PanelResult, Presentable,
    ReportTable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotTopicStats {
    pub total_conversations: usize,
    pub flagged_conversations: u64,
    /// フラグ付き会話数 ÷ 全会話数
    pub hot_topic_rate: f64,
    /// 名前のあるフラグ付き会話の合計
    pub total_hot_topics: u64,
    pub topics: Vec<HotTopicCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotTopicCount {
    pub rank: usize,
    pub name: String,
    pub clicks: u64,
    /// ホットトピック合計に対する割合
    pub share_of_hot_topics: f64,
    /// 全会話数に対する割合
    pub share_of_conversations: f64,
}

/// ホットトピック統計を計算（列がなければ非表示）
pub fn hot_topic_stats(dataset: &Dataset) -> PanelResult<HotTopicStats> {
    if !dataset.has_columns(&[Column::IsHotTopic, Column::HotTopicName]) {
        return Ok(Panel::Hidden);
    }

    if dataset.is_empty() {
        return Ok(Panel::notice(PanelKind::HotTopics.empty_message()));
    }

    let total_conversations = dataset.len();
    let flagged: Vec<_> = dataset
        .records()
        .iter()
        .filter(|record| record.is_flagged_hot_topic())
        .collect();
    let flagged_conversations = flagged.len() as u64;

    if flagged_conversations == 0 {
        return Ok(Panel::notice("Aucun hot topic n'a été détecté."));
    }

    let counts: FrequencyTable<String> = flagged
        .iter()
        .filter_map(|record| record.hot_topic_name.clone())
        .collect();
    let total_hot_topics = counts.total();

    let topics = counts
        .sorted_desc()
        .into_iter()
        .enumerate()
        .map(|(position, (name, clicks))| HotTopicCount {
            rank: position + 1,
            name,
            clicks,
            share_of_hot_topics: percentage(clicks, total_hot_topics),
            share_of_conversations: percentage(clicks, total_conversations as u64),
        })
        .collect();

    Ok(Panel::Ready(HotTopicStats {
        total_conversations,
        flagged_conversations,
        hot_topic_rate: ratio(flagged_conversations, total_conversations as u64),
        total_hot_topics,
        topics,
    }))
}

impl Presentable for HotTopicStats {
    fn present(&self) -> PanelContent {
        let not_flagged = self.total_conversations as u64 - self.flagged_conversations;
        let presence = ChartSpec::pie("Distribution des conversations avec Hot Topics")
            .with_series(ChartSeries::new(
                "Conversations",
                vec!["Avec Hot Topic".to_string(), "Sans Hot Topic".to_string()],
                vec![self.flagged_conversations as f64, not_flagged as f64],
            ));
        let names = ChartSpec::pie("Répartition des types de Hot Topics").with_series(
            ChartSeries::new(
                "Hot Topics",
                self.topics.iter().map(|t| t.name.clone()).collect(),
                self.topics.iter().map(|t| t.clicks as f64).collect(),
            ),
        );

        let mut table = ReportTable::new(
            "📋 Détail des Hot Topics",
            &["Rang", "Hot Topic", "Clics", "% Hot Topics", "% Conversations"],
        )
        .with_caption(format!(
            "📊 Total : {} Hot Topics détectés dans {} conversations sur {} conversations totales",
            self.total_hot_topics, self.flagged_conversations, self.total_conversations
        ));
        for topic in &self.topics {
            table.push_row(vec![
                Cell::Integer(topic.rank as u64),
                Cell::text(&topic.name),
                Cell::Integer(topic.clicks),
                Cell::percent(topic.share_of_hot_topics),
                Cell::percent(topic.share_of_conversations),
            ]);
        }

        PanelContent {
            metrics: vec![Metric::new(
                "Taux de conversations avec Hot Topic",
                format_rate(self.hot_topic_rate),
            )
            .with_help("Pourcentage de conversations contenant au moins un hot topic")],
            tables: vec![table],
            charts: vec![presence, names],
            notes: Vec::new(),
        }
    }
}
