use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 入力CSVで認識される列
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    #[display("conversationId")]
    ConversationId,
    #[display("date")]
    Date,
    #[display("theme_principal")]
    ThemePrincipal,
    #[display("sous_theme")]
    SousTheme,
    #[display("turn_count")]
    TurnCount,
    #[display("default_count")]
    DefaultCount,
    #[display("feedbackPositive")]
    FeedbackPositive,
    #[display("feedbackNegative")]
    FeedbackNegative,
    #[display("language_normalized")]
    LanguageNormalized,
    #[display("is_hot_topic")]
    IsHotTopic,
    #[display("hot_topic_name")]
    HotTopicName,
    #[display("urls")]
    Urls,
    #[display("device")]
    Device,
    #[display("formulaire_data")]
    FormulaireData,
}

impl Column {
    pub const ALL: [Column; 14] = [
        Column::ConversationId,
        Column::Date,
        Column::ThemePrincipal,
        Column::SousTheme,
        Column::TurnCount,
        Column::DefaultCount,
        Column::FeedbackPositive,
        Column::FeedbackNegative,
        Column::LanguageNormalized,
        Column::IsHotTopic,
        Column::HotTopicName,
        Column::Urls,
        Column::Device,
        Column::FormulaireData,
    ];

    /// 解析済みファイルとして受け付けるための必須列（表示順）
    pub const REQUIRED: [Column; 8] = [
        Column::ThemePrincipal,
        Column::SousTheme,
        Column::Date,
        Column::ConversationId,
        Column::TurnCount,
        Column::DefaultCount,
        Column::FeedbackPositive,
        Column::FeedbackNegative,
    ];

    /// CSVヘッダー名から列を解決
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL
            .into_iter()
            .find(|column| column.to_string() == header)
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

/// 会話1件分のレコード
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub conversation_id: Option<String>,
    pub date: NaiveDate,
    pub theme_principal: Option<String>,
    pub sous_theme: Option<String>,
    pub turn_count: Option<u64>,
    pub default_count: Option<u64>,
    pub feedback_positive: Option<u64>,
    pub feedback_negative: Option<u64>,
    pub language_normalized: Option<String>,
    pub is_hot_topic: Option<bool>,
    pub hot_topic_name: Option<String>,
    pub urls: Option<String>,
    pub device: Option<String>,
    pub formulaire_data: Option<String>,
}

impl ConversationRecord {
    pub fn new(conversation_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            date,
            ..Default::default()
        }
    }

    /// 主テーマが空でないか
    pub fn has_theme(&self) -> bool {
        self.theme_principal
            .as_deref()
            .is_some_and(|theme| !theme.is_empty())
    }

    pub fn turns(&self) -> u64 {
        self.turn_count.unwrap_or(0)
    }

    pub fn defaults(&self) -> u64 {
        self.default_count.unwrap_or(0)
    }

    pub fn positive_votes(&self) -> u64 {
        self.feedback_positive.unwrap_or(0)
    }

    pub fn negative_votes(&self) -> u64 {
        self.feedback_negative.unwrap_or(0)
    }

    pub fn is_flagged_hot_topic(&self) -> bool {
        self.is_hot_topic.unwrap_or(false)
    }
}

/// 読み込み済みの会話データセット
///
/// 読み込み後は不変。日付フィルタは新しいデータセットを派生させる。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    records: Vec<ConversationRecord>,
    columns: BTreeSet<Column>,
}

impl Dataset {
    pub fn new(records: Vec<ConversationRecord>, columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            records,
            columns: columns.into_iter().collect(),
        }
    }

    /// 全列を持つデータセットを作成（主にテスト用）
    pub fn with_all_columns(records: Vec<ConversationRecord>) -> Self {
        Self::new(records, Column::ALL)
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn has_columns(&self, columns: &[Column]) -> bool {
        columns.iter().all(|column| self.has_column(*column))
    }

    /// 指定列のうち存在しないものを返す
    pub fn missing(&self, columns: &[Column]) -> Vec<Column> {
        columns
            .iter()
            .copied()
            .filter(|column| !self.has_column(*column))
            .collect()
    }

    /// 最小・最大の日付
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// 条件に一致するレコードだけを持つ派生データセット
    pub fn retain_where<F>(&self, predicate: F) -> Dataset
    where
        F: Fn(&ConversationRecord) -> bool,
    {
        Dataset {
            records: self
                .records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
            columns: self.columns.clone(),
        }
    }
}
