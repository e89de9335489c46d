//! パネル共通の結果型と表示用ビュー

use super::chart::ChartSpec;
use super::dataset::Column;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// パネル計算の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    /// 表示可能な統計
    Ready(T),
    /// 情報メッセージのみ（エラーではない）
    Notice(String),
    /// 何も表示しない
    Hidden,
}

impl<T> Panel<T> {
    pub fn notice(message: impl Into<String>) -> Self {
        Panel::Notice(message.into())
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn notice_message(&self) -> Option<&str> {
        match self {
            Panel::Notice(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Panel::Hidden)
    }
}

/// パネル計算中の想定外エラー
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("invalid formulaire_data JSON at row {row}: {source}")]
    InvalidFormData {
        row: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} total exceeds the counter range")]
    Overflow { field: &'static str },
}

pub type PanelResult<T> = Result<Panel<T>, PanelError>;

/// ダッシュボード上のパネル種別（表示順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Satisfaction,
    ConversationVolume,
    UrlDevice,
    Language,
    ThemeBreakdown,
    HotTopics,
    DefaultResponses,
    FormFunnel,
}

impl PanelKind {
    pub const DISPLAY_ORDER: [PanelKind; 8] = [
        PanelKind::Satisfaction,
        PanelKind::ConversationVolume,
        PanelKind::UrlDevice,
        PanelKind::Language,
        PanelKind::ThemeBreakdown,
        PanelKind::HotTopics,
        PanelKind::DefaultResponses,
        PanelKind::FormFunnel,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            PanelKind::Satisfaction => "😊 Métriques de satisfaction",
            PanelKind::ConversationVolume => "📈 Métriques des conversations",
            PanelKind::UrlDevice => "🔗 Analyse des URLs et appareils",
            PanelKind::Language => "🌍 Analyse par langue",
            PanelKind::ThemeBreakdown => "📊 Statistiques des thèmes",
            PanelKind::HotTopics => "🔥 Analyse des Hot Topics",
            PanelKind::DefaultResponses => "🤖 Statistiques des réponses par défaut",
            PanelKind::FormFunnel => "📝 Statistiques des formulaires",
        }
    }

    /// シート名などに使う短い名前
    pub fn short_name(&self) -> &'static str {
        match self {
            PanelKind::Satisfaction => "Satisfaction",
            PanelKind::ConversationVolume => "Conversations",
            PanelKind::UrlDevice => "URLs et appareils",
            PanelKind::Language => "Langues",
            PanelKind::ThemeBreakdown => "Thèmes",
            PanelKind::HotTopics => "Hot Topics",
            PanelKind::DefaultResponses => "Réponses par défaut",
            PanelKind::FormFunnel => "Formulaires",
        }
    }

    /// 空データ時のメッセージ
    pub fn empty_message(&self) -> &'static str {
        match self {
            PanelKind::Satisfaction => "😊 Aucune donnée disponible pour les métriques de satisfaction.",
            PanelKind::ConversationVolume => "📈 Aucune donnée disponible pour les métriques de conversation.",
            PanelKind::UrlDevice => "🔗 Aucune donnée disponible pour l'analyse des URLs et appareils.",
            PanelKind::Language => "🌍 Aucune donnée disponible pour l'analyse des langues.",
            PanelKind::ThemeBreakdown => "📊 Aucune donnée disponible pour les statistiques des thèmes.",
            PanelKind::HotTopics => "🔥 Aucune donnée disponible pour les hot topics.",
            PanelKind::DefaultResponses => {
                "🤖 Aucune donnée disponible pour les statistiques des réponses par défaut."
            }
            PanelKind::FormFunnel => "📝 Aucune donnée disponible pour les statistiques des formulaires.",
        }
    }

    /// 想定外エラー時の汎用メッセージ
    pub fn failure_message(&self) -> &'static str {
        match self {
            PanelKind::Satisfaction => {
                "Une erreur est survenue lors de l'affichage des métriques de satisfaction."
            }
            PanelKind::ConversationVolume => {
                "Une erreur est survenue lors de l'affichage des métriques de conversation."
            }
            PanelKind::UrlDevice => {
                "Une erreur est survenue lors de l'affichage des statistiques URL/Device."
            }
            PanelKind::Language => {
                "Une erreur est survenue lors de l'affichage de l'analyse des langues."
            }
            PanelKind::ThemeBreakdown => {
                "Une erreur est survenue lors de l'affichage des statistiques des thèmes."
            }
            PanelKind::HotTopics => {
                "Une erreur est survenue lors de l'affichage des statistiques des hot topics."
            }
            PanelKind::DefaultResponses => {
                "Une erreur est survenue lors de l'affichage des statistiques des réponses par défaut."
            }
            PanelKind::FormFunnel => {
                "Une erreur est survenue lors de l'affichage des statistiques des formulaires."
            }
        }
    }

    /// 列不足時のメッセージ
    pub fn missing_columns_message(&self, missing: &[Column]) -> String {
        let names = missing
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let emoji = self.title().split_whitespace().next().unwrap_or_default();
        format!(
            "{} Certaines colonnes requises ne sont pas disponibles : {}",
            emoji, names
        )
    }
}

/// 表のセル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(u64),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// 百分率（0〜100）を小数1桁で表示
    pub fn percent(value: f64) -> Self {
        Cell::Text(format_percent(value))
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Integer(value) => value.to_string(),
            Cell::Number(value) => format!("{:.2}", value),
            Cell::Text(value) => value.clone(),
        }
    }
}

/// 表示用の表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub caption: Option<String>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            caption: None,
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// 単一の指標
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub help: Option<String>,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// 表示層に渡すパネルの中身
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelContent {
    pub metrics: Vec<Metric>,
    pub tables: Vec<ReportTable>,
    pub charts: Vec<ChartSpec>,
    pub notes: Vec<String>,
}

/// 統計を表示用ビューへ変換する
pub trait Presentable {
    fn present(&self) -> PanelContent;
}

/// 百分率（0〜100）の表示
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// 比率（0〜1）を百分率で表示
pub fn format_rate(rate: f64) -> String {
    format_percent(rate * 100.0)
}
