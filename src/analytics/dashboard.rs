//! パネルを表示順に計算してダッシュボードを組み立てる

use super::conversation_volume::{conversation_metrics, ConversationVolume};
use super::dataset::{Column, Dataset};
use super::default_responses::{default_response_stats, DefaultResponseStats};
use super::form_funnel::{form_funnel, FormFunnelStats};
use super::hot_topics::{hot_topic_stats, HotTopicStats};
use super::language::{language_analysis, LanguageStats};
use super::panel::{Panel, PanelContent, PanelKind, PanelResult, Presentable};
use super::satisfaction::{satisfaction_metrics, SatisfactionStats};
use super::theme_breakdown::{theme_statistics, ThemeBreakdown};
use super::url_device::{url_and_device_stats, UrlDeviceStats};
use crate::logging::PanelTimer;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// パネル計算のパラメータ
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardSettings {
    /// URL上位件数
    pub top_urls: usize,
    /// サブテーマを表示する言語数
    pub top_languages: usize,
    /// 言語ごとのサブテーマ件数
    pub top_sub_themes: usize,
    /// この割合（%）未満の言語は「Autres」にまとめる
    pub minor_language_threshold: f64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_urls: 10,
            top_languages: 6,
            top_sub_themes: 5,
            minor_language_threshold: 1.0,
        }
    }
}

/// 全パネルの計算結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dashboard {
    pub satisfaction: Panel<SatisfactionStats>,
    pub conversation_volume: Panel<ConversationVolume>,
    pub url_device: Panel<UrlDeviceStats>,
    pub language: Panel<LanguageStats>,
    pub themes: Panel<ThemeBreakdown>,
    pub hot_topics: Panel<HotTopicStats>,
    pub default_responses: Panel<DefaultResponseStats>,
    pub forms: Panel<FormFunnelStats>,
}

/// 表示・エクスポート用の統一ビュー
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSection {
    pub kind: PanelKind,
    pub title: &'static str,
    pub body: SectionBody,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SectionBody {
    Content(PanelContent),
    Notice(String),
}

impl SectionBody {
    pub fn clear_charts(&mut self) {
        if let SectionBody::Content(content) = self {
            content.charts.clear();
        }
    }
}

/// 1パネルの計算を隔離する（エラーは汎用メッセージに変換）
fn isolate<T>(kind: PanelKind, compute: impl FnOnce() -> PanelResult<T>) -> Panel<T> {
    let _timer = PanelTimer::new(kind.short_name());
    match compute() {
        Ok(panel) => panel,
        Err(error) => {
            warn!(
                panel = kind.short_name(),
                error = %error,
                "⚠️ Panel computation failed"
            );
            Panel::notice(kind.failure_message())
        }
    }
}

/// 列が存在する場合のみ計算する
fn when_present<T>(
    dataset: &Dataset,
    columns: &[Column],
    kind: PanelKind,
    compute: impl FnOnce() -> PanelResult<T>,
) -> Panel<T> {
    if dataset.has_columns(columns) {
        isolate(kind, compute)
    } else {
        Panel::Hidden
    }
}

/// ダッシュボードを組み立てる
pub fn build_dashboard(dataset: &Dataset, settings: &DashboardSettings) -> Dashboard {
    let dashboard = Dashboard {
        satisfaction: isolate(PanelKind::Satisfaction, || satisfaction_metrics(dataset)),
        conversation_volume: isolate(PanelKind::ConversationVolume, || {
            conversation_metrics(dataset)
        }),
        url_device: isolate(PanelKind::UrlDevice, || {
            url_and_device_stats(dataset, settings.top_urls)
        }),
        language: isolate(PanelKind::Language, || language_analysis(dataset, settings)),
        themes: isolate(PanelKind::ThemeBreakdown, || theme_statistics(dataset)),
        hot_topics: when_present(
            dataset,
            &[Column::IsHotTopic, Column::HotTopicName],
            PanelKind::HotTopics,
            || hot_topic_stats(dataset),
        ),
        default_responses: when_present(
            dataset,
            &[Column::DefaultCount],
            PanelKind::DefaultResponses,
            || default_response_stats(dataset),
        ),
        forms: when_present(
            dataset,
            &[Column::FormulaireData],
            PanelKind::FormFunnel,
            || form_funnel(dataset),
        ),
    };

    info!(
        rows = dataset.len(),
        sections = dashboard.sections().len(),
        "📊 Dashboard built"
    );

    dashboard
}

fn section<T: Presentable>(kind: PanelKind, panel: &Panel<T>) -> Option<DashboardSection> {
    let body = match panel {
        Panel::Ready(stats) => SectionBody::Content(stats.present()),
        Panel::Notice(message) => SectionBody::Notice(message.clone()),
        Panel::Hidden => return None,
    };
    Some(DashboardSection {
        kind,
        title: kind.title(),
        body,
    })
}

impl Dashboard {
    /// 表示順のセクション（非表示パネルは除く）
    pub fn sections(&self) -> Vec<DashboardSection> {
        [
            section(PanelKind::Satisfaction, &self.satisfaction),
            section(PanelKind::ConversationVolume, &self.conversation_volume),
            section(PanelKind::UrlDevice, &self.url_device),
            section(PanelKind::Language, &self.language),
            section(PanelKind::ThemeBreakdown, &self.themes),
            section(PanelKind::HotTopics, &self.hot_topics),
            section(PanelKind::DefaultResponses, &self.default_responses),
            section(PanelKind::FormFunnel, &self.forms),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::ConversationRecord;
    use chrono::NaiveDate;

    fn full_record(id: usize) -> ConversationRecord {
        ConversationRecord {
            theme_principal: Some("Facturation".to_string()),
            sous_theme: Some("Paiement".to_string()),
            turn_count: Some(3),
            default_count: Some(1),
            feedback_positive: Some(1),
            feedback_negative: Some(0),
            language_normalized: Some("fr".to_string()),
            is_hot_topic: Some(true),
            hot_topic_name: Some("Soldes".to_string()),
            urls: Some("https://example.fr/a".to_string()),
            device: Some("mobile".to_string()),
            formulaire_data: Some(r#"{"contact": {"triggers": 1, "completions": 1}}"#.to_string()),
            ..ConversationRecord::new(id.to_string(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        }
    }

    #[test]
    fn test_sections_follow_display_order() {
        let dataset = Dataset::with_all_columns((0..3).map(full_record).collect());
        let dashboard = build_dashboard(&dataset, &DashboardSettings::default());
        let kinds: Vec<PanelKind> = dashboard.sections().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, PanelKind::DISPLAY_ORDER.to_vec());
        assert!(dashboard
            .sections()
            .iter()
            .all(|s| matches!(s.body, SectionBody::Content(_))));
    }

    #[test]
    fn test_empty_dataset_yields_notices_only() {
        let dashboard = build_dashboard(
            &Dataset::with_all_columns(vec![]),
            &DashboardSettings::default(),
        );
        let sections = dashboard.sections();
        assert_eq!(sections.len(), 8);
        assert!(sections
            .iter()
            .all(|s| matches!(s.body, SectionBody::Notice(_))));
    }

    #[test]
    fn test_optional_panels_hidden_without_columns() {
        let dataset = Dataset::new((0..2).map(full_record).collect(), Column::REQUIRED);
        let dashboard = build_dashboard(&dataset, &DashboardSettings::default());
        assert!(dashboard.hot_topics.is_hidden());
        assert!(dashboard.forms.is_hidden());
        assert!(!dashboard.default_responses.is_hidden());
        assert_eq!(dashboard.sections().len(), 6);
    }

    #[test]
    fn test_panel_failure_is_isolated() {
        let mut broken = full_record(1);
        broken.formulaire_data = Some("not json".to_string());
        let dataset = Dataset::with_all_columns(vec![full_record(0), broken]);
        let dashboard = build_dashboard(&dataset, &DashboardSettings::default());

        assert_eq!(
            dashboard.forms.notice_message(),
            Some(PanelKind::FormFunnel.failure_message())
        );
        assert!(dashboard.satisfaction.ready().is_some());
        assert!(dashboard.hot_topics.ready().is_some());
    }

    #[test]
    fn test_counter_overflow_is_isolated() {
        let mut huge = full_record(1);
        huge.turn_count = Some(u64::MAX);
        let mut other = full_record(2);
        other.turn_count = Some(u64::MAX);
        let dataset = Dataset::with_all_columns(vec![huge, other]);
        let dashboard = build_dashboard(&dataset, &DashboardSettings::default());

        assert_eq!(
            dashboard.conversation_volume.notice_message(),
            Some(PanelKind::ConversationVolume.failure_message())
        );
        assert!(dashboard.satisfaction.ready().is_some());
        assert!(dashboard.forms.ready().is_some());
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: DashboardSettings = serde_json::from_str(r#"{"top_urls": 3}"#).unwrap();
        assert_eq!(settings.top_urls, 3);
        assert_eq!(settings.top_languages, 6);
        assert_eq!(settings.minor_language_threshold, 1.0);
    }
}
