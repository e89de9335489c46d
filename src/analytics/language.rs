//! 言語分布と言語別の上位サブテーマ

use super::chart::{ChartSeries, ChartSpec};
use super::dashboard::DashboardSettings;
use super::dataset::{Column, ConversationRecord, Dataset};
use super::frequency::{percentage, rank_top, FrequencyTable, RankedCount};
use super::panel::{
    format_percent, Cell, Panel, PanelContent, PanelKind, PanelResult, Presentable, ReportTable,
};
use serde::{Deserialize, Serialize};

/// 閾値未満の言語をまとめる合成カテゴリ
pub const OTHER_LANGUAGES: &str = "Autres";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageStats {
    /// 言語が記録された会話数（分母）
    pub total_with_language: u64,
    /// 閾値以上の言語（降順）、最後に「Autres」
    pub distribution: Vec<LanguageShare>,
    pub top_sub_themes: Panel<Vec<LanguageSubThemes>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageShare {
    pub language: String,
    pub conversations: u64,
    pub percentage: f64,
    pub is_other: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageSubThemes {
    pub language: String,
    pub conversations: u64,
    /// 割合はこの言語の会話数基準
    pub sub_themes: Vec<RankedCount>,
}

fn language_of(record: &ConversationRecord) -> Option<&str> {
    record
        .language_normalized
        .as_deref()
        .filter(|language| !language.is_empty())
}

/// 言語分布を計算
pub fn language_analysis(
    dataset: &Dataset,
    settings: &DashboardSettings,
) -> PanelResult<LanguageStats> {
    let kind = PanelKind::Language;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    if !dataset.has_column(Column::LanguageNormalized) {
        return Ok(Panel::notice(
            "Colonne 'language_normalized' non trouvée - cette analyse n'est pas disponible",
        ));
    }

    let counts: FrequencyTable<String> = dataset
        .records()
        .iter()
        .filter_map(language_of)
        .map(String::from)
        .collect();

    if counts.is_empty() {
        return Ok(Panel::notice("Aucune donnée de langue disponible"));
    }

    let total_with_language = counts.total();
    let distribution = group_minor_languages(
        &counts,
        total_with_language,
        settings.minor_language_threshold,
    );

    let top_sub_themes = if dataset.has_column(Column::SousTheme) {
        Panel::Ready(
            distribution
                .iter()
                .filter(|share| !share.is_other)
                .take(settings.top_languages)
                .map(|share| sub_themes_for(dataset, &share.language, settings.top_sub_themes))
                .collect(),
        )
    } else {
        Panel::notice("Colonnes de thèmes non disponibles pour l'analyse détaillée par langue")
    };

    Ok(Panel::Ready(LanguageStats {
        total_with_language,
        distribution,
        top_sub_themes,
    }))
}

/// 閾値未満の言語を「Autres」にまとめる
fn group_minor_languages(
    counts: &FrequencyTable<String>,
    total: u64,
    threshold: f64,
) -> Vec<LanguageShare> {
    let mut distribution = Vec::new();
    let mut other_count = 0;
    let mut other_share = 0.0;
    let mut has_other = false;

    for (language, count) in counts.sorted_desc() {
        let share = percentage(count, total);
        if share >= threshold {
            distribution.push(LanguageShare {
                language,
                conversations: count,
                percentage: share,
                is_other: false,
            });
        } else {
            has_other = true;
            other_count += count;
            other_share += share;
        }
    }

    if has_other {
        distribution.push(LanguageShare {
            language: OTHER_LANGUAGES.to_string(),
            conversations: other_count,
            percentage: other_share,
            is_other: true,
        });
    }

    distribution
}

fn sub_themes_for(dataset: &Dataset, language: &str, limit: usize) -> LanguageSubThemes {
    let records: Vec<&ConversationRecord> = dataset
        .records()
        .iter()
        .filter(|record| language_of(record) == Some(language))
        .collect();
    let conversations = records.len() as u64;

    let counts: FrequencyTable<String> = records
        .iter()
        .filter_map(|record| record.sous_theme.clone())
        .collect();

    LanguageSubThemes {
        language: language.to_string(),
        conversations,
        sub_themes: rank_top(&counts, limit, conversations),
    }
}

impl Presentable for LanguageStats {
    fn present(&self) -> PanelContent {
        let mut content = PanelContent::default();

        content.charts.push(
            ChartSpec::pie("Distribution des langues").with_series(ChartSeries::new(
                "Langues",
                self.distribution.iter().map(|s| s.language.clone()).collect(),
                self.distribution
                    .iter()
                    .map(|s| s.conversations as f64)
                    .collect(),
            )),
        );

        let mut summary = ReportTable::new(
            "📋 Récapitulatif",
            &["Langue", "Conversations", "Pourcentage"],
        );
        for share in &self.distribution {
            summary.push_row(vec![
                Cell::text(&share.language),
                Cell::Integer(share.conversations),
                Cell::percent(share.percentage),
            ]);
        }
        content.tables.push(summary);

        match &self.top_sub_themes {
            Panel::Ready(languages) => {
                for language in languages {
                    if language.sub_themes.is_empty() {
                        content.notes.push(format!(
                            "🏳️ {} : Aucun sous-thème disponible",
                            language.language
                        ));
                        continue;
                    }
                    let mut table = ReportTable::new(
                        format!("🏳️ {}", language.language),
                        &["#", "Sous-thème", "Nb", "%"],
                    )
                    .with_caption(format!(
                        "Total: {} conversations en {}",
                        language.conversations, language.language
                    ));
                    for entry in &language.sub_themes {
                        table.push_row(vec![
                            Cell::Integer(entry.rank as u64),
                            Cell::text(&entry.label),
                            Cell::Integer(entry.count),
                            Cell::text(format_percent(entry.percentage)),
                        ]);
                    }
                    content.tables.push(table);
                }
            }
            Panel::Notice(message) => content.notes.push(message.clone()),
            Panel::Hidden => {}
        }

        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: usize, language: Option<&str>, sub_theme: Option<&str>) -> ConversationRecord {
        ConversationRecord {
            language_normalized: language.map(String::from),
            sous_theme: sub_theme.map(String::from),
            ..ConversationRecord::new(id.to_string(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        }
    }

    fn settings() -> DashboardSettings {
        DashboardSettings::default()
    }

    /// fr×150, en×40, de×6, it×1, es×1, null×2
    fn mixed_dataset() -> Dataset {
        let mut records = Vec::new();
        let mut push = |language: Option<&str>, sub_theme: Option<&str>, times: usize| {
            for _ in 0..times {
                let id = records.len();
                records.push(record(id, language, sub_theme));
            }
        };
        push(Some("fr"), Some("facture"), 100);
        push(Some("fr"), Some("livraison"), 50);
        push(Some("en"), Some("billing"), 40);
        push(Some("de"), None, 6);
        push(Some("it"), Some("x"), 1);
        push(Some("es"), Some("y"), 1);
        push(None, Some("z"), 1);
        push(Some(""), Some("z"), 1);
        Dataset::with_all_columns(records)
    }

    #[test]
    fn test_minor_languages_are_grouped() {
        let stats = language_analysis(&mixed_dataset(), &settings())
            .unwrap()
            .ready()
            .cloned()
            .unwrap();

        assert_eq!(stats.total_with_language, 198);
        let names: Vec<&str> = stats.distribution.iter().map(|s| s.language.as_str()).collect();
        assert_eq!(names, vec!["fr", "en", "de", OTHER_LANGUAGES]);

        let other = stats.distribution.last().unwrap();
        assert_eq!(other.conversations, 2);
        let expected = percentage(1, 198) + percentage(1, 198);
        assert!((other.percentage - expected).abs() < 1e-12);
        assert!(stats
            .distribution
            .iter()
            .filter(|s| !s.is_other)
            .all(|s| s.percentage >= 1.0));
    }

    #[test]
    fn test_top_sub_themes_per_language() {
        let stats = language_analysis(&mixed_dataset(), &settings())
            .unwrap()
            .ready()
            .cloned()
            .unwrap();
        let languages = stats.top_sub_themes.ready().unwrap();
        assert_eq!(languages.len(), 3);

        let fr = &languages[0];
        assert_eq!(fr.conversations, 150);
        assert_eq!(fr.sub_themes[0].label, "facture");
        assert!((fr.sub_themes[0].percentage - 100.0 * 100.0 / 150.0).abs() < 1e-9);

        let de = &languages[2];
        assert!(de.sub_themes.is_empty());
        let content = stats.present();
        assert!(content.notes.iter().any(|n| n.contains("de")));
    }

    #[test]
    fn test_language_limit() {
        let languages = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let records = languages
            .iter()
            .enumerate()
            .flat_map(|(i, language)| {
                (0..10).map(move |j| record(i * 10 + j, Some(*language), Some("s")))
            })
            .collect();
        let stats = language_analysis(&Dataset::with_all_columns(records), &settings())
            .unwrap()
            .ready()
            .cloned()
            .unwrap();
        assert_eq!(stats.top_sub_themes.ready().unwrap().len(), 6);
    }

    #[test]
    fn test_no_language_values() {
        let dataset = Dataset::with_all_columns(vec![record(1, None, None)]);
        let panel = language_analysis(&dataset, &settings()).unwrap();
        assert_eq!(panel.notice_message(), Some("Aucune donnée de langue disponible"));
    }

    #[test]
    fn test_missing_language_column() {
        let dataset = Dataset::new(vec![record(1, Some("fr"), None)], Column::REQUIRED);
        let panel = language_analysis(&dataset, &settings()).unwrap();
        assert!(panel.notice_message().unwrap().contains("language_normalized"));
    }
}
