//! テーマ・サブテーマ別の会話数

use super::dataset::{Column, Dataset};
use super::frequency::{percentage, OrderedGroups};
use super::panel::{
    format_percent, Cell, Metric, Panel, PanelContent, PanelKind, PanelResult, Presentable,
    ReportTable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeBreakdown {
    pub total_conversations: usize,
    /// 主テーマが空でない会話数
    pub themed_conversations: u64,
    pub themed_percentage: f64,
    /// 会話数の降順
    pub themes: Vec<ThemeGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeGroup {
    pub theme: String,
    pub conversations: u64,
    /// 全会話数に対する割合
    pub percentage: f64,
    pub sub_themes: Vec<SubThemeCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubThemeCount {
    pub sub_theme: String,
    pub conversations: u64,
    pub percentage: f64,
}

const REQUIRED: [Column; 2] = [Column::ThemePrincipal, Column::SousTheme];

/// テーマ別統計を計算
pub fn theme_statistics(dataset: &Dataset) -> PanelResult<ThemeBreakdown> {
    let kind = PanelKind::ThemeBreakdown;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    let missing = dataset.missing(&REQUIRED);
    if !missing.is_empty() {
        return Ok(Panel::notice(kind.missing_columns_message(&missing)));
    }

    let total = dataset.len() as u64;
    let themed_conversations = dataset.records().iter().filter(|r| r.has_theme()).count() as u64;

    // どちらかのキーが欠けた行はグループに含めない。同数は初出順。
    let mut groups: OrderedGroups<&str, OrderedGroups<&str, u64>> = OrderedGroups::new();
    for record in dataset.records() {
        if let (Some(theme), Some(sub_theme)) =
            (record.theme_principal.as_deref(), record.sous_theme.as_deref())
        {
            *groups.entry(theme).entry(sub_theme) += 1;
        }
    }

    if groups.is_empty() {
        return Ok(Panel::notice("Aucune donnée de thème disponible."));
    }

    let mut themes: Vec<ThemeGroup> = groups
        .into_iter()
        .map(|(theme, sub_themes)| {
            let mut sub_themes: Vec<SubThemeCount> = sub_themes
                .into_iter()
                .map(|(sub_theme, conversations)| SubThemeCount {
                    sub_theme: sub_theme.to_string(),
                    conversations,
                    percentage: percentage(conversations, total),
                })
                .collect();
            sub_themes.sort_by(|a, b| b.conversations.cmp(&a.conversations));

            let conversations = sub_themes.iter().map(|s| s.conversations).sum();
            ThemeGroup {
                theme: theme.to_string(),
                conversations,
                percentage: percentage(conversations, total),
                sub_themes,
            }
        })
        .collect();
    themes.sort_by(|a, b| b.conversations.cmp(&a.conversations));

    Ok(Panel::Ready(ThemeBreakdown {
        total_conversations: dataset.len(),
        themed_conversations,
        themed_percentage: percentage(themed_conversations, total),
        themes,
    }))
}

impl Presentable for ThemeBreakdown {
    fn present(&self) -> PanelContent {
        let mut table = ReportTable::new(
            "Répartition des thèmes et sous-thèmes",
            &["Thématique", "Sous-catégorie", "Nombre de conversations"],
        )
        .with_caption(format!(
            "{}/{} conversations - {}",
            self.themed_conversations,
            self.total_conversations,
            format_percent(self.themed_percentage)
        ));

        for group in &self.themes {
            for (position, sub_theme) in group.sub_themes.iter().enumerate() {
                let theme_label = if position == 0 {
                    format!("{} ({})", group.theme, format_percent(group.percentage))
                } else {
                    String::new()
                };
                table.push_row(vec![
                    Cell::text(theme_label),
                    Cell::text(format!(
                        "{} ({})",
                        sub_theme.sub_theme,
                        format_percent(sub_theme.percentage)
                    )),
                    Cell::Integer(sub_theme.conversations),
                ]);
            }
        }

        PanelContent {
            metrics: vec![
                Metric::new("Conversations avec thème", self.themed_conversations),
                Metric::new("Pourcentage du total", format_percent(self.themed_percentage)),
            ],
            tables: vec![table],
            ..Default::default()
        }
    }
}
