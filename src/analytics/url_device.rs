//! URL出現頻度と端末分布

use super::chart::{ChartSeries, ChartSpec};
use super::dataset::{Column, Dataset};
use super::frequency::{rank_top, FrequencyTable, RankedCount};
use super::panel::{
    Cell, Metric, Panel, PanelContent, PanelKind, PanelResult, Presentable, ReportTable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlDeviceStats {
    pub urls: Panel<UrlStats>,
    pub devices: Panel<DeviceStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlStats {
    /// 出現数の上位（割合は全出現数基準）
    pub top: Vec<RankedCount>,
    pub total_occurrences: u64,
    pub distinct_urls: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceStats {
    /// 割合は端末が記録された会話数基準
    pub devices: Vec<RankedCount>,
    pub total: u64,
}

/// セル内のカンマ区切りURLを分解（空要素は除外、重複はそのまま）
pub fn split_urls(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(',').map(str::trim).filter(|url| !url.is_empty())
}

/// URLと端末の統計を計算
pub fn url_and_device_stats(dataset: &Dataset, top_urls: usize) -> PanelResult<UrlDeviceStats> {
    let kind = PanelKind::UrlDevice;
    if dataset.is_empty() {
        return Ok(Panel::notice(kind.empty_message()));
    }

    let has_urls = dataset.has_column(Column::Urls);
    let has_device = dataset.has_column(Column::Device);
    if !has_urls && !has_device {
        return Ok(Panel::notice(
            "Colonnes 'urls' et 'device' non trouvées - cette analyse n'est pas disponible",
        ));
    }

    let urls = if has_urls {
        url_stats(dataset, top_urls)
    } else {
        Panel::notice("Colonne 'urls' non trouvée")
    };

    let devices = if has_device {
        device_stats(dataset)
    } else {
        Panel::notice("Colonne 'device' non trouvée")
    };

    Ok(Panel::Ready(UrlDeviceStats { urls, devices }))
}

fn url_stats(dataset: &Dataset, top_urls: usize) -> Panel<UrlStats> {
    let counts: FrequencyTable<String> = dataset
        .records()
        .iter()
        .filter_map(|record| record.urls.as_deref())
        .flat_map(split_urls)
        .map(String::from)
        .collect();

    if counts.is_empty() {
        return Panel::notice("Aucune URL trouvée dans les données");
    }

    let total_occurrences = counts.total();
    Panel::Ready(UrlStats {
        top: rank_top(&counts, top_urls, total_occurrences),
        total_occurrences,
        distinct_urls: counts.distinct(),
    })
}

fn device_stats(dataset: &Dataset) -> Panel<DeviceStats> {
    let counts: FrequencyTable<String> = dataset
        .records()
        .iter()
        .filter_map(|record| record.device.clone())
        .collect();

    if counts.is_empty() {
        return Panel::notice("Aucune donnée d'appareil trouvée");
    }

    let total = counts.total();
    Panel::Ready(DeviceStats {
        devices: rank_top(&counts, counts.distinct(), total),
        total,
    })
}

impl Presentable for UrlDeviceStats {
    fn present(&self) -> PanelContent {
        let mut content = PanelContent::default();

        match &self.urls {
            Panel::Ready(urls) => {
                let mut table = ReportTable::new(
                    format!("🔗 Top {} des URLs les plus fréquentes", urls.top.len()),
                    &["Rang", "URL", "Occurrences"],
                );
                for entry in &urls.top {
                    table.push_row(vec![
                        Cell::Integer(entry.rank as u64),
                        Cell::text(&entry.label),
                        Cell::Integer(entry.count),
                    ]);
                }
                content.tables.push(table);
                content
                    .metrics
                    .push(Metric::new("Total URLs trouvées", urls.total_occurrences));
                content
                    .metrics
                    .push(Metric::new("URLs uniques", urls.distinct_urls));
            }
            Panel::Notice(message) => content.notes.push(message.clone()),
            Panel::Hidden => {}
        }

        match &self.devices {
            Panel::Ready(devices) => {
                let mut table = ReportTable::new(
                    "📊 Détail par appareil",
                    &["Type d'appareil", "Nombre de conversations", "Pourcentage"],
                );
                for entry in &devices.devices {
                    table.push_row(vec![
                        Cell::text(&entry.label),
                        Cell::Integer(entry.count),
                        Cell::percent(entry.percentage),
                    ]);
                }
                content.tables.push(table);
                content.charts.push(
                    ChartSpec::pie("Distribution des types d'appareils").with_series(
                        ChartSeries::new(
                            "Appareils",
                            devices.devices.iter().map(|d| d.label.clone()).collect(),
                            devices.devices.iter().map(|d| d.count as f64).collect(),
                        ),
                    ),
                );
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
    use crate::analytics::dataset::ConversationRecord;
    use chrono::NaiveDate;

    fn record(id: &str, urls: Option<&str>, device: Option<&str>) -> ConversationRecord {
        ConversationRecord {
            urls: urls.map(String::from),
            device: device.map(String::from),
            ..ConversationRecord::new(id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        }
    }

    #[test]
    fn test_repeated_urls_in_one_cell_count_separately() {
        let dataset = Dataset::with_all_columns(vec![record("1", Some("a,a,b"), None)]);
        let stats = url_and_device_stats(&dataset, 10).unwrap().ready().cloned().unwrap();
        let urls = stats.urls.ready().unwrap();
        assert_eq!(urls.top[0].label, "a");
        assert_eq!(urls.top[0].count, 2);
        assert_eq!(urls.top[1].label, "b");
        assert_eq!(urls.top[1].count, 1);
        assert_eq!(urls.total_occurrences, 3);
        assert_eq!(urls.distinct_urls, 2);
    }

    #[test]
    fn test_split_trims_and_drops_empty_pieces() {
        let pieces: Vec<&str> = split_urls(" https://x.fr/a , ,https://x.fr/b,").collect();
        assert_eq!(pieces, vec!["https://x.fr/a", "https://x.fr/b"]);
    }

    #[test]
    fn test_top_urls_limit() {
        let cells: Vec<ConversationRecord> = (0..15)
            .map(|i| record(&i.to_string(), Some(&format!("u{}", i)), None))
            .collect();
        let dataset = Dataset::with_all_columns(cells);
        let stats = url_and_device_stats(&dataset, 10).unwrap().ready().cloned().unwrap();
        let urls = stats.urls.ready().unwrap();
        assert_eq!(urls.top.len(), 10);
        assert_eq!(urls.top[9].rank, 10);
        assert_eq!(urls.distinct_urls, 15);
    }

    #[test]
    fn test_device_shares_use_non_null_rows() {
        let dataset = Dataset::with_all_columns(vec![
            record("1", None, Some("mobile")),
            record("2", None, Some("desktop")),
            record("3", None, Some("mobile")),
            record("4", None, None),
        ]);
        let stats = url_and_device_stats(&dataset, 10).unwrap().ready().cloned().unwrap();
        let devices = stats.devices.ready().unwrap();
        assert_eq!(devices.total, 3);
        assert_eq!(devices.devices[0].label, "mobile");
        assert!((devices.devices[0].percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.urls.notice_message(), Some("Aucune URL trouvée dans les données"));
    }

    #[test]
    fn test_missing_one_column_is_a_sub_notice() {
        let dataset = Dataset::new(
            vec![record("1", Some("a"), Some("mobile"))],
            [Column::Date, Column::Urls],
        );
        let stats = url_and_device_stats(&dataset, 10).unwrap().ready().cloned().unwrap();
        assert!(stats.urls.ready().is_some());
        assert_eq!(stats.devices.notice_message(), Some("Colonne 'device' non trouvée"));
        let content = stats.present();
        assert_eq!(content.notes, vec!["Colonne 'device' non trouvée"]);
    }

    #[test]
    fn test_missing_both_columns() {
        let dataset = Dataset::new(vec![record("1", None, None)], [Column::Date]);
        let panel = url_and_device_stats(&dataset, 10).unwrap();
        assert!(panel.notice_message().unwrap().contains("non trouvées"));
    }
}
