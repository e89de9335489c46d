use super::panel::PanelError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// 出現順を保持する頻度表
///
/// 同数の場合は最初に出現した値が先に並ぶ。
#[derive(Debug, Clone)]
pub struct FrequencyTable<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> FrequencyTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K) {
        self.add_many(key, 1);
    }

    pub fn add_many(&mut self, key: K, amount: u64) {
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 += amount,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, amount));
            }
        }
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1)
            .unwrap_or(0)
    }

    /// 全出現数
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// 異なる値の数
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 件数の降順（安定ソート）
    pub fn sorted_desc(&self) -> Vec<(K, u64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

impl<K: Eq + Hash + Clone> FromIterator<K> for FrequencyTable<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut table = Self::new();
        for key in iter {
            table.add(key);
        }
        table
    }
}

/// 最初に出現した順を保持するグループ集計
#[derive(Debug, Clone)]
pub struct OrderedGroups<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedGroups<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Default> OrderedGroups<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// キーの集計値（初出なら既定値で追加）
    pub fn entry(&mut self, key: K) -> &mut V {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.index.insert(key.clone(), position);
                self.entries.push((key, V::default()));
                position
            }
        };
        &mut self.entries[position].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> IntoIterator for OrderedGroups<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// 桁あふれを検出する加算
pub fn checked_add(total: u64, amount: u64, field: &'static str) -> Result<u64, PanelError> {
    total
        .checked_add(amount)
        .ok_or(PanelError::Overflow { field })
}

/// 桁あふれを検出する合計
pub fn checked_sum<I>(values: I, field: &'static str) -> Result<u64, PanelError>
where
    I: IntoIterator<Item = u64>,
{
    values
        .into_iter()
        .try_fold(0u64, |total, value| checked_add(total, value, field))
}

/// 順位付きの件数行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCount {
    pub rank: usize,
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

/// 上位`limit`件を順位付きで返す（割合は`denominator`基準）
pub fn rank_top(table: &FrequencyTable<String>, limit: usize, denominator: u64) -> Vec<RankedCount> {
    table
        .sorted_desc()
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(position, (label, count))| RankedCount {
            rank: position + 1,
            label,
            count,
            percentage: percentage(count, denominator),
        })
        .collect()
}

/// 0除算を避けた百分率
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// 0除算を避けた比率（0〜1）
pub fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_keep_first_appearance() {
        let table: FrequencyTable<&str> = ["b", "a", "c", "a", "b"].into_iter().collect();
        let sorted = table.sorted_desc();
        assert_eq!(sorted, vec![("b", 2), ("a", 2), ("c", 1)]);
        assert_eq!(table.total(), 5);
        assert_eq!(table.distinct(), 3);
        assert_eq!(table.get(&"z"), 0);
    }

    #[test]
    fn test_rank_top_limits_and_ranks() {
        let table: FrequencyTable<String> = ["x", "y", "y", "z", "z", "z"]
            .into_iter()
            .map(String::from)
            .collect();
        let ranked = rank_top(&table, 2, 6);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, "z");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert!((ranked[0].percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ordered_groups_keep_first_appearance() {
        let mut groups: OrderedGroups<&str, u64> = OrderedGroups::new();
        for key in ["m", "a", "m", "z"] {
            *groups.entry(key) += 1;
        }
        assert_eq!(groups.len(), 3);
        let keys: Vec<(&str, u64)> = groups.into_iter().collect();
        assert_eq!(keys, vec![("m", 2), ("a", 1), ("z", 1)]);
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        assert_eq!(checked_sum([1, 2, 3], "turn_count").unwrap(), 6);
        let err = checked_sum([u64::MAX, 1], "turn_count").unwrap_err();
        assert!(matches!(err, PanelError::Overflow { field: "turn_count" }));
        assert!(checked_add(u64::MAX, 0, "x").is_ok());
    }

    #[test]
    fn test_zero_denominators() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(ratio(3, 0), 0.0);
        assert!((ratio(1, 4) - 0.25).abs() < 1e-12);
    }
}
