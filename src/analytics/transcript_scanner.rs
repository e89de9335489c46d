//! 会話ログ本文からデフォルト応答数とフォーム利用状況を抽出する
//!
//! ダッシュボードは前処理済みの `default_count` / `formulaire_data` 列を読むだけで、
//! このモジュールは `scan` サブコマンドから使われる。

use super::form_funnel::{FormCounters, FormCounts};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// フォームの開始・終了フレーズ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormDefinition {
    pub name: String,
    pub start_phrase: String,
    pub end_phrase: String,
}

/// スキャナー設定（TOML）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScannerConfig {
    #[serde(default)]
    pub default_phrases: Vec<String>,
    #[serde(default)]
    pub forms: Vec<FormDefinition>,
}

#[derive(Error, Debug)]
pub enum ScannerConfigError {
    #[error("failed to read scanner config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scanner config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ScannerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ScannerConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScannerConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScannerConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 1件の会話ログをスキャン
    pub fn scan(&self, transcript: &str) -> TranscriptScan {
        TranscriptScan {
            default_count: count_default_phrases(transcript, &self.default_phrases),
            formulaire_data: scan_form_flows(transcript, &self.forms),
        }
    }
}

/// スキャン結果（CSVの `default_count` / `formulaire_data` 列に対応）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TranscriptScan {
    pub default_count: u64,
    pub formulaire_data: FormCounts,
}

impl TranscriptScan {
    /// `formulaire_data` 列に書き込むJSON
    pub fn formulaire_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.formulaire_data)
    }
}

/// 大文字小文字を区別せず、重ならない出現回数を合計
pub fn count_default_phrases<S: AsRef<str>>(text: &str, phrases: &[S]) -> u64 {
    let haystack = text.to_lowercase();
    phrases
        .iter()
        .map(|phrase| count_occurrences(&haystack, &phrase.as_ref().to_lowercase()))
        .sum()
}

/// フォームごとの表示回数と完了回数
///
/// 完了回数は、開始フレーズの各出現位置（1文字ずつ進めて重なりも数える）のうち、
/// その後ろに終了フレーズが現れるものの数。
pub fn scan_form_flows(text: &str, forms: &[FormDefinition]) -> FormCounts {
    let haystack = text.to_lowercase();
    forms
        .iter()
        .map(|form| {
            let start = form.start_phrase.to_lowercase();
            let end = form.end_phrase.to_lowercase();
            let counters = FormCounters {
                triggers: count_occurrences(&haystack, &start),
                completions: count_completions(&haystack, &start, &end),
            };
            (form.name.clone(), counters)
        })
        .collect()
}

fn count_occurrences(haystack: &str, needle: &str) -> u64 {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count() as u64
}

fn count_completions(haystack: &str, start: &str, end: &str) -> u64 {
    if start.is_empty() || end.is_empty() {
        return 0;
    }
    // 終了フレーズの最後の出現位置より前で終わる開始フレーズだけが完了扱い
    let Some(last_end) = haystack.rfind(end) else {
        return 0;
    };

    let mut completions = 0;
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(start) {
        let position = from + offset;
        if position + start.len() <= last_end {
            completions += 1;
        } else {
            break;
        }
        let step = haystack[position..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        from = position + step;
    }
    completions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, start: &str, end: &str) -> FormDefinition {
        FormDefinition {
            name: name.to_string(),
            start_phrase: start.to_string(),
            end_phrase: end.to_string(),
        }
    }

    #[test]
    fn test_default_phrases_case_insensitive() {
        let text = "Je n'ai pas compris. JE N'AI PAS COMPRIS ! Pouvez-vous reformuler ?";
        let phrases = ["je n'ai pas compris", "pouvez-vous reformuler"];
        assert_eq!(count_default_phrases(text, &phrases), 3);
    }

    #[test]
    fn test_default_phrases_do_not_overlap() {
        assert_eq!(count_default_phrases("aaaa", &["aa"]), 2);
        assert_eq!(count_default_phrases("abc", &[""]), 0);
    }

    #[test]
    fn test_completions_require_end_after_trigger() {
        let forms = [form("contact", "Formulaire ouvert", "Merci pour votre demande")];
        let text = "formulaire ouvert ... merci pour votre demande ... formulaire ouvert";
        let counts = scan_form_flows(text, &forms);
        assert_eq!(
            counts["contact"],
            FormCounters {
                triggers: 2,
                completions: 1
            }
        );
    }

    #[test]
    fn test_overlapping_triggers_count_as_completions() {
        let forms = [form("f", "aa", "z")];
        let counts = scan_form_flows("aaa z", &forms);
        assert_eq!(counts["f"].triggers, 1);
        assert_eq!(counts["f"].completions, 2);
    }

    #[test]
    fn test_empty_phrases_yield_zero() {
        let forms = [form("a", "", "x"), form("b", "go", "")];
        let counts = scan_form_flows("go x go", &forms);
        assert_eq!(counts["a"], FormCounters::default());
        assert_eq!(counts["b"].triggers, 2);
        assert_eq!(counts["b"].completions, 0);
    }

    #[test]
    fn test_config_from_toml_and_scan() {
        let config = ScannerConfig::from_toml_str(
            r#"
default_phrases = ["désolé"]

[[forms]]
name = "signup"
start_phrase = "inscription"
end_phrase = "compte créé"
"#,
        )
        .unwrap();
        let scan = config.scan("Désolé. Inscription... compte créé");
        assert_eq!(scan.default_count, 1);
        assert_eq!(
            scan.formulaire_json().unwrap(),
            r#"{"signup":{"triggers":1,"completions":1}}"#
        );
    }
}
