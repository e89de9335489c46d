use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 解析済みファイルと同じ列を持つ合成データを生成
#[derive(Parser)]
#[command(name = "generate_test_data")]
struct Args {
    /// 出力先
    #[arg(short, long, default_value = "tests/data/generated_conversations.csv")]
    output: PathBuf,
    /// 会話数
    #[arg(short, long, default_value_t = 500)]
    rows: usize,
    /// 期間の日数
    #[arg(long, default_value_t = 30)]
    days: i64,
    /// 乱数シード
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const THEMES: [(&str, &[&str]); 4] = [
    ("Compte", &["Connexion", "Mot de passe", "Suppression"]),
    ("Facturation", &["Paiement", "Remboursement", "Facture"]),
    ("Livraison", &["Suivi", "Retard", "Adresse"]),
    ("Produit", &["Disponibilité", "Garantie"]),
];
const LANGUAGES: [(&str, u32); 6] = [
    ("fr", 70),
    ("en", 15),
    ("es", 6),
    ("de", 5),
    ("it", 3),
    ("nl", 1),
];
const DEVICES: [&str; 3] = ["desktop", "mobile", "tablet"];
const URLS: [&str; 5] = [
    "https://exemple.fr/",
    "https://exemple.fr/compte",
    "https://exemple.fr/panier",
    "https://exemple.fr/aide",
    "https://exemple.fr/commande",
];
const HOT_TOPICS: [&str; 3] = ["Soldes d'été", "Panne de paiement", "Nouvelle collection"];
const FORMS: [&str; 3] = ["contact", "rappel", "reclamation"];

const HEADERS: [&str; 14] = [
    "conversationId",
    "date",
    "theme_principal",
    "sous_theme",
    "turn_count",
    "default_count",
    "feedbackPositive",
    "feedbackNegative",
    "language_normalized",
    "is_hot_topic",
    "hot_topic_name",
    "urls",
    "device",
    "formulaire_data",
];

fn pick_language(rng: &mut StdRng) -> &'static str {
    let total: u32 = LANGUAGES.iter().map(|(_, weight)| weight).sum();
    let mut roll = rng.gen_range(0..total);
    for (language, weight) in LANGUAGES {
        if roll < weight {
            return language;
        }
        roll -= weight;
    }
    LANGUAGES[0].0
}

fn form_data(rng: &mut StdRng) -> anyhow::Result<String> {
    let mut forms = BTreeMap::new();
    if rng.gen_bool(0.25) {
        let name = FORMS.choose(rng).copied().unwrap_or(FORMS[0]);
        let triggers: u64 = rng.gen_range(1..=2);
        let completions = rng.gen_range(0..=triggers);
        forms.insert(
            name,
            serde_json::json!({ "triggers": triggers, "completions": completions }),
        );
    }
    Ok(serde_json::to_string(&forms)?)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = NaiveDate::from_ymd_opt(2024, 6, 1)
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(&args.output)?;
    writer.write_record(HEADERS)?;

    for index in 0..args.rows {
        let day = start + Duration::days(rng.gen_range(0..args.days.max(1)));
        let hour = rng.gen_range(8..20);
        let minute = rng.gen_range(0..60);
        let (theme, sub_themes) = THEMES.choose(&mut rng).copied().unwrap_or(THEMES[0]);
        let sub_theme = sub_themes.choose(&mut rng).copied().unwrap_or_default();

        let (positive, negative) = match rng.gen_range(0..10) {
            0..=4 => (0, 0),
            5..=7 => (1, 0),
            8 => (0, 1),
            _ => (1, 1),
        };
        let hot_topic = rng.gen_bool(0.15);
        let url_count = rng.gen_range(0..=2);
        let urls: Vec<&str> = URLS.choose_multiple(&mut rng, url_count).copied().collect();

        writer.write_record([
            format!("conv-{:05}", index + 1),
            format!("{}T{:02}:{:02}:00Z", day, hour, minute),
            theme.to_string(),
            sub_theme.to_string(),
            rng.gen_range(1..15u32).to_string(),
            rng.gen_range(0..3u32).to_string(),
            positive.to_string(),
            negative.to_string(),
            pick_language(&mut rng).to_string(),
            hot_topic.to_string(),
            if hot_topic {
                HOT_TOPICS.choose(&mut rng).copied().unwrap_or_default().to_string()
            } else {
                String::new()
            },
            urls.join(", "),
            DEVICES.choose(&mut rng).copied().unwrap_or_default().to_string(),
            form_data(&mut rng)?,
        ])?;
    }
    writer.flush()?;

    println!(
        "✅ テストデータファイルを生成しました: {} ({} conversations)",
        args.output.display(),
        args.rows
    );
    Ok(())
}
