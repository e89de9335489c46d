//! ロギング初期化とパネル計算時間の計測

use crate::config::LogConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ファイル出力のワーカーガード（プロセス終了まで保持）
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 遅いパネル計算として警告する閾値
const SLOW_PANEL_THRESHOLD: Duration = Duration::from_millis(500);

/// ログシステムを初期化
///
/// `RUST_LOG` が設定されていればそれを優先し、なければ設定のログレベルを使う。
/// コンソール出力は標準エラーへ書き、標準出力はレポート用に空けておく。
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if !config.enable_file_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()?;
        return Ok(());
    }

    let log_dir = config.resolved_log_dir()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let removed = if config.auto_cleanup_enabled {
        cleanup_old_logs(
            &log_dir,
            &config.log_file_prefix,
            config.max_log_files as usize,
        )?
    } else {
        0
    };

    let file_appender = tracing_appender::rolling::daily(
        &log_dir,
        format!("{}.log", config.log_file_prefix),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        log_dir = %log_dir.display(),
        removed_files = removed,
        "📝 File logging enabled"
    );
    Ok(())
}

/// 接頭辞に一致するログファイルのうち、新しい `keep` 件を残して削除
///
/// 日次ローテーションのファイル名は日付で終わるため、名前順で古い順に並ぶ。
/// 削除したファイル数を返す。
pub fn cleanup_old_logs(log_dir: &Path, prefix: &str, keep: usize) -> Result<usize> {
    let pattern = log_dir.join(format!("{}.log*", prefix));
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid log file pattern: {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    if files.len() <= keep {
        return Ok(0);
    }

    files.sort();
    let excess = files.len() - keep;
    let mut removed = 0;
    for path in files.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("🗑️ Removed old log file: {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove old log file {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

/// パネル計算時間を計測するガード
///
/// ドロップ時に経過時間を記録し、閾値を超えた場合は警告を出す。
pub struct PanelTimer {
    start: Instant,
    context: String,
}

impl PanelTimer {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            context: context.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PanelTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        if duration > SLOW_PANEL_THRESHOLD {
            warn!(
                context = %self.context,
                duration_ms = duration.as_millis(),
                "⚠️ Slow panel computation detected"
            );
        } else {
            debug!(
                context = %self.context,
                duration_ms = duration.as_millis(),
                "✅ Panel computed"
            );
        }
    }
}
