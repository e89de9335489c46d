use anyhow::Context;
use clap::{Parser, Subcommand};
use scuuba_light::{
    analytics::export::{ExportConfig, ExportFormat, ExportManager},
    analytics::transcript_scanner::ScannerConfig,
    config::{AppConfig, ConfigManager},
    load_dataset_from_path, logging, pipeline,
    web::DashboardServer,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "scuuba")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "scuuba light - Dashboard Client for conversation analysis files")]
struct Cli {
    /// 設定ファイル（省略時はXDG設定ディレクトリの config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ログレベル (trace/debug/info/warn/error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the local dashboard server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Compute the dashboard for a CSV file and export it
    Report {
        /// Analysis CSV file
        input: PathBuf,
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// json, csv or xlsx
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output file (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Leave chart data out of the export
        #[arg(long)]
        no_charts: bool,
        /// Leave report metadata out of the export
        #[arg(long)]
        no_metadata: bool,
    },
    /// Extract default_count and formulaire_data from a transcript
    Scan {
        /// Transcript text file
        transcript: PathBuf,
        /// TOML file with default phrases and form definitions
        #[arg(short, long)]
        rules: PathBuf,
    },
    /// Show the configuration file location
    Config {
        /// Write the default configuration if no file exists yet
        #[arg(long)]
        init: bool,
    },
}

fn config_manager(path: Option<&Path>) -> anyhow::Result<ConfigManager> {
    Ok(match path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    })
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    config: &AppConfig,
    input: &Path,
    start: Option<&str>,
    end: Option<&str>,
    format: &str,
    output: Option<&Path>,
    include_charts: bool,
    include_metadata: bool,
) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    let dataset = load_dataset_from_path(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let selection = pipeline::resolve_selection(&dataset, start, end)?;
    let analysis = pipeline::analyze(&source_name(input), &dataset, selection, &config.dashboard);
    tracing::info!("{}", analysis.notice.message());

    let export_config = ExportConfig {
        format,
        include_metadata,
        include_charts,
    };
    let bytes = ExportManager::new().export(&analysis.report, &export_config)?;

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("💾 Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn run_scan(transcript: &Path, rules: &Path) -> anyhow::Result<()> {
    let scanner = ScannerConfig::load(rules)?;
    let text = std::fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read {}", transcript.display()))?;

    let scan = scanner.scan(&text);
    tracing::debug!(
        default_count = scan.default_count,
        forms = scan.formulaire_data.len(),
        "🔎 Transcript scanned"
    );
    println!("{}", serde_json::to_string_pretty(&scan)?);
    Ok(())
}

fn run_config(manager: &ConfigManager, init: bool) -> anyhow::Result<()> {
    let path = manager.get_config_file_path();
    if init {
        if manager.config_exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        manager.save_config(&AppConfig::default())?;
    }

    let status = if manager.config_exists() {
        "present"
    } else {
        "not found, defaults in use"
    };
    println!("{} ({})", path.display(), status);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let manager = config_manager(cli.config.as_deref())?;
    let mut config = manager.load_config()?;
    if let Some(level) = cli.log_level {
        config.log.log_level = level;
    }
    logging::init_logging(&config.log)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!("🎬 Starting scuuba light dashboard");
            DashboardServer::new(config.server, config.dashboard)
                .serve()
                .await
        }
        Commands::Report {
            input,
            start,
            end,
            format,
            output,
            no_charts,
            no_metadata,
        } => run_report(
            &config,
            &input,
            start.as_deref(),
            end.as_deref(),
            &format,
            output.as_deref(),
            !no_charts,
            !no_metadata,
        ),
        Commands::Scan { transcript, rules } => run_scan(&transcript, &rules),
        Commands::Config { init } => run_config(&manager, init),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
