//! Whispr CLI: submit, browse and review anonymous reports.

mod config;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

use config::CliConfig;
use whispr_reconciler::{ReconciliationMode, ReportStateReconciler};
use whispr_remote::CanisterClient;
use whispr_store::LocalCache;
use whispr_store_lmdb::LmdbKeyValueStore;
use whispr_types::{
    Coordinates, EvidenceFile, Location, ReportDraft, StatusFilter, Tokens, Verdict,
};
use whispr_utils::LogFormat;

#[derive(Parser)]
#[command(name = "whispr", about = "Whispr anonymous crime reporting client")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "WHISPR_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the canister HTTP gateway.
    #[arg(long, env = "WHISPR_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Report canister id.
    #[arg(long, env = "WHISPR_CANISTER_ID")]
    canister_id: Option<String>,

    /// Wallet principal to call as.
    #[arg(long, env = "WHISPR_PRINCIPAL")]
    principal: Option<String>,

    /// Directory for the local report cache.
    #[arg(long, env = "WHISPR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Reconciliation mode: "optimistic" or "strict".
    #[arg(long, env = "WHISPR_MODE")]
    mode: Option<ReconciliationMode>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "WHISPR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "WHISPR_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Submit a new report, staking tokens on it.
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "other")]
        category: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Incident date, YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,
        /// Incident time, HH:MM.
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        stake: u64,
        /// Evidence file to attach (repeatable).
        #[arg(long = "evidence")]
        evidence: Vec<PathBuf>,
    },
    /// List my reports.
    List,
    /// Show one report by id (decimal or 0x-hex).
    Show { id: String },
    /// List reports in a status: pending, under_review, verified, rejected or all.
    Status { status: StatusFilter },
    /// List every report (authority).
    All,
    /// Verify a report and pay out stake × multiplier (authority).
    Verify {
        id: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        multiplier: Option<u64>,
    },
    /// Reject a report (authority).
    Reject {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show the token balance.
    Balance,
    /// Show authority dashboard statistics.
    Stats,
    /// Replay remote calls that failed earlier.
    Retry,
    /// List remote calls waiting to be replayed.
    Pending,
    /// Print the effective configuration as TOML.
    ShowConfig,
}

impl Cli {
    fn effective_config(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = CliConfig::from_toml_file(path)?;
                tracing::info!("loaded config from {}", path.display());
                config
            }
            None => CliConfig::default(),
        };

        if let Some(url) = &self.gateway_url {
            config.gateway_url = url.clone();
        }
        if let Some(id) = &self.canister_id {
            config.canister_id = id.clone();
        }
        if let Some(principal) = &self.principal {
            config.principal = Some(principal.clone());
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(mode) = self.mode {
            config.reconciler.mode = mode;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

fn load_evidence(path: &Path) -> anyhow::Result<EvidenceFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read evidence file {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "evidence".into());
    Ok(EvidenceFile::from_bytes(name, media_type_for(path), &bytes))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;
    whispr_utils::init_logging(config.log_format, &config.log_level);

    if let Command::ShowConfig = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let store = LmdbKeyValueStore::open(&config.data_dir, config.map_size)
        .with_context(|| format!("failed to open cache in {}", config.data_dir.display()))?;
    let cache = LocalCache::scoped(store, config.cache_scope());
    let client = CanisterClient::new(config.client_options()?)?;
    tracing::debug!(
        gateway = %config.gateway_url,
        canister = %config.canister_id,
        mode = %config.reconciler.mode,
        "starting reconciler"
    );
    let reconciler = ReportStateReconciler::new(client, cache, config.reconciler.clone());

    match cli.command {
        Command::Submit {
            title,
            description,
            category,
            address,
            lat,
            lng,
            date,
            time,
            stake,
            evidence,
        } => {
            let evidence = evidence
                .iter()
                .map(|p| load_evidence(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let draft = ReportDraft {
                title,
                description,
                category,
                location: Location {
                    address,
                    coordinates: lat.zip(lng).map(|(lat, lng)| Coordinates { lat, lng }),
                },
                incident_date: date,
                incident_time: time,
                stake: Tokens::new(stake),
                evidence,
            };
            print_json(&reconciler.submit(draft).await?)?;
        }
        Command::List => print_json(&reconciler.list_mine().await?)?,
        Command::Show { id } => print_json(&reconciler.get_by_id(&id).await?)?,
        Command::Status { status } => print_json(&reconciler.list_by_status(status).await?)?,
        Command::All => print_json(&reconciler.list_all().await?)?,
        Command::Verify {
            id,
            notes,
            multiplier,
        } => {
            let outcome = reconciler
                .decide(&id, Verdict::Verified, notes, multiplier)
                .await?;
            print_json(&outcome)?;
        }
        Command::Reject { id, notes } => {
            let outcome = reconciler.decide(&id, Verdict::Rejected, notes, None).await?;
            print_json(&outcome)?;
        }
        Command::Balance => {
            let balance = reconciler.balance().await?;
            print_json(&serde_json::json!({ "balance": balance }))?;
        }
        Command::Stats => print_json(&reconciler.authority_statistics().await?)?,
        Command::Retry => print_json(&reconciler.retry_pending().await?)?,
        Command::Pending => print_json(&reconciler.pending_remote_ops()?)?,
        Command::ShowConfig => {}
    }
    Ok(())
}
