use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fwfeed_core::{
    load_config, load_config_or_default, read_records, validate_config, AnalysisBackend,
    ArtifactLoader, BatchReport, Config, FactClient, FsArtifactLoader, IngestionOrchestrator,
};

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG: &str = "fwfeed.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Submit a batch of firmware images to a FACT analysis backend
#[derive(Parser, Debug)]
#[command(name = "fwfeed")]
#[command(version)]
struct Args {
    /// Config file (TOML). Missing default file falls back to built-in defaults
    #[arg(short, long, env = "FWFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long)]
    url: Option<String>,

    /// Directory holding `<vendor>/<file_path>/<file_name>` images
    #[arg(long)]
    artifact_root: Option<PathBuf>,

    /// Metadata CSV describing the batch
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Read at most this many bytes of each image
    #[arg(long)]
    byte_limit: Option<u64>,

    /// Maximum number of analyses running on the backend
    #[arg(long)]
    concurrency: Option<usize>,

    /// Do not wait for a free analysis slot between submissions
    #[arg(long)]
    no_concurrency_limit: bool,

    /// Accept invalid TLS certificates from the backend
    #[arg(long)]
    insecure: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = "FWFEED_LOG_FORMAT")]
    log_format: LogFormat,
}

impl Args {
    /// Apply command-line overrides on top of file and environment values.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.backend.url = url.clone();
        }
        if let Some(root) = &self.artifact_root {
            config.source.artifact_root = root.clone();
        }
        if let Some(metadata) = &self.metadata {
            config.source.metadata_path = metadata.clone();
        }
        if let Some(limit) = self.byte_limit {
            config.source.byte_limit = Some(limit);
        }
        if let Some(concurrency) = self.concurrency {
            config.admission.concurrency_limit = concurrency;
        }
        if self.no_concurrency_limit {
            config.admission.limit_enabled = false;
        }
        if self.insecure {
            config.backend.accept_invalid_certs = true;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_format);

    match run(args).await {
        Ok(report) if report.is_complete() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(format: LogFormat) {
    let (text, json) = match format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(text)
        .with(json)
        .init();
}

async fn run(args: Args) -> Result<BatchReport> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_or_default(&PathBuf::from(DEFAULT_CONFIG))
            .context("Failed to load configuration")?,
    };
    args.apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    info!("Backend: {}", config.backend.url);
    if config.admission.limit_enabled {
        info!("Concurrency limit: {}", config.admission.concurrency_limit);
    } else {
        warn!("Concurrency limit disabled");
    }

    let records = read_records(&config.source.metadata_path).with_context(|| {
        format!(
            "Failed to read metadata from {:?}",
            config.source.metadata_path
        )
    })?;
    info!("Loaded {} record(s)", records.len());

    let backend: Arc<dyn AnalysisBackend> = Arc::new(
        FactClient::new(config.backend.clone()).context("Failed to create backend client")?,
    );
    let fs_loader = FsArtifactLoader::new(
        config.source.artifact_root.clone(),
        config.source.byte_limit,
    );
    info!("Artifact root: {}", fs_loader.root().display());
    let loader: Arc<dyn ArtifactLoader> = Arc::new(fs_loader);

    let orchestrator = IngestionOrchestrator::new(&config, backend, loader);
    let report = orchestrator
        .run_batch(records)
        .await
        .context("Batch could not start")?;

    print_summary(&report, args.log_format)?;
    Ok(report)
}

fn print_summary(report: &BatchReport, format: LogFormat) -> Result<()> {
    let state = &report.state;
    match format {
        LogFormat::Json => {
            let mut summary = serde_json::to_value(state)?;
            summary["halted"] = match &report.halted {
                Some(halt) => serde_json::json!({
                    "position": halt.position,
                    "file_name": halt.record.file_name,
                    "error": halt.error.to_string(),
                }),
                None => serde_json::Value::Null,
            };
            println!("{}", summary);
        }
        LogFormat::Text => {
            println!(
                "submitted: {}, skipped: {}, failed: {}",
                state.submitted, state.skipped, state.failed
            );
            if let Some(halt) = &report.halted {
                println!(
                    "halted at record {} ({}): {}",
                    halt.position, halt.record.file_name, halt.error
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "fwfeed",
            "--url",
            "https://fact.lab:5000",
            "--concurrency",
            "4",
            "--no-concurrency-limit",
            "--insecure",
            "--byte-limit",
            "1024",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.backend.url, "https://fact.lab:5000");
        assert_eq!(config.admission.concurrency_limit, 4);
        assert!(!config.admission.limit_enabled);
        assert!(config.backend.accept_invalid_certs);
        assert_eq!(config.source.byte_limit, Some(1024));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["fwfeed"]);
        let mut config = Config::default();
        config.admission.concurrency_limit = 7;
        args.apply(&mut config);

        assert_eq!(config.admission.concurrency_limit, 7);
        assert!(config.admission.limit_enabled);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_json() {
        let args = Args::parse_from(["fwfeed", "--log-format", "json"]);
        assert_eq!(args.log_format, LogFormat::Json);
    }
}
