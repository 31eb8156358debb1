use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use job_signal::config;
use job_signal::config::types::PipelineConfig;
use job_signal::embedding::{EmbeddingProvider, HttpEmbeddingProvider};
use job_signal::model::{EmailMessage, RunResult};
use job_signal::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "job-signal",
    about = "Distills recruitment-announcement email bodies into keyword, classification, and job-segment analytics"
)]
struct Cli {
    /// Path to the pipeline config JSON file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Embedding endpoint URL for the semantic stage (omit to run without one)
    #[arg(long, global = true)]
    embedding_url: Option<String>,

    /// Request timeout in seconds for the embedding endpoint
    #[arg(long, global = true, default_value_t = 30)]
    embedding_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single message (JSON on stdin, or from a file)
    Run {
        /// Path to a JSON-encoded `EmailMessage`; reads stdin if omitted
        message_path: Option<PathBuf>,
    },
    /// Process a batch of messages (a JSON array of `EmailMessage`)
    Batch {
        /// Path to a JSON array of `EmailMessage`; reads stdin if omitted
        messages_path: Option<PathBuf>,
    },
    /// Validate a pipeline config file without processing anything
    Check {
        /// Path to the pipeline config JSON file
        config_path: PathBuf,
    },
    /// Print the resolved pipeline configuration as JSON
    ShowConfig,
}

fn setup_logging() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "plain".to_string());

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level),
    );
    if format == "json" {
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                r#"{{"level":"{}","target":"{}","message":"{}"}}"#,
                record.level(),
                record.target(),
                record.args()
            )
        });
    }
    if std::env::var("LOG_TO_FILE").is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes")) {
        // LOG_TO_FILE requests file-backed logging; env_logger writes to
        // stderr regardless here since this crate has no file-rotation
        // collaborator of its own — the flag is still read and acknowledged
        // so a deployment's log-shipping sidecar can redirect stderr itself.
        eprintln!("[job-signal] LOG_TO_FILE is set; logging to stderr for external capture");
    }
    builder.init();
}

fn resolve_config_path(cli_path: Option<&PathBuf>) -> PathBuf {
    cli_path
        .cloned()
        .or_else(config::default_config_path)
        .unwrap_or_else(|| PathBuf::from("pipeline.json"))
}

fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    config::load_or_default(path).map_err(|e| anyhow::anyhow!("{e}"))
}

fn build_embedding_provider(cli: &Cli) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
    let Some(url) = &cli.embedding_url else {
        return Ok(None);
    };
    let model = std::env::var("SEMANTIC_MODEL").ok();
    let device = std::env::var("SEMANTIC_DEVICE").ok();
    let provider = HttpEmbeddingProvider::with_model(url.clone(), cli.embedding_timeout, model, device)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(Some(Arc::new(provider)))
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) => Ok(std::fs::read_to_string(p)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", p.display()))?),
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn cmd_run(cli: &Cli, message_path: Option<&PathBuf>) -> anyhow::Result<i32> {
    let config_path = resolve_config_path(cli.config.as_ref());
    let config = load_config(&config_path)?;
    let embedding = build_embedding_provider(cli)?;
    let pipeline = Pipeline::new(Arc::new(config), embedding).map_err(|e| anyhow::anyhow!("{e}"))?;

    let raw = read_input(message_path)?;
    let message: EmailMessage = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse message JSON: {e}"))?;

    let result = pipeline.process_message(&message);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(0)
}

fn cmd_batch(cli: &Cli, messages_path: Option<&PathBuf>) -> anyhow::Result<i32> {
    let config_path = resolve_config_path(cli.config.as_ref());
    let config = load_config(&config_path)?;
    let embedding = build_embedding_provider(cli)?;
    let pipeline = Pipeline::new(Arc::new(config), embedding).map_err(|e| anyhow::anyhow!("{e}"))?;

    let raw = read_input(messages_path)?;
    let messages: Vec<EmailMessage> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse message array JSON: {e}"))?;

    let run: RunResult = pipeline
        .process_messages(&messages, None)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(0)
}

fn cmd_check(config_path: &Path) -> i32 {
    match config::try_load_config(config_path) {
        Ok(Some(cfg)) => {
            eprintln!(
                "[job-signal] {} is valid ({} step(s): {:?})",
                config_path.display(),
                cfg.steps.len(),
                cfg.steps
            );
            0
        }
        Ok(None) => {
            eprintln!("[job-signal] file not found: {}", config_path.display());
            1
        }
        Err(e) => {
            eprintln!("[job-signal] error: {e}");
            1
        }
    }
}

fn cmd_show_config(cli: &Cli) -> anyhow::Result<i32> {
    let config_path = resolve_config_path(cli.config.as_ref());
    let config = load_config(&config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(0)
}

fn main() {
    let cli = Cli::parse();
    setup_logging();

    let exit_code = match &cli.command {
        Commands::Run { message_path } => cmd_run(&cli, message_path.as_ref()).unwrap_or_else(|e| {
            eprintln!("[job-signal] error: {e:#}");
            1
        }),
        Commands::Batch { messages_path } => cmd_batch(&cli, messages_path.as_ref()).unwrap_or_else(|e| {
            eprintln!("[job-signal] error: {e:#}");
            1
        }),
        Commands::Check { config_path } => cmd_check(config_path),
        Commands::ShowConfig => cmd_show_config(&cli).unwrap_or_else(|e| {
            eprintln!("[job-signal] error: {e:#}");
            1
        }),
    };
    std::process::exit(exit_code);
}
