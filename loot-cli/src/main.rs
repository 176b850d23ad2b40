use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use loot_core::template::{builtin_templates, template_by_id, StatementTemplate};
use loot_core::MeanPolicy;
use loot_ingest::{process_batch, summarize_saved, AzureAnalyzer, BatchOptions, FileOutcome, StatementInput};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod state;

use render::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "loot",
    version = env!("LOOT_BUILD_VERSION"),
    about = "Bank statement balance and deposit metrics"
)]
struct Cli {
    /// Log verbosity (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Statement template (see `loot templates`)
    #[arg(long)]
    template: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Weight the average balance by sample count across tables,
    /// overriding the config file and the template's own policy
    #[arg(long)]
    weighted: bool,

    /// Include every extracted field in text output
    #[arg(long)]
    raw: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.loot/config.toml
    Init,

    /// List built-in statement templates
    Templates,

    /// Send PDF statements to the extraction service and summarize them
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        model_id: Option<String>,

        /// Files processed concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Attempts per service request for retryable failures
        #[arg(long)]
        retries: Option<u32>,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Summarize saved analyze-result JSON documents without calling the service
    Summarize {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        out: OutputArgs,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Init => config::init_config()?,

        Command::Templates => {
            for t in builtin_templates()? {
                println!(
                    "{:<16} {:<22} day-count={:?} mean={:?} closing-row={}",
                    t.id,
                    t.issuer,
                    t.day_count,
                    t.mean_policy,
                    if t.exclude_closing_row { "excluded" } else { "kept" }
                );
            }
        }

        Command::Analyze {
            files,
            model_id,
            workers,
            timeout,
            retries,
            out,
        } => {
            let mut cfg = config::load_config()?;
            if let Some(m) = model_id {
                cfg.service.model_id = m;
            }
            if let Some(w) = workers {
                cfg.batch.workers = w;
            }
            if let Some(t) = timeout {
                cfg.service.timeout_secs = t;
            }
            if let Some(r) = retries {
                cfg.retry.max_attempts = r;
            }

            let inputs = read_inputs(&files)?;
            let analyzer = AzureAnalyzer::new(cfg.service_config(config::service_key()?)?)
                .context("build HTTP client")?
                .with_retry(cfg.retry_policy());

            let template = template_by_id(out.template.as_deref().unwrap_or(&cfg.batch.template))?;
            let policy = mean_policy(&out, cfg.batch.mean_policy, &template);
            let mut opts = BatchOptions::new(cfg.service.model_id.clone(), template);
            opts.mean_policy = policy;
            opts.workers = cfg.batch.workers;

            info!(
                model = %opts.model_id,
                template = opts.template.id,
                timeout = ?Duration::from_secs(cfg.service.timeout_secs),
                "analyzing"
            );
            let outcomes = process_batch(&analyzer, &inputs, &opts).await;
            emit(&outcomes, &out)?;
        }

        Command::Summarize { files, out } => {
            let cfg = config::load_config()?;
            let template = template_by_id(out.template.as_deref().unwrap_or(&cfg.batch.template))?;
            let policy = mean_policy(&out, cfg.batch.mean_policy, &template);

            let mut outcomes = Vec::with_capacity(files.len());
            for path in &files {
                let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
                outcomes.push(summarize_saved(&display_name(path), &json, &template, policy));
            }
            emit(&outcomes, &out)?;
        }
    }

    Ok(())
}

/// `--weighted`, then the config file, then the template.
fn mean_policy(out: &OutputArgs, configured: Option<MeanPolicy>, template: &StatementTemplate) -> MeanPolicy {
    if out.weighted {
        MeanPolicy::Weighted
    } else {
        configured.unwrap_or(template.mean_policy)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_inputs(files: &[PathBuf]) -> Result<Vec<StatementInput>> {
    files
        .iter()
        .map(|p| {
            if !p.exists() {
                bail!("file not found: {}", p.display());
            }
            StatementInput::read(p).with_context(|| format!("read {}", p.display()))
        })
        .collect()
}

fn emit(outcomes: &[FileOutcome], out: &OutputArgs) -> Result<()> {
    let report = render::render(outcomes, out.format, out.raw)?;
    match &out.output {
        Some(path) => {
            fs::write(path, &report).with_context(|| format!("write {}", path.display()))?;
            eprintln!("Wrote {} ({} files)", path.display(), outcomes.len());
        }
        None => print!("{}", report),
    }
    Ok(())
}
