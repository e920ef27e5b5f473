//! phasegate CLI — evaluate deployment gates from gate documents.
//!
//! Commands: evaluate, validate, completions
//!
//! `evaluate` exits 0 when the gate is open, 2 when it is closed and 1 on
//! any error.

mod state;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

use phasegate_core::config::{self, DocumentFormat, GateDocument, ResolvedGate};
use phasegate_core::time;

const EXIT_CLOSED: u8 = 2;

#[derive(Parser)]
#[command(name = "phasegate")]
#[command(version)]
#[command(about = "Declarative deployment gate for phased rollouts")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Evaluate a gate document and print the decision
    ///
    /// The whole document is validated before evaluation, so an invalid
    /// condition is rejected even when manual_override is set.
    #[command(alias = "eval")]
    Evaluate {
        /// Gate document (.yaml, .yml, .toml or .json)
        file: PathBuf,

        /// Evaluation instant, RFC3339 UTC (defaults to the current time)
        #[arg(long)]
        now: Option<String>,

        /// Deployment start time, RFC3339 UTC (overrides the document)
        #[arg(long)]
        start: Option<String>,

        /// State file recording the deployment start time across runs
        #[arg(long)]
        state: Option<PathBuf>,

        /// Document format (inferred from the extension when omitted)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputArg::Json)]
        output: OutputArg,
    },
    /// Check a gate document without evaluating it
    Validate {
        /// Gate document (.yaml, .yml, .toml or .json)
        file: PathBuf,

        /// Document format (inferred from the extension when omitted)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Yaml,
    Toml,
    Json,
}

impl From<FormatArg> for DocumentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Yaml => Self::Yaml,
            FormatArg::Toml => Self::Toml,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    /// Full decision as JSON
    Json,
    /// Status line only
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Evaluate {
            file,
            now,
            start,
            state,
            format,
            output,
        } => {
            let now = match now {
                Some(value) => time::parse_instant("--now", &value)?,
                None => Utc::now(),
            };
            let mut document = read_document(&file, format)?;
            if let Some(value) = start {
                time::parse_instant("--start", &value)?;
                document.deployment_start_time = Some(value);
            }

            // The state file is only written for a document that validates.
            let mut resolved = resolve(&document, now)?;
            if document.deployment_start_time.is_none() {
                if let Some(path) = &state {
                    resolved.deployment_start_time = state::load_or_init(path, now)?;
                }
            }
            let decision = phasegate_core::evaluate(&resolved.config, &resolved.context(now))
                .with_context(|| format!("evaluating {}", file.display()))?;

            match output {
                OutputArg::Json => println!("{}", serde_json::to_string_pretty(&decision)?),
                OutputArg::Text => println!("{}", decision.status_message),
            }

            Ok(if decision.condition_met {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_CLOSED)
            })
        }
        Commands::Validate { file, format } => {
            let document = read_document(&file, format)?;
            resolve(&document, Utc::now())?;
            println!("ok: {} is a valid gate document", file.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "phasegate", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_document(path: &Path, format: Option<FormatArg>) -> Result<GateDocument> {
    let format = match format {
        Some(arg) => DocumentFormat::from(arg),
        None => DocumentFormat::from_path(path).with_context(|| {
            format!(
                "cannot infer document format from {}; pass --format",
                path.display()
            )
        })?,
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    config::parse_document(&text, format).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve defaults and reject invalid configuration up front.
fn resolve(document: &GateDocument, now: DateTime<Utc>) -> Result<ResolvedGate> {
    let resolved = config::resolve_defaults(document, now)?;
    resolved.config.validate()?;
    Ok(resolved)
}
