//! # turncheck-cli
//!
//! Binary entry point for turncheck.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration and run request loading
//! - `turncheck run`: drives a runtime through test cases and reports the diff
//! - `turncheck validate`: checks a run request without contacting a runtime

mod display;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use turncheck_adapters::RestRuntime;
use turncheck_core::{
    ConversationRuntime, ScriptedRuntime, TestCaseRunner, Transcript, TurncheckConfig,
};
use turncheck_proto::{RunRequest, TestResult};

/// Configuration file looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "turncheck.yml";

/// turncheck - Check a conversational agent against scripted test cases
#[derive(Parser, Debug)]
#[command(name = "turncheck", version, about)]
struct Cli {
    /// Configuration file (defaults to ./turncheck.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run test cases against a conversational runtime
    Run(RunArgs),

    /// Parse a run request and report what it contains
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Run request file (JSON or YAML) with `test_cases` and `project_id`
    #[arg(short, long)]
    request: PathBuf,

    /// Override the request's project id
    #[arg(long)]
    project_id: Option<String>,

    /// Answer from a YAML transcript instead of the configured REST runtime
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Only run test cases with these ids (repeatable)
    #[arg(long = "case")]
    cases: Vec<String>,

    /// Override simulation.delivery_timeout_secs
    #[arg(long)]
    delivery_timeout: Option<u64>,

    /// Write JSON results to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Run request file (JSON or YAML)
    #[arg(short, long)]
    request: PathBuf,
}

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    /// Returns true if colors should be used based on mode and terminal detection.
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Report format for `turncheck run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable step diff
    #[default]
    Table,
    /// JSON results, as returned to the host
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable with --format json
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => {
            let all_passed = run_command(cli.config.as_deref(), cli.color, args).await?;
            if !all_passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Validate(args) => validate_command(cli.config.as_deref(), &args),
    }
}

/// Loads configuration from an explicit path, `./turncheck.yml`, or defaults.
fn load_config(path: Option<&Path>) -> Result<TurncheckConfig> {
    let config = match path {
        Some(path) => TurncheckConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                TurncheckConfig::from_file(default_path)
                    .with_context(|| format!("Failed to load config from {DEFAULT_CONFIG_FILE}"))?
            } else {
                debug!("Config file {DEFAULT_CONFIG_FILE} not found, using defaults");
                TurncheckConfig::default()
            }
        }
    };

    for warning in config.validate().context("Invalid configuration")? {
        warn!("{warning}");
    }
    Ok(config)
}

/// Loads a run request, as JSON when the extension says so and as YAML otherwise.
fn load_request(path: &Path) -> Result<RunRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run request {:?}", path))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let request = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run request {:?}", path))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse run request {:?}", path))?
    };
    Ok(request)
}

/// Runs the request and reports; returns whether every test case passed.
async fn run_command(config_path: Option<&Path>, color: ColorMode, args: RunArgs) -> Result<bool> {
    let mut config = load_config(config_path)?;
    if let Some(secs) = args.delivery_timeout {
        anyhow::ensure!(secs > 0, "--delivery-timeout must be greater than zero");
        config.simulation.delivery_timeout_secs = secs;
    }

    let mut request = load_request(&args.request)?;
    if let Some(project_id) = args.project_id {
        request.project_id = project_id;
    }
    if !args.cases.is_empty() {
        request
            .test_cases
            .retain(|test_case| args.cases.contains(&test_case.id));
        if request.test_cases.is_empty() {
            anyhow::bail!("No test case matches --case {}", args.cases.join(", "));
        }
    }

    let runtime: Box<dyn ConversationRuntime> = match &args.transcript {
        Some(path) => {
            let transcript = Transcript::from_file(path)
                .with_context(|| format!("Failed to load transcript {:?}", path))?;
            info!(turns = transcript.turns.len(), "Using scripted runtime");
            Box::new(ScriptedRuntime::from_transcript(transcript))
        }
        None => {
            let runtime = RestRuntime::new(&config.runtime)
                .context("Failed to set up the REST runtime")?;
            info!(url = %config.runtime.url, "Using REST runtime");
            Box::new(runtime)
        }
    };

    let runner = TestCaseRunner::new(runtime.as_ref(), &config.simulation);
    let started = Instant::now();
    let results = runner.run_request(&request).await;
    let elapsed = started.elapsed();

    if let Some(path) = &args.output {
        write_results(path, &results)?;
        info!(path = %path.display(), "Wrote results");
    }

    match args.format {
        OutputFormat::Table => {
            display::print_report(&results, elapsed, color.should_use_colors());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(results.iter().all(|result| result.success))
}

fn write_results(path: &Path, results: &[TestResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json).with_context(|| format!("Failed to write results to {:?}", path))
}

fn validate_command(config_path: Option<&Path>, args: &ValidateArgs) -> Result<()> {
    if config_path.is_some() {
        load_config(config_path)?;
    }
    let request = load_request(&args.request)?;

    let total_steps: usize = request.test_cases.iter().map(|tc| tc.steps.len()).sum();
    println!(
        "Project {}: {} test case(s), {} step(s)",
        request.project_id,
        request.test_cases.len(),
        total_steps
    );
    for test_case in &request.test_cases {
        println!(
            "  {} [{}] {} step(s), {} user turn(s)",
            test_case.id,
            test_case.language,
            test_case.steps.len(),
            test_case.user_turns()
        );
    }
    Ok(())
}
