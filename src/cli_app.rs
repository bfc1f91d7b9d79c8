//! Top-level CLI definition and dispatch.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::json;
use thiserror::Error;

use mount_visibility_tester::core::config::{Config, SamplingConfig};
use mount_visibility_tester::logger::jsonl::{EventType, JsonlWriter, LogEntry};
use mount_visibility_tester::pool::EnvironmentPool;
use mount_visibility_tester::report::io::{default_report_filename, load_report, save_report};
use mount_visibility_tester::report::model::{Metadata, Report, SystemInfo, TestConfigSection};
use mount_visibility_tester::report::render;
use mount_visibility_tester::report::stats::summarize;
use mount_visibility_tester::runtime::ContainerRuntime;
use mount_visibility_tester::runtime::docker::DockerCli;
use mount_visibility_tester::sampler::{RunState, Sampler};

/// Mount Visibility Tester — bind-mount propagation latency measurement.
#[derive(Debug, Parser)]
#[command(
    name = "mvt",
    author,
    version,
    about = "Mount Visibility Tester - bind-mount latency measurement",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the full measurement experiment.
    Run(RunArgs),
    /// Re-analyze a previously saved report.
    Analyze(AnalyzeArgs),
    /// Validate that the container runtime is reachable.
    Check(CheckArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Bundled sample-count/timeout presets for common run lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 25 samples, 15 s per-sample timeout (1-2 minutes).
    Quick,
    /// 100 samples, 30 s per-sample timeout (3-5 minutes).
    Standard,
    /// 500 samples, 60 s per-sample timeout (15-30 minutes).
    Thorough,
}

impl Preset {
    fn apply(self, sampling: &mut SamplingConfig) {
        let (samples, timeout) = match self {
            Self::Quick => (25, 15.0),
            Self::Standard => (100, 30.0),
            Self::Thorough => (500, 60.0),
        };
        sampling.num_samples = samples;
        sampling.timeout_seconds = timeout;
    }
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Preset run length; explicit --samples/--timeout still override it.
    #[arg(long, value_enum, value_name = "PRESET")]
    preset: Option<Preset>,
    /// Number of samples to collect.
    #[arg(long, value_name = "N")]
    samples: Option<u64>,
    /// Per-sample timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,
    /// Number of test environments to provision.
    #[arg(long, value_name = "N")]
    environments: Option<usize>,
    /// Interval between visibility checks in milliseconds.
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,
    /// Fixed RNG seed for a reproducible run.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
    /// Container image for test environments.
    #[arg(long, value_name = "IMAGE")]
    image: Option<String>,
    /// Report output path (defaults to a timestamped filename).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Skip ASCII chart rendering.
    #[arg(long)]
    no_charts: bool,
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    /// Report file to load.
    #[arg(value_name = "REPORT")]
    report: PathBuf,
    /// Skip ASCII chart rendering.
    #[arg(long)]
    no_charts: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct CheckArgs {}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure: no report could be produced.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI. An aborted-but-persisted run
    /// is not an error and exits 0; non-zero means no report was produced.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_experiment(cli, args),
        Command::Analyze(args) => run_analyze(cli, args),
        Command::Check(args) => run_check(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::User(e.to_string()))
}

fn effective_config(cli: &Cli, args: &RunArgs) -> Result<Config, CliError> {
    let mut config = load_config(cli)?;
    if let Some(preset) = args.preset {
        preset.apply(&mut config.sampling);
    }
    if let Some(samples) = args.samples {
        config.sampling.num_samples = samples;
    }
    if let Some(timeout) = args.timeout {
        config.sampling.timeout_seconds = timeout;
    }
    if let Some(environments) = args.environments {
        config.sampling.num_environments = environments;
    }
    if let Some(interval) = args.poll_interval_ms {
        config.sampling.poll_interval_ms = interval;
    }
    if let Some(seed) = args.seed {
        config.sampling.seed = Some(seed);
    }
    if let Some(image) = &args.image {
        config.runtime.image = image.clone();
    }
    config
        .validate()
        .map_err(|e| CliError::User(e.to_string()))?;
    Ok(config)
}

fn register_abort_flag() -> Arc<AtomicBool> {
    let abort = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&abort)) {
            eprintln!("[MVT-WARN] cannot register signal handler {signal}: {e}");
        }
    }
    abort
}

const fn state_label(state: RunState) -> &'static str {
    match state {
        RunState::Idle => "idle",
        RunState::Running => "running",
        RunState::Complete => "complete",
        RunState::Aborted => "aborted",
    }
}

fn run_experiment(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = effective_config(cli, args)?;
    let started_at = Utc::now();

    if cli.verbose {
        eprintln!(
            "config: samples={} timeout={}s interval={}ms environments={} image={}",
            config.sampling.num_samples,
            config.sampling.timeout_seconds,
            config.sampling.poll_interval_ms,
            config.sampling.num_environments,
            config.runtime.image
        );
    }

    let docker = DockerCli::new(config.runtime.docker_binary.clone());
    // Runtime unreachable means no sample can be trusted: abort before the
    // experiment starts, with no report written.
    docker
        .ping()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let mut log = JsonlWriter::open(&config.logging.jsonl_log);
    log.write_entry(&LogEntry::new(EventType::RunStart).with_details(format!(
        "samples={} timeout_s={} environments={}",
        config.sampling.num_samples,
        config.sampling.timeout_seconds,
        config.sampling.num_environments
    )));

    let metadata = Metadata::new(started_at, SystemInfo::collect(), docker.info());
    let abort = register_abort_flag();

    let mut pool = EnvironmentPool::provision(
        &docker,
        &config.runtime.image,
        &config.runtime.container_mount_path,
        config.sampling.num_environments,
    )
    .map_err(|e| {
        log.write_entry(&LogEntry::new(EventType::RunAborted).with_details(e.to_string()));
        CliError::Runtime(e.to_string())
    })?;
    log.write_entry(
        &LogEntry::new(EventType::EnvironmentProvision)
            .with_details(format!("count={}", pool.len())),
    );

    let show_progress = !cli.quiet && output_mode(cli) == OutputMode::Human;
    let mut sampler = Sampler::new(
        &docker,
        &pool,
        &config.sampling,
        &config.runtime.container_mount_path,
    );
    let result = sampler.run(&abort, |done, total| {
        if show_progress {
            eprintln!("progress: {done}/{total} samples");
        }
    });

    // Sample events are written after the loop; log IO must never land
    // inside a measured window.
    for sample in &result.samples {
        log.write_entry(&LogEntry::for_sample(sample));
    }
    let end_event = match result.state {
        RunState::Aborted => EventType::RunAborted,
        _ => EventType::RunComplete,
    };
    log.write_entry(
        &LogEntry::new(end_event).with_details(format!("samples={}", result.samples.len())),
    );

    let report = Report::new(metadata, TestConfigSection::from_config(&config), result.samples);
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_report_filename(started_at)));
    save_report(&report, &output_path).map_err(|e| CliError::Runtime(e.to_string()))?;

    pool.teardown();
    log.write_entry(&LogEntry::new(EventType::Teardown));
    log.flush();

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "report_path": output_path,
                "state": state_label(result.state),
                "summary": report.summary,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputMode::Human => {
            if result.state == RunState::Aborted {
                eprintln!(
                    "{}",
                    "warning: run aborted; partial report persisted".yellow()
                );
            }
            if !cli.quiet {
                print!("{}", render::render_summary(&report));
                if !args.no_charts {
                    print!("{}", render::render_charts(&report.samples));
                }
            }
            println!("report saved to: {}", output_path.display());
        }
    }
    Ok(())
}

fn run_analyze(cli: &Cli, args: &AnalyzeArgs) -> Result<(), CliError> {
    let mut report = load_report(&args.report).map_err(|e| CliError::Runtime(e.to_string()))?;

    // Re-analysis derives everything from the raw samples; the stored
    // summary is only consulted to flag divergence.
    let recomputed = summarize(&report.samples);
    let stored_matches = recomputed == report.summary;
    report.summary = recomputed;

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "report_path": args.report,
                "stored_summary_matches": stored_matches,
                "summary": report.summary,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputMode::Human => {
            if !stored_matches {
                eprintln!(
                    "{}",
                    "warning: stored summary diverges from samples; showing recomputed statistics"
                        .yellow()
                );
            }
            print!("{}", render::render_summary(&report));
            if !args.no_charts {
                print!("{}", render::render_charts(&report.samples));
            }
        }
    }
    Ok(())
}

fn run_check(cli: &Cli, _args: &CheckArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let docker = DockerCli::new(config.runtime.docker_binary.clone());

    docker
        .ping()
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let info = docker.info();

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "reachable": true,
                "runtime": info,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputMode::Human => {
            println!("{}", "container runtime reachable".green());
            println!("  runtime:          {}", info.name);
            println!("  version:          {}", info.version);
            println!("  api version:      {}", info.api_version);
            println!("  storage driver:   {}", info.storage_driver);
            println!("  operating system: {}", info.operating_system);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "mvt",
            "--config",
            "/tmp/mvt.toml",
            "--json",
            "--no-color",
            "-v",
            "check",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["mvt", "check", "--json", "--no-color", "-v"]);
        assert!(after.is_ok());
    }

    #[test]
    fn parses_subcommand_flag_combinations() {
        let cases = [
            vec!["mvt", "run"],
            vec!["mvt", "run", "--samples", "25", "--timeout", "15"],
            vec!["mvt", "run", "--preset", "quick"],
            vec!["mvt", "run", "--preset", "thorough", "--output", "out.json"],
            vec!["mvt", "run", "--environments", "5", "--poll-interval-ms", "2"],
            vec!["mvt", "run", "--seed", "42", "--image", "busybox:latest"],
            vec!["mvt", "run", "--no-charts"],
            vec!["mvt", "analyze", "report.json", "--no-charts"],
        ];

        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["mvt", "-v", "-q", "check"]).is_err());
    }

    #[test]
    fn analyze_requires_a_report_path() {
        assert!(Cli::try_parse_from(["mvt", "analyze"]).is_err());
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["mvt", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn presets_bundle_samples_and_timeout() {
        let mut sampling = SamplingConfig::default();
        Preset::Quick.apply(&mut sampling);
        assert_eq!(sampling.num_samples, 25);
        assert!((sampling.timeout_seconds - 15.0).abs() < f64::EPSILON);

        Preset::Thorough.apply(&mut sampling);
        assert_eq!(sampling.num_samples, 500);
        assert!((sampling.timeout_seconds - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exit_codes_follow_the_contract() {
        assert_eq!(CliError::User("bad flag".to_string()).exit_code(), 1);
        assert_eq!(CliError::Runtime("no docker".to_string()).exit_code(), 2);
        assert_eq!(CliError::Internal("bug".to_string()).exit_code(), 3);
    }
}
