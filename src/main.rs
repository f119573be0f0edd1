//! toolrank - run code analyzers and rank their suggestions
//!
//! A CLI tool that runs a battery of external analysis tools against
//! source files, derives improvement suggestions from their output, and
//! selects the best suggestion per file.
//!
//! Exit codes:
//!   0 - Success (no suggestions, or no --fail-on-suggestions set)
//!   1 - Runtime error (config, acquisition, clone failure, etc.)
//!   2 - Suggestions found with --fail-on-suggestions

mod analysis;
mod cli;
mod config;
mod error;
mod invoker;
mod models;
mod repo;
mod report;
mod scanner;
mod sonar;
mod source;

use analysis::{Analyzer, ResultAggregator, SuggestionRanker};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use invoker::ToolInvoker;
use models::{Report, ReportMetadata};
use source::{AcquiredSource, SourceAcquirer};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first so `general.verbose` reaches the subscriber
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    init_logging(config.log_level(&args));

    info!("toolrank v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    info!("{}", origin);
    config.merge_with_args(&args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .toolrank.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize tools, markers, extensions, and more.");
    Ok(())
}

/// Initialize logging at the merged verbosity level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete workflow. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.validate().context("Invalid configuration")?;

    let spec = args
        .source_spec()
        .context("One of --local, --url or --repo is required")?;

    println!("📥 Acquiring source: {}", spec.label());
    let acquirer = SourceAcquirer::new(
        scanner::ScanConfig::from(&config.scanner),
        config.network_timeout(),
    )
    .with_head_check(config.network.verify_head)
    .with_progress(!args.quiet);
    let source = acquirer
        .acquire(&spec)
        .await
        .with_context(|| format!("Failed to acquire {}", spec.label()))?;

    if let Some(workspace) = source.workspace() {
        debug!("Workspace: {}", workspace.display());
    }

    let tools = config.tools();

    // Handle --dry-run: list artifacts and exit
    if args.dry_run {
        return handle_dry_run(&source, &config);
    }

    if tools.is_empty() {
        warn!("No tools configured; every result set will be empty");
    }

    println!("🔧 Tools: {}", tool_names(&config).join(", "));
    println!(
        "   Concurrency: {} | Timeout: {}s",
        config.general.concurrency, config.general.timeout_seconds
    );

    let invoker =
        ToolInvoker::new(config.tool_timeout()).with_network_timeout(config.network_timeout());
    let aggregator = ResultAggregator::new(invoker, config.general.concurrency);
    let analyzer = Analyzer::new(
        tools,
        aggregator,
        config.markers.clone(),
        SuggestionRanker::default(),
    );

    println!("\n🔬 Analyzing {} artifact(s)...\n", source.artifacts.len());
    let progress = artifact_progress(source.artifacts.len() as u64, args.quiet);

    let mut artifact_reports = Vec::with_capacity(source.artifacts.len());
    for artifact in &source.artifacts {
        progress.set_message(artifact.id.clone());
        let artifact_report = analyzer.analyze_artifact(artifact).await;

        for (tool, outcome) in artifact_report.results.iter() {
            if !outcome.is_success() {
                debug!("{} on {}: {}", tool, artifact.id, outcome);
            }
        }

        artifact_reports.push(artifact_report);
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!("📝 Generating report...");

    let metadata = ReportMetadata {
        source: source.label.clone(),
        analysis_date: Utc::now(),
        tools: tool_names(&config),
        artifacts_analyzed: artifact_reports.len(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report::new(metadata, artifact_reports);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if let Some(ref prompts_path) = args.prompts {
        std::fs::write(prompts_path, report::generate_prompts(&report)).with_context(|| {
            format!("Failed to write prompts to {}", prompts_path.display())
        })?;
        info!("Prompts written to {}", prompts_path.display());
    }

    // Print summary
    let summary = &report.summary;
    println!("\n📊 Analysis Summary:");
    println!("   Artifacts: {}", report.artifacts.len());
    println!(
        "   Tool runs: {} | ✅ {} | ❔ {} | ❌ {} | ⏱️ {}",
        summary.total, summary.succeeded, summary.not_found, summary.failed, summary.timed_out
    );
    println!(
        "   Artifacts with suggestions: {}",
        summary.artifacts_with_suggestions
    );
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!(
        "\n✅ Run complete! Report saved to: {}",
        output_path.display()
    );

    if args.fail_on_suggestions && summary.artifacts_with_suggestions > 0 {
        eprintln!(
            "\n⛔ Suggestions found for {} artifact(s). Failing (exit code 2).",
            summary.artifacts_with_suggestions
        );
        return Ok(2);
    }

    Ok(0)
}

fn tool_names(config: &Config) -> Vec<String> {
    config.tools().into_iter().map(|tool| tool.name).collect()
}

fn artifact_progress(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Handle --dry-run: print what would be analyzed, exit.
fn handle_dry_run(source: &AcquiredSource, config: &Config) -> Result<i32> {
    println!("\n🔍 Dry run: no tools will be executed.\n");

    if source.artifacts.is_empty() {
        println!("   No matching artifacts found.");
    } else {
        println!(
            "   Found {} artifact(s) that would be analyzed:\n",
            source.artifacts.len()
        );
        for artifact in &source.artifacts {
            println!("     📄 {}", artifact.id);
        }
    }

    println!("\n   Tools that would run:");
    for tool in config.tools() {
        println!("     🔧 {} ({})", tool.name, tool.args.join(" "));
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go to stderr and the
/// returned origin line is logged once the subscriber exists.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("Loaded config from {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, format!("Loaded default config from {}", CONFIG_FILE))),
        Ok(None) => Ok((
            Config::default(),
            "No config file found, using defaults".to_string(),
        )),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
            Ok((
                Config::default(),
                format!("Ignored unreadable {}, using defaults", CONFIG_FILE),
            ))
        }
    }
}
