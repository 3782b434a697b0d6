//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use patentinsight_core::artifacts;
use patentinsight_core::pipeline::{self, ProgressReporter, RunOptions};
use patentinsight_shared::{
    AppConfig, ExecutionSummary, RunStatus, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PatentInsight: rank patent-search results by keyword relevance.
#[derive(Parser)]
#[command(
    name = "patentinsight",
    version,
    about = "Enrich patent-search results with abstracts and rank them by keyword relevance.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the fetch/integrate/score/rank pipeline over a search-result CSV.
    Run {
        /// Input search-result CSV file.
        #[arg(short, long)]
        input: PathBuf,

        /// Keyword-category JSON file used for scoring.
        #[arg(short, long)]
        keywords: PathBuf,

        /// Output directory for artifacts (defaults to the config value).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to ~/.patentinsight/patentinsight.toml).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 1-based offset of the first record to process.
        #[arg(long, default_value_t = 1)]
        start_number: usize,

        /// Number of records to process (defaults to the rest of the input).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Skip abstract fetching; integrate against this existing artifact.
        #[arg(long, value_name = "ABSTRACTS_JSON")]
        skip_abstract_fetch: Option<PathBuf>,

        /// Test mode: take abstracts from a mock file instead of the network.
        #[arg(long, value_name = "MOCK_JSON")]
        mock_abstracts: Option<PathBuf>,

        /// Halt at the first per-record error instead of continuing.
        #[arg(long)]
        no_continue_on_error: bool,

        /// Number of top records to display and embed in the summary.
        #[arg(long, default_value_t = 10)]
        top_n: usize,
    },

    /// Regenerate the sorted view of an existing scored-records artifact.
    Sort {
        /// Scored-records JSON file to sort.
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (defaults to `<input stem>_sorted.json`).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "patentinsight=info",
        1 => "patentinsight=debug",
        _ => "patentinsight=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            input,
            keywords,
            output,
            config,
            start_number,
            batch_size,
            skip_abstract_fetch,
            mock_abstracts,
            no_continue_on_error,
            top_n,
        } => {
            cmd_run(RunArgs {
                input,
                keywords,
                output,
                config,
                start_number,
                batch_size,
                skip_abstract_fetch,
                mock_abstracts,
                no_continue_on_error,
                top_n,
            })
            .await
        }
        Command::Sort { input, output } => cmd_sort(&input, output.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

struct RunArgs {
    input: PathBuf,
    keywords: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    start_number: usize,
    batch_size: Option<usize>,
    skip_abstract_fetch: Option<PathBuf>,
    mock_abstracts: Option<PathBuf>,
    no_continue_on_error: bool,
    top_n: usize,
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let mut options = RunOptions::new(&args.input, &args.keywords);
    options.output_dir = args.output;
    options.start_number = args.start_number;
    options.batch_size = args.batch_size;
    options.abstracts_file = args.skip_abstract_fetch;
    options.mock_abstracts_file = args.mock_abstracts;
    if args.no_continue_on_error {
        options.continue_on_error = Some(false);
    }
    options.top_n = args.top_n;

    info!(
        input = %args.input.display(),
        start_number = args.start_number,
        batch_size = ?args.batch_size,
        "starting pipeline run"
    );

    let reporter = CliProgress::new();
    let outcome = pipeline::run_pipeline(&config, &options, &reporter).await?;

    display_summary(&outcome.summary, args.top_n);

    if let Some(path) = &outcome.artifacts.sorted {
        println!("  Sorted output:  {}", path.display());
    }
    if let Some(path) = &outcome.artifacts.summary {
        println!("  Run summary:    {}", path.display());
    }
    println!();

    // Mirror the run status into the process exit code.
    if outcome.summary.status != RunStatus::Completed {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the result block, mirroring the execution summary artifact.
fn display_summary(summary: &ExecutionSummary, top_n: usize) {
    println!();
    println!("{}", "=".repeat(50));
    println!("PatentInsight Results");
    println!("{}", "=".repeat(50));

    let status = match summary.status {
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
        RunStatus::Partial => "partial",
        RunStatus::Failed => "failed",
    };
    println!("Status: {status}");
    if let Some(end) = summary.end_time {
        let elapsed = end - summary.start_time;
        println!("Duration: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }

    if let Some(results) = &summary.final_results {
        println!();
        println!("Total Records Processed: {}", results.total_records);
        println!("High Relevance:   {}", results.high_relevance_count);
        println!("Medium Relevance: {}", results.medium_relevance_count);
        println!("Low Relevance:    {}", results.low_relevance_count);
        println!("Unscored (NaN):   {}", results.nan_score_count);

        if !results.top_records.is_empty() {
            println!();
            println!("Top {} Most Relevant Records:", top_n.min(results.top_records.len()));
            for record in results.top_records.iter().take(top_n) {
                println!(
                    "{}. {} (Score: {:.1})",
                    record.ranking, record.id, record.overall_score
                );
                println!("   {}", record.title);
                if let Some(abstract_text) = &record.abstract_text {
                    let preview: String = if abstract_text.chars().count() > 200 {
                        let truncated: String = abstract_text.chars().take(200).collect();
                        format!("{truncated}...")
                    } else {
                        abstract_text.clone()
                    };
                    println!("   Abstract: {preview}");
                }
                println!();
            }
        }
    }

    if !summary.error_log.is_empty() {
        println!("Errors: {}", summary.error_log.len());
        for entry in summary.error_log.iter().take(5) {
            match &entry.id {
                Some(id) => println!("  - [{}] {}: {}", entry.stage, id, entry.message),
                None => println!("  - [{}] {}", entry.stage, entry.message),
            }
        }
    }
    if !summary.warnings.is_empty() {
        println!("Warnings: {}", summary.warnings.len());
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _summary: &ExecutionSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// sort / config
// ---------------------------------------------------------------------------

async fn cmd_sort(input: &std::path::Path, output: Option<&std::path::Path>) -> Result<()> {
    let (path, total, kept) = artifacts::sort_scored_file(input, output)?;

    println!("Sorted file created: {}", path.display());
    println!("Total records: {total}, kept: {kept}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
