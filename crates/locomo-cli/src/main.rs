mod config;
mod dataset;
mod display;
mod llm_client;
mod memory_client;
mod output;
mod prompts;
mod rescore;
mod retry;
mod runner;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use locomo_core::{Category, MemoryBackend};
use locomo_metrics::{ChoiceMetricsTracker, FrMetricsTracker};
use locomo_score::Scorer;

use config::Config;
use llm_client::ChatCompletionClient;
use memory_client::HttpMemoryClient;
use output::DatasetInfo;
use retry::RetryPolicy;
use runner::{RunSettings, Runner};

#[derive(Parser)]
#[command(
    name = "locomo",
    version,
    about = "LoCoMo benchmark harness for memory-augmented question answering"
)]
struct Cli {
    /// Log progress details (info level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the free-response benchmark (token F1 scoring)
    RunFr(RunArgs),

    /// Run the multiple-choice benchmark (LoCoMo-MC10)
    RunMc(RunArgs),

    /// Re-score a stored free-response summary with the current scorer
    Rescore {
        /// Summary JSON written by `run-fr`
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (default: <input>_rescored.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (default: from config)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Score one prediction against a ground truth and print the evaluation
    Score {
        prediction: String,

        ground_truth: String,

        /// Category id (1-5) or name (e.g. multi_hop, adversarial)
        #[arg(short, long, default_value = "single_hop")]
        category: Category,
    },

    /// Check that the memory store is reachable and healthy
    Health {
        /// Memory store API base URL (overrides config)
        #[arg(long)]
        memory_url: Option<String>,
    },

    /// Show active configuration
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Dataset file (JSON array or JSON-Lines)
    #[arg(short, long)]
    dataset: PathBuf,

    /// Evaluate at most this many questions
    #[arg(short = 'n', long)]
    max_questions: Option<usize>,

    /// Pick the subset at random instead of taking the first N
    #[arg(long)]
    random_sample: bool,

    /// Seed for --random-sample
    #[arg(long)]
    seed: Option<u64>,

    /// Summary output path (default: results/locomo_<kind>_<timestamp>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Memory store API base URL (overrides config)
    #[arg(long)]
    memory_url: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing_subscriber::filter::LevelFilter::INFO
    } else {
        tracing_subscriber::filter::LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let cfg = config::load_config()?;

    match cli.command {
        Commands::RunFr(args) => cmd_run_fr(&cfg, args),
        Commands::RunMc(args) => cmd_run_mc(&cfg, args),
        Commands::Rescore {
            input,
            output,
            workers,
        } => cmd_rescore(&cfg, &input, output, workers),
        Commands::Score {
            prediction,
            ground_truth,
            category,
        } => cmd_score(&cfg, &prediction, &ground_truth, category),
        Commands::Health { memory_url } => cmd_health(&cfg, memory_url.as_deref()),
        Commands::Config => cmd_config(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

fn open_memory(cfg: &Config, url_override: Option<&str>) -> HttpMemoryClient {
    HttpMemoryClient::new(
        url_override.unwrap_or(&cfg.memory.url),
        &cfg.memory.domain,
        Duration::from_secs(cfg.memory.timeout_secs),
    )
}

fn healthy_memory_client(cfg: &Config, url_override: Option<&str>) -> Result<HttpMemoryClient> {
    let memory = open_memory(cfg, url_override);
    if !memory.health() {
        bail!(
            "memory store at {} is not healthy; start it or pass --memory-url",
            memory.base_url()
        );
    }
    Ok(memory)
}

fn dataset_info(path: &Path) -> DatasetInfo {
    let sha256 = match dataset::sha256_file(path) {
        Ok(h) => Some(h),
        Err(e) => {
            warn!("cannot hash {}: {e}", path.display());
            None
        }
    };
    DatasetInfo {
        path: path.display().to_string(),
        sha256,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_run_fr(cfg: &Config, args: RunArgs) -> Result<()> {
    let records = dataset::load_free_response(&args.dataset)
        .with_context(|| format!("loading {}", args.dataset.display()))?;
    if records.is_empty() {
        bail!("no questions found in {}", args.dataset.display());
    }
    let records = dataset::select(records, args.max_questions, args.random_sample, args.seed);

    let memory = healthy_memory_client(cfg, args.memory_url.as_deref())?;
    let llm = ChatCompletionClient::from_config(&cfg.llm)?;
    let runner = Runner::new(
        &memory,
        &llm,
        RetryPolicy::from_config(&cfg.retry),
        RunSettings::from_config(cfg),
    );
    let scorer = Scorer::new(cfg.scoring.single_hop);
    let mut tracker = FrMetricsTracker::with_pricing(cfg.pricing);

    eprintln!(
        "LoCoMo free-response: {} questions, model {}, memory {}",
        records.len(),
        cfg.llm.model,
        memory.base_url()
    );
    runner.run_free_response(&records, &scorer, &mut tracker, &mut |i, total, r| {
        eprintln!("{}", display::fr_progress_line(i, total, r));
    });

    let summary = output::free_response_summary(
        &tracker,
        dataset_info(&args.dataset),
        cfg.scoring.low_score_threshold,
        tracker.elapsed_seconds(),
    );
    println!("{}", display::fr_summary_table(&summary));

    let path = args
        .output
        .unwrap_or_else(|| output::default_output_path("fr"));
    output::write_summary(&summary, &path)?;
    println!("Results written to {}", path.display());
    Ok(())
}

fn cmd_run_mc(cfg: &Config, args: RunArgs) -> Result<()> {
    let questions = dataset::load_multiple_choice(&args.dataset)
        .with_context(|| format!("loading {}", args.dataset.display()))?;
    if questions.is_empty() {
        bail!("no questions found in {}", args.dataset.display());
    }
    let questions = dataset::select(questions, args.max_questions, args.random_sample, args.seed);

    let memory = healthy_memory_client(cfg, args.memory_url.as_deref())?;
    let llm = ChatCompletionClient::from_config(&cfg.llm)?;
    let runner = Runner::new(
        &memory,
        &llm,
        RetryPolicy::from_config(&cfg.retry),
        RunSettings::from_config(cfg),
    );
    let mut tracker = ChoiceMetricsTracker::with_pricing(cfg.pricing);

    eprintln!(
        "LoCoMo multiple-choice: {} questions, model {}, memory {}",
        questions.len(),
        cfg.llm.model,
        memory.base_url()
    );
    runner.run_multiple_choice(&questions, &mut tracker, &mut |i, total, r| {
        eprintln!("{}", display::mc_progress_line(i, total, r));
    });

    let summary = output::multiple_choice_summary(
        &tracker,
        dataset_info(&args.dataset),
        tracker.elapsed_seconds(),
    );
    println!("{}", display::mc_summary_table(&summary));

    let path = args
        .output
        .unwrap_or_else(|| output::default_output_path("mc"));
    output::write_summary(&summary, &path)?;
    println!("Results written to {}", path.display());
    Ok(())
}

fn rescored_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "summary".into());
    input.with_file_name(format!("{stem}_rescored.json"))
}

fn cmd_rescore(
    cfg: &Config,
    input: &Path,
    output: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<()> {
    let stored = rescore::load_stored_run(input)?;
    let workers = workers.unwrap_or(cfg.run.workers);
    let scorer = Scorer::new(cfg.scoring.single_hop);

    eprintln!(
        "Re-scoring {} results on {} workers (single-hop mode: {:?})",
        stored.results.len(),
        workers.max(1),
        scorer.single_hop_mode()
    );
    let tracker = rescore::rescore(
        &stored.results,
        &scorer,
        FrMetricsTracker::with_pricing(cfg.pricing),
        workers,
    );

    let summary = output::free_response_summary(
        &tracker,
        DatasetInfo {
            path: stored.dataset,
            sha256: stored.dataset_sha256,
        },
        cfg.scoring.low_score_threshold,
        tracker.elapsed_seconds(),
    );
    println!("{}", display::fr_summary_table(&summary));

    let path = output.unwrap_or_else(|| rescored_path(input));
    output::write_summary(&summary, &path)?;
    println!("Results written to {}", path.display());
    Ok(())
}

fn cmd_score(
    cfg: &Config,
    prediction: &str,
    ground_truth: &str,
    category: Category,
) -> Result<()> {
    let scorer = Scorer::new(cfg.scoring.single_hop);
    let evaluation = scorer.evaluate(prediction, ground_truth, category);
    println!("{}", serde_json::to_string_pretty(&evaluation)?);
    Ok(())
}

fn cmd_health(cfg: &Config, memory_url: Option<&str>) -> Result<()> {
    let memory = open_memory(cfg, memory_url);
    if !memory.health() {
        bail!("memory store at {} is not healthy", memory.base_url());
    }
    println!("Memory store at {}: healthy", memory.base_url());
    Ok(())
}

fn cmd_config(cfg: &Config) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[memory]");
    println!("  url = {}", cfg.memory.url);
    println!("  top_k = {}", cfg.memory.top_k);
    println!("  min_similarity = {}", cfg.memory.min_similarity);
    println!(
        "  choice_min_similarity = {}",
        cfg.memory.choice_min_similarity
    );
    println!("  timeout_secs = {}", cfg.memory.timeout_secs);
    println!("  domain = {}", cfg.memory.domain);
    println!();
    println!("[llm]");
    println!("  base_url = {}", cfg.llm.base_url);
    println!("  model = {}", cfg.llm.model);
    println!(
        "  api_key_env = {} ({})",
        cfg.llm.api_key_env,
        if cfg.llm.api_key().is_ok() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  temperature = {}", cfg.llm.temperature);
    println!("  max_tokens = {}", cfg.llm.max_tokens);
    println!("  choice_max_tokens = {}", cfg.llm.choice_max_tokens);
    println!("  timeout_secs = {}", cfg.llm.timeout_secs);
    println!();
    println!("[pricing]");
    println!("  input_per_mtok = {}", cfg.pricing.input_per_mtok);
    println!("  output_per_mtok = {}", cfg.pricing.output_per_mtok);
    println!();
    println!("[scoring]");
    println!("  single_hop = {:?}", cfg.scoring.single_hop);
    println!("  low_score_threshold = {}", cfg.scoring.low_score_threshold);
    println!();
    println!("[retry]");
    println!("  max_retries = {}", cfg.retry.max_retries);
    println!("  backoff_ms = {}", cfg.retry.backoff_ms);
    println!();
    println!("[run]");
    println!("  clear_sessions = {}", cfg.run.clear_sessions);
    println!("  workers = {}", cfg.run.workers);
    Ok(())
}
